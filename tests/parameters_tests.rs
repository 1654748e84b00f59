//! Integration tests for parameter retrieval across path, query, header and cookie

mod common;

use brrtschema::error::ParameterError;
use brrtschema::params::{
    CookieParameter, HeaderParameter, ParameterDescriptor, ParameterLocation, ParameterStyle,
    PathParameter, QueryParameter,
};
use brrtschema::request::{ParsedRequest, RouteCaptures};
use brrtschema::types::{Constraint, StructDescriptor, TypeDescriptor};
use serde_json::json;
use std::sync::Arc;

fn captures(pairs: &[(&str, &str)]) -> RouteCaptures {
    pairs
        .iter()
        .map(|(k, v)| (Arc::<str>::from(*k), v.to_string()))
        .collect()
}

fn query(name: &str, ty: TypeDescriptor) -> ParameterDescriptor {
    QueryParameter::new(name, ty).into()
}

#[test]
fn test_query_integer_round_trip() {
    common::init_tracing();
    let a = query("a", TypeDescriptor::integer());
    let req = ParsedRequest::new().with_query("a=5");
    assert_eq!(a.retrieve(&req, &captures(&[])).unwrap(), Some(json!(5)));
    let empty = ParsedRequest::new().with_query("");
    assert_eq!(a.retrieve(&empty, &captures(&[])).unwrap(), None);
}

#[test]
fn test_optional_empty_value_is_null() {
    let a = query("a", TypeDescriptor::integer().optional());
    let req = ParsedRequest::new().with_query("a=");
    assert_eq!(a.retrieve(&req, &captures(&[])).unwrap(), Some(json!(null)));
}

#[test]
fn test_empty_value_for_required_integer_is_unparseable() {
    let a = ParameterDescriptor::from(QueryParameter::new("a", TypeDescriptor::integer()).required());
    let req = ParsedRequest::new().with_query("a=");
    assert!(matches!(
        a.retrieve(&req, &captures(&[])),
        Err(ParameterError::Unparseable { .. })
    ));
}

#[test]
fn test_missing_vs_unparseable_are_distinct() {
    let id = ParameterDescriptor::from(PathParameter::new("id", TypeDescriptor::integer()));
    let req = ParsedRequest::new();
    assert_eq!(
        id.retrieve(&req, &captures(&[])).unwrap_err(),
        ParameterError::MissingRequired {
            friendly_name: "id".into(),
            location: ParameterLocation::Path
        }
    );
    let err = id.retrieve(&req, &captures(&[("id", "abc")])).unwrap_err();
    let violations = err.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, "id");
}

#[test]
fn test_header_normalized_once() {
    let header = HeaderParameter::new("api_key", TypeDescriptor::string()).header_name("X-Api-Key");
    assert_eq!(header.transport_key(), "HTTP_X_API_KEY");
    let p = ParameterDescriptor::from(header);
    for wire in ["X-Api-Key", "x-api-key", "X-API-KEY"] {
        let req = ParsedRequest::new().with_header(wire, "k-123");
        assert_eq!(p.retrieve(&req, &captures(&[])).unwrap(), Some(json!("k-123")), "{wire}");
    }
}

#[test]
fn test_header_boolean_words() {
    let p = ParameterDescriptor::from(HeaderParameter::new("X-Dry-Run", TypeDescriptor::boolean()));
    for (wire, expected) in [("yes", true), ("off", false), ("T", true), ("0", false)] {
        let req = ParsedRequest::new().with_header("X-Dry-Run", wire);
        assert_eq!(p.retrieve(&req, &captures(&[])).unwrap(), Some(json!(expected)), "{wire}");
    }
}

#[test]
fn test_cookie_percent_decoded() {
    let p = ParameterDescriptor::from(CookieParameter::new("prefs", TypeDescriptor::string()));
    let req = ParsedRequest::new().with_header("Cookie", "prefs=dark%20mode; other=1");
    assert_eq!(p.retrieve(&req, &captures(&[])).unwrap(), Some(json!("dark mode")));
}

#[test]
fn test_query_array_styles() {
    let ids = TypeDescriptor::array(TypeDescriptor::integer());
    let cases = [
        (ParameterStyle::Form, "ids=1,2,3"),
        (ParameterStyle::SpaceDelimited, "ids=1%202%203"),
        (ParameterStyle::PipeDelimited, "ids=1|2|3"),
        (ParameterStyle::Form, "ids=1&ids=2&ids=3"),
        (ParameterStyle::Form, "ids%5B%5D=1&ids%5B%5D=2&ids%5B%5D=3"),
    ];
    for (style, q) in cases {
        let p = ParameterDescriptor::from(QueryParameter::new("ids", ids.clone()).style(style));
        let req = ParsedRequest::new().with_query(q);
        assert_eq!(p.retrieve(&req, &captures(&[])).unwrap(), Some(json!([1, 2, 3])), "{q}");
    }
}

#[test]
fn test_path_label_and_matrix_styles() {
    let ids = TypeDescriptor::array(TypeDescriptor::integer());
    let label = ParameterDescriptor::from(PathParameter::new("ids", ids.clone()).style(ParameterStyle::Label));
    assert_eq!(
        label.retrieve(&ParsedRequest::new(), &captures(&[("ids", ".4.5")])).unwrap(),
        Some(json!([4, 5]))
    );
    let matrix = ParameterDescriptor::from(PathParameter::new("ids", ids).style(ParameterStyle::Matrix));
    assert_eq!(
        matrix.retrieve(&ParsedRequest::new(), &captures(&[("ids", ";ids=4,5")])).unwrap(),
        Some(json!([4, 5]))
    );
}

#[test]
fn test_array_element_violation_paths() {
    let p = query("ids", TypeDescriptor::array(TypeDescriptor::integer()));
    let req = ParsedRequest::new().with_query("ids=1,x,3");
    let err = p.retrieve(&req, &captures(&[])).unwrap_err();
    let paths: Vec<String> = err.violations().into_iter().map(|v| v.path).collect();
    assert_eq!(paths, vec!["ids[1]"]);
}

#[test]
fn test_constrained_query() {
    let limit = query(
        "limit",
        TypeDescriptor::integer().constrained(Constraint::range(Some(1.0), Some(100.0))),
    );
    let ok = ParsedRequest::new().with_query("limit=50");
    assert_eq!(limit.retrieve(&ok, &captures(&[])).unwrap(), Some(json!(50)));
    let too_big = ParsedRequest::new().with_query("limit=500");
    assert!(limit.retrieve(&too_big, &captures(&[])).is_err());
}

#[test]
fn test_default_when_absent() {
    let sort = query("sort", TypeDescriptor::string().with_default(json!("name")));
    assert_eq!(sort.retrieve(&ParsedRequest::new(), &captures(&[])).unwrap(), Some(json!("name")));
    let req = ParsedRequest::new().with_query("sort=age");
    assert_eq!(sort.retrieve(&req, &captures(&[])).unwrap(), Some(json!("age")));
}

#[test]
fn test_json_object_query() {
    let filter = StructDescriptor::builder("api::Filter")
        .field("min", TypeDescriptor::integer())
        .field("max", TypeDescriptor::integer().optional())
        .build();
    let p = query("filter", TypeDescriptor::from(filter));
    let req = ParsedRequest::new().with_query("filter=%7B%22min%22%3A%221%22%7D");
    assert_eq!(p.retrieve(&req, &captures(&[])).unwrap(), Some(json!({"min": 1})));
}

#[test]
fn test_uuid_and_date_path_params() {
    let day = ParameterDescriptor::from(PathParameter::new("day", TypeDescriptor::date()));
    assert_eq!(
        day.retrieve(&ParsedRequest::new(), &captures(&[("day", "2024-02-29")])).unwrap(),
        Some(json!("2024-02-29"))
    );
    assert!(day
        .retrieve(&ParsedRequest::new(), &captures(&[("day", "2023-02-29")]))
        .is_err());
}
