use super::ParameterStyle;
use crate::types::TypeDescriptor;
use serde_json::Value;

/// A raw parameter value as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// One occurrence
    Single(String),
    /// Every occurrence of a repeated query key
    Many(Vec<String>),
}

/// Turn a raw wire value into the untyped candidate handed to coercion.
///
/// Collections are split according to `style`: `form`/`simple` on `,`,
/// `spaceDelimited` on a space, `pipeDelimited` on `|`, `label` on `.` after
/// the leading dot, `matrix` on `,` after the `;name=` prefix. Struct, record
/// and map parameters may carry a JSON document. Everything else stays a
/// string and is parsed by the leaf coercers.
pub fn candidate(raw: &RawValue, ty: &TypeDescriptor, style: ParameterStyle) -> Value {
    let is_collection = ty.collection_element().is_some();
    match raw {
        RawValue::Many(values) if is_collection && values.len() == 1 => {
            split(&values[0], style)
        }
        RawValue::Many(values) if is_collection => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        // A repeated key for a scalar: last occurrence wins.
        RawValue::Many(values) => values
            .last()
            .map(|v| scalar(v, ty))
            .unwrap_or(Value::Null),
        RawValue::Single(value) if is_collection => split(value, style),
        RawValue::Single(value) => scalar(value, ty),
    }
}

fn split(value: &str, style: ParameterStyle) -> Value {
    let (body, delim) = match style {
        ParameterStyle::SpaceDelimited => (value, ' '),
        ParameterStyle::PipeDelimited => (value, '|'),
        ParameterStyle::Label => (value.strip_prefix('.').unwrap_or(value), '.'),
        ParameterStyle::Matrix => (strip_matrix_prefix(value), ','),
        ParameterStyle::Form | ParameterStyle::Simple | ParameterStyle::DeepObject => {
            (value, ',')
        }
    };
    Value::Array(
        body.split(delim)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}

/// `;id=5` becomes `5`.
fn strip_matrix_prefix(value: &str) -> &str {
    value
        .strip_prefix(';')
        .and_then(|rest| rest.split_once('=').map(|(_, v)| v))
        .unwrap_or(value)
}

fn scalar(value: &str, ty: &TypeDescriptor) -> Value {
    if wants_object(ty) {
        if let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(value) {
            return parsed;
        }
    }
    Value::String(value.to_string())
}

fn wants_object(ty: &TypeDescriptor) -> bool {
    match ty {
        TypeDescriptor::Struct(_)
        | TypeDescriptor::Recursive(_)
        | TypeDescriptor::Record(_)
        | TypeDescriptor::Map { .. } => true,
        TypeDescriptor::Optional(inner)
        | TypeDescriptor::Default { inner, .. }
        | TypeDescriptor::Constrained { inner, .. } => wants_object(inner),
        TypeDescriptor::Sum(left, right) => wants_object(left) || wants_object(right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ints() -> TypeDescriptor {
        TypeDescriptor::array(TypeDescriptor::integer())
    }

    #[test]
    fn test_decode_array_csv() {
        let v = candidate(&RawValue::Single("1,2,3".into()), &ints(), ParameterStyle::Form);
        assert_eq!(v, json!(["1", "2", "3"]));
    }

    #[test]
    fn test_decode_array_pipe_and_space() {
        let pipe = candidate(&RawValue::Single("a|b|c".into()), &ints(), ParameterStyle::PipeDelimited);
        assert_eq!(pipe, json!(["a", "b", "c"]));
        let space = candidate(&RawValue::Single("a b".into()), &ints(), ParameterStyle::SpaceDelimited);
        assert_eq!(space, json!(["a", "b"]));
    }

    #[test]
    fn test_decode_label_and_matrix() {
        let label = candidate(&RawValue::Single(".3.4".into()), &ints(), ParameterStyle::Label);
        assert_eq!(label, json!(["3", "4"]));
        let matrix = candidate(&RawValue::Single(";id=3,4".into()), &ints(), ParameterStyle::Matrix);
        assert_eq!(matrix, json!(["3", "4"]));
    }

    #[test]
    fn test_repeated_keys() {
        let raw = RawValue::Many(vec!["1".into(), "2".into()]);
        assert_eq!(candidate(&raw, &ints(), ParameterStyle::Form), json!(["1", "2"]));
        assert_eq!(
            candidate(&raw, &TypeDescriptor::integer(), ParameterStyle::Form),
            json!("2")
        );
    }

    #[test]
    fn test_decode_object_json() {
        let ty = TypeDescriptor::map(TypeDescriptor::string(), TypeDescriptor::integer());
        let v = candidate(&RawValue::Single("{\"a\":1}".into()), &ty, ParameterStyle::Form);
        assert_eq!(v, json!({"a": 1}));
        let not_json = candidate(&RawValue::Single("a=1".into()), &ty, ParameterStyle::Form);
        assert_eq!(not_json, json!("a=1"));
    }
}
