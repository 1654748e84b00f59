//! # Parameter Descriptors
//!
//! A parameter descriptor knows where a value lives in a request, how to pull
//! it out, and which [`TypeDescriptor`] it must satisfy. There is one variant
//! per location:
//!
//! | Variant | Source | Wire name |
//! |---|---|---|
//! | [`PathParameter`] | route captures | `name` (always required) |
//! | [`QueryParameter`] | query string | `name` (`name[]` also accepted for arrays) |
//! | [`HeaderParameter`] | request headers | `header_name`, looked up by transport key |
//! | [`CookieParameter`] | cookies | `cookie_name` |
//!
//! Retrieval distinguishes three outcomes: absent (`Ok(None)`), a coerced
//! value, and a [`ParameterError`].
//!
//! ```rust
//! use brrtschema::params::{ParameterDescriptor, QueryParameter};
//! use brrtschema::request::{ParsedRequest, RouteCaptures};
//! use brrtschema::types::TypeDescriptor;
//! use serde_json::json;
//!
//! let limit = ParameterDescriptor::from(QueryParameter::new("limit", TypeDescriptor::integer()));
//! let captures = RouteCaptures::new();
//!
//! let req = ParsedRequest::new().with_query("limit=5");
//! assert_eq!(limit.retrieve(&req, &captures).unwrap(), Some(json!(5)));
//!
//! let empty = ParsedRequest::new().with_query("");
//! assert_eq!(limit.retrieve(&empty, &captures).unwrap(), None);
//! ```

mod decode;

pub use decode::{candidate, RawValue};

use crate::error::{ParameterError, SetupError};
use crate::request::{capture, transport_header_key, RequestView, RouteCaptures};
use crate::schema::SchemaCompiler;
use crate::types::{coerce, TypeDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Serialization style used when none is declared.
    pub fn default_style(&self) -> ParameterStyle {
        match self {
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How array and object values are serialized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Label => "label",
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        }
    }
}

impl fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by every parameter variant.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    /// Logical name
    pub name: String,
    /// Declared type
    pub ty: TypeDescriptor,
    pub description: Option<String>,
    pub deprecated: bool,
    pub style: ParameterStyle,
    pub required: bool,
}

impl ParameterMeta {
    fn new(name: String, ty: TypeDescriptor, location: ParameterLocation) -> Self {
        ParameterMeta {
            name,
            ty,
            description: None,
            deprecated: false,
            style: location.default_style(),
            required: false,
        }
    }
}

macro_rules! meta_builders {
    ($variant:ty) => {
        impl $variant {
            pub fn describe(mut self, description: impl Into<String>) -> Self {
                self.meta.description = Some(description.into());
                self
            }

            pub fn deprecated(mut self) -> Self {
                self.meta.deprecated = true;
                self
            }

            pub fn style(mut self, style: ParameterStyle) -> Self {
                self.meta.style = style;
                self
            }

            pub fn meta(&self) -> &ParameterMeta {
                &self.meta
            }
        }
    };
}

/// A segment captured from the route path. Always required.
#[derive(Debug, Clone)]
pub struct PathParameter {
    meta: ParameterMeta,
}

impl PathParameter {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let mut meta = ParameterMeta::new(name.into(), ty, ParameterLocation::Path);
        meta.required = true;
        PathParameter { meta }
    }

    fn lookup(&self, captures: &RouteCaptures) -> Option<RawValue> {
        capture(captures, &self.meta.name).map(|v| RawValue::Single(v.to_string()))
    }
}

/// A value from the query string.
#[derive(Debug, Clone)]
pub struct QueryParameter {
    meta: ParameterMeta,
}

impl QueryParameter {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        QueryParameter {
            meta: ParameterMeta::new(name.into(), ty, ParameterLocation::Query),
        }
    }

    pub fn required(mut self) -> Self {
        self.meta.required = true;
        self
    }

    fn lookup(&self, request: &dyn RequestView) -> Result<Option<RawValue>, ParameterError> {
        let pairs = request.query_pairs()?;
        let name = self.meta.name.as_str();

        if self.meta.style == ParameterStyle::DeepObject {
            let object: Map<String, Value> = pairs
                .iter()
                .filter_map(|(k, v)| {
                    let prop = k.strip_prefix(name)?.strip_prefix('[')?.strip_suffix(']')?;
                    Some((prop.to_string(), Value::String(v.clone())))
                })
                .collect();
            if !object.is_empty() {
                return Ok(Some(RawValue::Single(Value::Object(object).to_string())));
            }
        }

        let collection = self.meta.ty.collection_element().is_some();
        let mut values: Vec<String> = pairs
            .iter()
            .filter(|(k, _)| {
                k == name || (collection && k.strip_suffix("[]") == Some(name))
            })
            .map(|(_, v)| v.clone())
            .collect();
        Ok(match values.len() {
            0 => None,
            1 => values.pop().map(RawValue::Single),
            _ => Some(RawValue::Many(values)),
        })
    }
}

/// A request header. The transport key is computed once, here.
#[derive(Debug, Clone)]
pub struct HeaderParameter {
    meta: ParameterMeta,
    header_name: String,
    transport_key: String,
}

impl HeaderParameter {
    /// The header name defaults to `name`.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        let transport_key = transport_header_key(&name);
        HeaderParameter {
            header_name: name.clone(),
            meta: ParameterMeta::new(name, ty, ParameterLocation::Header),
            transport_key,
        }
    }

    pub fn header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self.transport_key = transport_header_key(&self.header_name);
        self
    }

    pub fn required(mut self) -> Self {
        self.meta.required = true;
        self
    }

    pub fn transport_key(&self) -> &str {
        &self.transport_key
    }

    fn lookup(&self, request: &dyn RequestView) -> Option<RawValue> {
        request
            .header(&self.transport_key)
            .map(|v| RawValue::Single(v.to_string()))
    }
}

/// A cookie value.
#[derive(Debug, Clone)]
pub struct CookieParameter {
    meta: ParameterMeta,
    cookie_name: String,
}

impl CookieParameter {
    /// The cookie name defaults to `name`.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        CookieParameter {
            cookie_name: name.clone(),
            meta: ParameterMeta::new(name, ty, ParameterLocation::Cookie),
        }
    }

    pub fn cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.meta.required = true;
        self
    }

    fn lookup(&self, request: &dyn RequestView) -> Option<RawValue> {
        request
            .cookie(&self.cookie_name)
            .map(|v| RawValue::Single(v.to_string()))
    }
}

meta_builders!(PathParameter);
meta_builders!(QueryParameter);
meta_builders!(HeaderParameter);
meta_builders!(CookieParameter);

/// A declared request parameter.
#[derive(Debug, Clone)]
pub enum ParameterDescriptor {
    Path(PathParameter),
    Query(QueryParameter),
    Header(HeaderParameter),
    Cookie(CookieParameter),
}

impl From<PathParameter> for ParameterDescriptor {
    fn from(p: PathParameter) -> Self {
        ParameterDescriptor::Path(p)
    }
}

impl From<QueryParameter> for ParameterDescriptor {
    fn from(p: QueryParameter) -> Self {
        ParameterDescriptor::Query(p)
    }
}

impl From<HeaderParameter> for ParameterDescriptor {
    fn from(p: HeaderParameter) -> Self {
        ParameterDescriptor::Header(p)
    }
}

impl From<CookieParameter> for ParameterDescriptor {
    fn from(p: CookieParameter) -> Self {
        ParameterDescriptor::Cookie(p)
    }
}

impl ParameterDescriptor {
    pub fn meta(&self) -> &ParameterMeta {
        match self {
            ParameterDescriptor::Path(p) => &p.meta,
            ParameterDescriptor::Query(p) => &p.meta,
            ParameterDescriptor::Header(p) => &p.meta,
            ParameterDescriptor::Cookie(p) => &p.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn location(&self) -> ParameterLocation {
        match self {
            ParameterDescriptor::Path(_) => ParameterLocation::Path,
            ParameterDescriptor::Query(_) => ParameterLocation::Query,
            ParameterDescriptor::Header(_) => ParameterLocation::Header,
            ParameterDescriptor::Cookie(_) => ParameterLocation::Cookie,
        }
    }

    /// The wire-facing name used in errors and documents.
    pub fn friendly_name(&self) -> &str {
        match self {
            ParameterDescriptor::Header(p) => &p.header_name,
            ParameterDescriptor::Cookie(p) => &p.cookie_name,
            other => other.name(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.meta().required
    }

    /// Pull this parameter out of `request` and coerce it to its declared type.
    ///
    /// Absent and optional yields the declared default if there is one,
    /// otherwise `Ok(None)`. Required parameters never fall back to a default.
    pub fn retrieve(
        &self,
        request: &dyn RequestView,
        captures: &RouteCaptures,
    ) -> Result<Option<Value>, ParameterError> {
        let meta = self.meta();
        match self.lookup(request, captures)? {
            Some(value) => Ok(Some(value)),
            None if meta.required => {
                debug!(
                    parameter = self.friendly_name(),
                    location = %self.location(),
                    "Missing required parameter"
                );
                Err(ParameterError::MissingRequired {
                    friendly_name: self.friendly_name().to_string(),
                    location: self.location(),
                })
            }
            None => Ok(meta.ty.default_value().cloned()),
        }
    }

    /// Retrieve and coerce only what is present on the wire; never checks
    /// requiredness and never applies defaults.
    pub(crate) fn lookup(
        &self,
        request: &dyn RequestView,
        captures: &RouteCaptures,
    ) -> Result<Option<Value>, ParameterError> {
        let raw = match self {
            ParameterDescriptor::Path(p) => p.lookup(captures),
            ParameterDescriptor::Query(p) => p.lookup(request)?,
            ParameterDescriptor::Header(p) => p.lookup(request),
            ParameterDescriptor::Cookie(p) => p.lookup(request),
        };
        let Some(raw) = raw else {
            return Ok(None);
        };
        let meta = self.meta();
        let candidate = decode::candidate(&raw, &meta.ty, meta.style);
        match coerce(&meta.ty, &candidate) {
            Ok(value) => {
                debug!(parameter = self.friendly_name(), location = %self.location(), "Parameter coerced");
                Ok(Some(value))
            }
            Err(violations) => {
                debug!(
                    parameter = self.friendly_name(),
                    location = %self.location(),
                    violations = violations.len(),
                    "Unparseable parameter"
                );
                Err(ParameterError::Unparseable {
                    friendly_name: self.friendly_name().to_string(),
                    location: self.location(),
                    violations,
                })
            }
        }
    }

    /// The OpenAPI parameter object. Named structs in the type land in the
    /// compiler's document.
    pub fn to_openapi(&self, compiler: &mut SchemaCompiler<'_>) -> Result<Value, SetupError> {
        let meta = self.meta();
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(self.friendly_name()));
        obj.insert("in".to_string(), json!(self.location().as_str()));
        obj.insert("required".to_string(), json!(meta.required));
        if let Some(text) = &meta.description {
            obj.insert("description".to_string(), json!(text));
        }
        if meta.deprecated {
            obj.insert("deprecated".to_string(), json!(true));
        }
        if meta.style != self.location().default_style() {
            obj.insert("style".to_string(), json!(meta.style.as_str()));
        }
        obj.insert("schema".to_string(), compiler.fragment(&meta.ty)?);
        Ok(Value::Object(obj))
    }
}
