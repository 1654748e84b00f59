//! Request body descriptor.
//!
//! The body arrives already decoded (the transport layer owns content
//! negotiation); this module only checks presence and coerces the value.

use crate::error::{BodyError, SetupError};
use crate::schema::SchemaCompiler;
use crate::types::{coerce, TypeDescriptor};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Default media type documented for request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct RequestBodyDescriptor {
    pub ty: TypeDescriptor,
    pub required: bool,
    pub description: Option<String>,
    pub content_type: String,
}

impl RequestBodyDescriptor {
    /// A required JSON body of type `ty`.
    pub fn new(ty: TypeDescriptor) -> Self {
        RequestBodyDescriptor {
            ty,
            required: true,
            description: None,
            content_type: JSON_CONTENT_TYPE.to_string(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Coerce `body` against the declared type.
    ///
    /// Every field-level violation is reported, not just the first.
    pub fn validate(&self, body: Option<&Value>) -> Result<Option<Value>, BodyError> {
        let Some(body) = body else {
            return if self.required {
                debug!("Missing required body");
                Err(BodyError::Missing)
            } else {
                Ok(None)
            };
        };
        coerce(&self.ty, body).map(Some).map_err(|violations| {
            debug!(violations = violations.len(), "Invalid request body");
            BodyError::Invalid(violations)
        })
    }

    /// The OpenAPI `requestBody` object.
    pub fn to_openapi(&self, compiler: &mut SchemaCompiler<'_>) -> Result<Value, SetupError> {
        let mut obj = Map::new();
        if let Some(text) = &self.description {
            obj.insert("description".to_string(), json!(text));
        }
        obj.insert("required".to_string(), json!(self.required));
        obj.insert(
            "content".to_string(),
            json!({ self.content_type.as_str(): { "schema": compiler.fragment(&self.ty)? } }),
        );
        Ok(Value::Object(obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use crate::registry::TypeRegistry;
    use crate::types::StructDescriptor;

    fn pair() -> TypeDescriptor {
        StructDescriptor::builder("tests::Pair")
            .field("a", TypeDescriptor::integer())
            .field("b", TypeDescriptor::integer())
            .build()
            .into()
    }

    #[test]
    fn test_missing_body() {
        let body = RequestBodyDescriptor::new(pair());
        assert_eq!(body.validate(None), Err(BodyError::Missing));
        assert_eq!(body.clone().optional().validate(None), Ok(None));
    }

    #[test]
    fn test_aggregates_violations() {
        let body = RequestBodyDescriptor::new(pair());
        match body.validate(Some(&json!({}))) {
            Err(BodyError::Invalid(violations)) => {
                assert_eq!(violations.len(), 2);
                assert!(violations.contains(&Violation::new("a", "is missing")));
                assert!(violations.contains(&Violation::new("b", "is missing")));
            }
            other => panic!("expected invalid body, got {other:?}"),
        }
    }

    #[test]
    fn test_coerces_fields() {
        let body = RequestBodyDescriptor::new(pair());
        assert_eq!(
            body.validate(Some(&json!({"a": 5, "b": "10"}))),
            Ok(Some(json!({"a": 5, "b": 10})))
        );
    }

    #[test]
    fn test_to_openapi() {
        let registry = TypeRegistry::builtin();
        let mut compiler = SchemaCompiler::new(&registry);
        let body = RequestBodyDescriptor::new(pair()).describe("Two numbers");
        assert_eq!(
            body.to_openapi(&mut compiler).unwrap(),
            json!({
                "description": "Two numbers",
                "required": true,
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pair"}}}
            })
        );
        assert!(compiler.document().get("Pair").is_some());
    }
}
