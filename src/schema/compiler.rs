use super::SchemaDocument;
use crate::error::SetupError;
use crate::registry::TypeRegistry;
use crate::types::{upgrade, Field, StructDescriptor, TypeDescriptor};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Prefix of every `$ref` the compiler emits.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// `{"$ref": "#/components/schemas/<name>"}`
pub fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("{SCHEMA_REF_PREFIX}{name}") })
}

/// Recursive descriptor-to-schema compiler.
///
/// Struct descriptors are memoized by origin: the canonical name is claimed
/// before the struct's fields are compiled, so a struct that refers to itself
/// (directly or through other structs) compiles to a `$ref` instead of
/// expanding forever.
///
/// The compiler only borrows the registry and never sees request data.
pub struct SchemaCompiler<'r> {
    registry: &'r TypeRegistry,
    document: SchemaDocument,
}

impl<'r> SchemaCompiler<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        SchemaCompiler {
            registry,
            document: SchemaDocument::default(),
        }
    }

    /// Compile every root and return the finished document.
    ///
    /// Either the whole document is returned or the first setup error is.
    pub fn compile<'a, I>(mut self, roots: I) -> Result<SchemaDocument, SetupError>
    where
        I: IntoIterator<Item = &'a TypeDescriptor>,
    {
        let mut root_count = 0usize;
        for root in roots {
            self.walk(root)?;
            root_count += 1;
        }
        info!(
            roots = root_count,
            schemas = self.document.len(),
            "Schema document compiled"
        );
        Ok(self.document)
    }

    /// Compile one descriptor into a fragment, accumulating named structs into
    /// the document. Used when building larger documents piece by piece.
    ///
    /// On error the document is left exactly as it was before the call.
    pub fn fragment(&mut self, ty: &TypeDescriptor) -> Result<Value, SetupError> {
        let checkpoint = self.document.clone();
        self.walk(ty).inspect_err(|_| {
            self.document = checkpoint;
        })
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn finish(self) -> SchemaDocument {
        self.document
    }

    fn walk(&mut self, ty: &TypeDescriptor) -> Result<Value, SetupError> {
        match ty {
            TypeDescriptor::Primitive(leaf) => self.registry.lookup(leaf).cloned().ok_or_else(|| {
                SetupError::UnrecognizedLiteralType {
                    leaf: leaf.name().to_string(),
                }
            }),
            TypeDescriptor::Optional(inner) => Ok(nullable(self.walk(inner)?)),
            TypeDescriptor::Sum(left, right) => match ty.nullable_inner() {
                Some(inner) => Ok(nullable(self.walk(inner)?)),
                None => Ok(json!({ "anyOf": [self.walk(left)?, self.walk(right)?] })),
            },
            // Constraints are opaque and defaults are not reflected.
            TypeDescriptor::Constrained { inner, .. } | TypeDescriptor::Default { inner, .. } => {
                self.walk(inner)
            }
            TypeDescriptor::Struct(descriptor) => self.struct_ref(descriptor),
            TypeDescriptor::Recursive(weak) => {
                let descriptor = upgrade(weak)?;
                self.struct_ref(&descriptor)
            }
            TypeDescriptor::Array(element) => {
                Ok(json!({ "type": "array", "items": self.walk(element)? }))
            }
            TypeDescriptor::Map { value, .. } => Ok(json!({
                "type": "object",
                "additionalProperties": self.walk(value)?,
            })),
            TypeDescriptor::Record(fields) => self.object_schema(fields, None),
        }
    }

    fn struct_ref(&mut self, descriptor: &StructDescriptor) -> Result<Value, SetupError> {
        let name = descriptor.canonical_name();
        match self.document.origins.get(&name) {
            Some(origin) if origin == descriptor.origin() => return Ok(schema_ref(&name)),
            Some(origin) => {
                return Err(SetupError::DuplicateSchemaName {
                    name,
                    existing: origin.clone(),
                    conflicting: descriptor.origin().to_string(),
                })
            }
            None => {}
        }
        self.document
            .origins
            .insert(name.clone(), descriptor.origin().to_string());
        let schema = self.object_schema(descriptor.fields(), descriptor.description())?;
        debug!(name = %name, origin = descriptor.origin(), "Struct schema registered");
        self.document.schemas.insert(name.clone(), schema);
        Ok(schema_ref(&name))
    }

    fn object_schema(
        &mut self,
        fields: &[Field],
        description: Option<&str>,
    ) -> Result<Value, SetupError> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields {
            let mut property = self.walk(&field.ty)?;
            if let (Some(text), Value::Object(obj)) = (&field.description, &mut property) {
                obj.insert("description".to_string(), Value::String(text.clone()));
            }
            properties.insert(field.name.clone(), property);
            if field.is_required() {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        if let Some(text) = description {
            schema.insert("description".to_string(), json!(text));
        }
        Ok(Value::Object(schema))
    }
}

fn nullable(mut fragment: Value) -> Value {
    if let Value::Object(obj) = &mut fragment {
        obj.insert("nullable".to_string(), Value::Bool(true));
    }
    fragment
}
