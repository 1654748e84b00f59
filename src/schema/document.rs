use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat catalog of named object schemas produced by the compiler.
///
/// Suitable for embedding as `components.schemas` in an OpenAPI document; the
/// fragments the compiler returns point into it with `$ref`. Entries are kept
/// in name order so serializing the same document twice yields identical bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    pub(crate) schemas: BTreeMap<String, Value>,
    /// canonical name -> struct origin
    pub(crate) origins: BTreeMap<String, String>,
}

impl SchemaDocument {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// The struct origin registered under `name`.
    pub fn origin_of(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The catalog as a JSON object (`{ "<name>": <schema>, .. }`).
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.schemas
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl Serialize for SchemaDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.schemas.serialize(serializer)
    }
}
