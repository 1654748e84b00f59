//! # Type Registry
//!
//! Maps each terminal [`Leaf`] to the schema fragment the compiler emits for it.
//!
//! [`TypeRegistry::builtin`] seeds the registry with every built-in leaf;
//! applications add their own leaves during assembly and then share the
//! registry (typically behind an `Arc`) with the schema compiler. The compiler
//! only ever borrows it, so nothing can change it once assembly is done.
//!
//! ```rust
//! use brrtschema::registry::TypeRegistry;
//! use brrtschema::types::Leaf;
//! use serde_json::json;
//!
//! fn coerce_email(v: &serde_json::Value) -> Result<serde_json::Value, String> {
//!     match v.as_str() {
//!         Some(s) if s.contains('@') => Ok(v.clone()),
//!         _ => Err("must be an email address".into()),
//!     }
//! }
//! const EMAIL: Leaf = Leaf::new("email", coerce_email);
//!
//! let mut registry = TypeRegistry::builtin();
//! registry.register(EMAIL, json!({"type": "string", "format": "email"})).unwrap();
//! assert_eq!(registry.lookup(&EMAIL), Some(&json!({"type": "string", "format": "email"})));
//! ```

use crate::error::SetupError;
use crate::types::Leaf;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    fragments: HashMap<Leaf, Value>,
}

impl TypeRegistry {
    /// An empty registry. Nothing compiles against it until leaves are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with every [`Leaf::BUILTIN`].
    pub fn builtin() -> Self {
        let mut fragments = HashMap::with_capacity(Leaf::BUILTIN.len());
        for leaf in Leaf::BUILTIN {
            fragments.insert(leaf, builtin_fragment(&leaf));
        }
        TypeRegistry { fragments }
    }

    /// Associate `leaf` with its canonical schema fragment, replacing any
    /// previous registration.
    ///
    /// # Errors
    ///
    /// - [`SetupError::UnrecognizedLeaf`] if the leaf name is empty or contains
    ///   whitespace or `/` (it would not survive as a schema identity)
    /// - [`SetupError::InvalidFragment`] if `fragment` is not a JSON object
    pub fn register(&mut self, leaf: Leaf, fragment: Value) -> Result<(), SetupError> {
        let name = leaf.name();
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(SetupError::UnrecognizedLeaf {
                leaf: name.to_string(),
            });
        }
        if !fragment.is_object() {
            return Err(SetupError::InvalidFragment {
                leaf: name.to_string(),
            });
        }
        debug!(leaf = name, fragment = %fragment, "Leaf type registered");
        self.fragments.insert(leaf, fragment);
        Ok(())
    }

    pub fn lookup(&self, leaf: &Leaf) -> Option<&Value> {
        self.fragments.get(leaf)
    }

    pub fn contains(&self, leaf: &Leaf) -> bool {
        self.fragments.contains_key(leaf)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

fn builtin_fragment(leaf: &Leaf) -> Value {
    match leaf.name() {
        "string" => json!({"type": "string"}),
        "integer" => json!({"type": "integer"}),
        "number" => json!({"type": "number"}),
        "boolean" => json!({"type": "boolean"}),
        "date" => json!({"type": "string", "format": "date"}),
        "date-time" => json!({"type": "string", "format": "date-time"}),
        "uuid" => json!({"type": "string", "format": "uuid"}),
        "null" => json!({"nullable": true}),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough(v: &Value) -> Result<Value, String> {
        Ok(v.clone())
    }

    #[test]
    fn test_builtin_seeds_every_leaf() {
        let registry = TypeRegistry::builtin();
        assert_eq!(registry.len(), Leaf::BUILTIN.len());
        assert_eq!(registry.lookup(&Leaf::INTEGER), Some(&json!({"type": "integer"})));
        assert_eq!(
            registry.lookup(&Leaf::DATE_TIME),
            Some(&json!({"type": "string", "format": "date-time"}))
        );
        assert_eq!(registry.lookup(&Leaf::ANY), Some(&json!({})));
    }

    #[test]
    fn test_empty_registry() {
        let registry = TypeRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(&Leaf::STRING));
    }

    #[test]
    fn test_register_rejects_bad_identity() {
        let mut registry = TypeRegistry::new();
        let err = registry
            .register(Leaf::new("", passthrough), json!({"type": "string"}))
            .unwrap_err();
        assert_eq!(err, SetupError::UnrecognizedLeaf { leaf: String::new() });
        assert!(registry
            .register(Leaf::new("big int", passthrough), json!({}))
            .is_err());
    }

    #[test]
    fn test_register_rejects_non_object_fragment() {
        let mut registry = TypeRegistry::new();
        let err = registry
            .register(Leaf::new("money", passthrough), json!("string"))
            .unwrap_err();
        assert_eq!(err, SetupError::InvalidFragment { leaf: "money".into() });
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = TypeRegistry::builtin();
        registry
            .register(Leaf::INTEGER, json!({"type": "integer", "format": "int64"}))
            .unwrap();
        assert_eq!(
            registry.lookup(&Leaf::INTEGER),
            Some(&json!({"type": "integer", "format": "int64"}))
        );
    }
}
