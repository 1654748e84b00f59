//! # Schema Module
//!
//! Compiles [`TypeDescriptor`]s into OpenAPI schema fragments and a flat
//! [`SchemaDocument`] of named object schemas.
//!
//! | Descriptor | Fragment |
//! |---|---|
//! | `Primitive` | the fragment registered in the [`TypeRegistry`] |
//! | `Optional`, sum with `null` | inner fragment plus `"nullable": true` |
//! | other `Sum` | `{"anyOf": [left, right]}` |
//! | `Constrained`, `Default` | inner fragment (predicates and defaults are not reflected) |
//! | `Struct`, `Recursive` | `{"$ref": "#/components/schemas/<name>"}`, object registered once |
//! | `Array` | `{"type": "array", "items": ..}` |
//! | `Map` | `{"type": "object", "additionalProperties": ..}` |
//! | `Record` | inline object schema |
//!
//! Compilation is pure: the same descriptors always produce the same document.
//!
//! ```rust
//! use brrtschema::registry::TypeRegistry;
//! use brrtschema::schema::compile;
//! use brrtschema::types::{StructDescriptor, TypeDescriptor};
//!
//! let owner = StructDescriptor::builder("petstore::Owner")
//!     .field("name", TypeDescriptor::string())
//!     .build();
//! let pet = StructDescriptor::builder("petstore::Pet")
//!     .field("owner", TypeDescriptor::from(&owner))
//!     .field("previous_owners", TypeDescriptor::array(TypeDescriptor::from(&owner)))
//!     .build();
//!
//! let registry = TypeRegistry::builtin();
//! let doc = compile(&registry, &[TypeDescriptor::from(pet)]).unwrap();
//! assert_eq!(doc.names().collect::<Vec<_>>(), vec!["Owner", "Pet"]);
//! ```

mod compiler;
mod document;

pub use compiler::{schema_ref, SchemaCompiler, SCHEMA_REF_PREFIX};
pub use document::SchemaDocument;

use crate::error::SetupError;
use crate::registry::TypeRegistry;
use crate::types::TypeDescriptor;

/// Compile `roots` against `registry` in one shot.
pub fn compile<'a, I>(registry: &TypeRegistry, roots: I) -> Result<SchemaDocument, SetupError>
where
    I: IntoIterator<Item = &'a TypeDescriptor>,
{
    SchemaCompiler::new(registry).compile(roots)
}
