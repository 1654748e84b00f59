//! # Type Descriptors
//!
//! A [`TypeDescriptor`] describes the shape of a value once and is read in two
//! directions:
//!
//! - the [`schema`](crate::schema) compiler turns it into an OpenAPI schema fragment
//! - [`coerce`] turns untyped wire input into a validated [`serde_json::Value`]
//!
//! The algebra is closed: primitives ([`Leaf`]), optional and default wrappers,
//! constrained types, two-way sums, structs, recursive struct references,
//! arrays, maps and anonymous records.
//!
//! ```rust
//! use brrtschema::types::{StructDescriptor, TypeDescriptor};
//! use serde_json::json;
//!
//! let pet = StructDescriptor::builder("petstore::Pet")
//!     .field("id", TypeDescriptor::integer())
//!     .field("tag", TypeDescriptor::string().optional())
//!     .build();
//!
//! let ty = TypeDescriptor::from(pet);
//! let value = brrtschema::types::coerce(&ty, &json!({"id": "7"})).unwrap();
//! assert_eq!(value, json!({"id": 7}));
//! ```

mod coerce;
mod leaf;

pub use coerce::coerce;
pub use leaf::{Coercer, Leaf};

use crate::error::SetupError;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

type Check = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// An opaque runtime predicate attached to a [`TypeDescriptor::Constrained`].
///
/// The schema compiler never looks inside a constraint; only coercion runs it.
#[derive(Clone)]
pub struct Constraint {
    label: String,
    check: Arc<Check>,
}

impl Constraint {
    /// Build a constraint from any predicate. `label` is used in debug output.
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Constraint {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    /// Value must equal one of `allowed`.
    pub fn one_of(allowed: impl IntoIterator<Item = Value>) -> Self {
        let allowed: Vec<Value> = allowed.into_iter().collect();
        let listing = allowed
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Constraint::new(format!("one_of({listing})"), move |v| {
            if allowed.contains(v) {
                Ok(())
            } else {
                Err(format!("must be one of {listing}"))
            }
        })
    }

    /// Numeric value must fall within the inclusive bounds.
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Constraint::new(format!("range({min:?}, {max:?})"), move |v| {
            let Some(n) = v.as_f64() else {
                return Err("must be numeric".to_string());
            };
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(format!("must be greater than or equal to {min}"));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(format!("must be less than or equal to {max}"));
            }
            Ok(())
        })
    }

    /// String value must match `pattern`.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        let label = format!("pattern({pattern})");
        Ok(Constraint::new(label, move |v| match v.as_str() {
            Some(s) if re.is_match(s) => Ok(()),
            _ => Err(format!("must match {}", re.as_str())),
        }))
    }

    /// String length (in characters) or array length must fall within bounds.
    pub fn length(min: usize, max: Option<usize>) -> Self {
        Constraint::new(format!("length({min}, {max:?})"), move |v| {
            let len = match v {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                _ => return Err("must be a string or an array".to_string()),
            };
            if len < min {
                return Err(format!("must have at least {min} element(s)"));
            }
            match max {
                Some(max) if len > max => Err(format!("must have at most {max} element(s)")),
                _ => Ok(()),
            }
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({})", self.label)
    }
}

/// The structural type algebra shared by validation and schema generation.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// Terminal type resolved through the type registry
    Primitive(Leaf),
    /// Permits absence and null
    Optional(Box<TypeDescriptor>),
    /// Supplies `value` when the input is absent or null
    Default {
        inner: Box<TypeDescriptor>,
        value: Value,
    },
    /// Inner type plus a runtime predicate
    Constrained {
        inner: Box<TypeDescriptor>,
        constraint: Constraint,
    },
    /// Exactly two alternatives, tried left to right
    Sum(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// Named object graph
    Struct(Arc<StructDescriptor>),
    /// Back-reference to an enclosing struct; see [`StructBuilder::build_recursive`]
    Recursive(Weak<StructDescriptor>),
    /// Homogeneous ordered collection
    Array(Box<TypeDescriptor>),
    /// Homogeneous keyed collection
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// Fixed-shape anonymous object
    Record(Vec<Field>),
}

impl TypeDescriptor {
    pub fn primitive(leaf: Leaf) -> Self {
        TypeDescriptor::Primitive(leaf)
    }

    pub fn string() -> Self {
        TypeDescriptor::Primitive(Leaf::STRING)
    }

    pub fn integer() -> Self {
        TypeDescriptor::Primitive(Leaf::INTEGER)
    }

    pub fn number() -> Self {
        TypeDescriptor::Primitive(Leaf::NUMBER)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(Leaf::BOOLEAN)
    }

    pub fn date() -> Self {
        TypeDescriptor::Primitive(Leaf::DATE)
    }

    pub fn date_time() -> Self {
        TypeDescriptor::Primitive(Leaf::DATE_TIME)
    }

    pub fn uuid() -> Self {
        TypeDescriptor::Primitive(Leaf::UUID)
    }

    pub fn any() -> Self {
        TypeDescriptor::Primitive(Leaf::ANY)
    }

    pub fn null() -> Self {
        TypeDescriptor::Primitive(Leaf::NULL)
    }

    pub fn sum(left: TypeDescriptor, right: TypeDescriptor) -> Self {
        TypeDescriptor::Sum(Box::new(left), Box::new(right))
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn record(fields: impl IntoIterator<Item = Field>) -> Self {
        TypeDescriptor::Record(fields.into_iter().collect())
    }

    pub fn optional(self) -> Self {
        TypeDescriptor::Optional(Box::new(self))
    }

    pub fn with_default(self, value: Value) -> Self {
        TypeDescriptor::Default {
            inner: Box::new(self),
            value,
        }
    }

    pub fn constrained(self, constraint: Constraint) -> Self {
        TypeDescriptor::Constrained {
            inner: Box::new(self),
            constraint,
        }
    }

    /// The non-null branch when this is `Optional` or a sum with the absence marker.
    pub fn nullable_inner(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Optional(inner) => Some(inner),
            TypeDescriptor::Sum(left, right) if right.is_absence() => Some(left),
            TypeDescriptor::Sum(left, right) if left.is_absence() => Some(right),
            _ => None,
        }
    }

    pub fn is_absence(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(leaf) if leaf.is_absence())
    }

    /// Whether a field of this type may be left out of an object.
    pub fn is_required(&self) -> bool {
        match self {
            TypeDescriptor::Optional(_) | TypeDescriptor::Default { .. } => false,
            TypeDescriptor::Constrained { inner, .. } => inner.is_required(),
            other => other.nullable_inner().is_none() && !other.is_absence(),
        }
    }

    /// The fallback value, looking through constraints.
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            TypeDescriptor::Default { value, .. } => Some(value),
            TypeDescriptor::Constrained { inner, .. } => inner.default_value(),
            _ => None,
        }
    }

    /// The element type when this describes a collection, looking through wrappers.
    pub fn collection_element(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(element) => Some(element),
            TypeDescriptor::Optional(inner)
            | TypeDescriptor::Default { inner, .. }
            | TypeDescriptor::Constrained { inner, .. } => inner.collection_element(),
            TypeDescriptor::Sum(..) => self.nullable_inner()?.collection_element(),
            _ => None,
        }
    }

    /// Whether wire values for this type are plain text, so an empty string is meaningful.
    pub(crate) fn is_textual(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(leaf) => leaf.is_textual(),
            TypeDescriptor::Optional(inner)
            | TypeDescriptor::Default { inner, .. }
            | TypeDescriptor::Constrained { inner, .. } => inner.is_textual(),
            TypeDescriptor::Sum(left, right) => left.is_textual() || right.is_textual(),
            _ => false,
        }
    }
}

impl From<Leaf> for TypeDescriptor {
    fn from(leaf: Leaf) -> Self {
        TypeDescriptor::Primitive(leaf)
    }
}

impl From<Arc<StructDescriptor>> for TypeDescriptor {
    fn from(descriptor: Arc<StructDescriptor>) -> Self {
        TypeDescriptor::Struct(descriptor)
    }
}

impl From<&Arc<StructDescriptor>> for TypeDescriptor {
    fn from(descriptor: &Arc<StructDescriptor>) -> Self {
        TypeDescriptor::Struct(Arc::clone(descriptor))
    }
}

/// Resolve a [`TypeDescriptor::Recursive`] back-reference.
pub(crate) fn upgrade(weak: &Weak<StructDescriptor>) -> Result<Arc<StructDescriptor>, SetupError> {
    weak.upgrade()
        .ok_or(SetupError::DanglingRecursiveReference)
}

/// A named member of a struct or record.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Field {
            name: name.into(),
            ty,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.ty.is_required()
    }
}

/// A named object shape.
///
/// The **origin** identifies the struct (use a fully qualified path such as
/// `std::any::type_name::<T>()`). The canonical schema name is the explicit
/// `schema_name` when set, otherwise the last path segment of the origin.
#[derive(Debug)]
pub struct StructDescriptor {
    origin: String,
    schema_name: Option<String>,
    description: Option<String>,
    fields: Vec<Field>,
}

impl StructDescriptor {
    pub fn builder(origin: impl Into<String>) -> StructBuilder {
        StructBuilder {
            origin: origin.into(),
            schema_name: None,
            description: None,
            fields: Vec::new(),
        }
    }

    /// Builder whose origin is the Rust type name of `T`.
    pub fn for_type<T: ?Sized>() -> StructBuilder {
        StructDescriptor::builder(std::any::type_name::<T>())
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn canonical_name(&self) -> String {
        match &self.schema_name {
            Some(name) => name.clone(),
            None => derive_short_name(&self.origin),
        }
    }
}

/// `my_app::models::Page<my_app::Pet>` becomes `Page`.
fn derive_short_name(origin: &str) -> String {
    let base = origin.split('<').next().unwrap_or(origin);
    base.rsplit("::")
        .next()
        .unwrap_or(base)
        .trim()
        .to_string()
}

/// Builder for [`StructDescriptor`].
#[derive(Debug)]
pub struct StructBuilder {
    origin: String,
    schema_name: Option<String>,
    description: Option<String>,
    fields: Vec<Field>,
}

impl StructBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Override the derived canonical schema name.
    pub fn schema_name(mut self, name: impl Into<String>) -> Self {
        self.schema_name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Arc<StructDescriptor> {
        Arc::new(self.finish())
    }

    /// Build a struct that refers to itself. `fields` receives a
    /// [`TypeDescriptor::Recursive`] pointing at the struct being built.
    ///
    /// ```rust
    /// use brrtschema::types::{StructDescriptor, TypeDescriptor};
    ///
    /// let node = StructDescriptor::builder("tree::Node")
    ///     .field("value", TypeDescriptor::integer())
    ///     .build_recursive(|b, node| b.field("children", TypeDescriptor::array(node)));
    /// assert_eq!(node.fields().len(), 2);
    /// ```
    pub fn build_recursive<F>(self, fields: F) -> Arc<StructDescriptor>
    where
        F: FnOnce(StructBuilder, TypeDescriptor) -> StructBuilder,
    {
        Arc::new_cyclic(|weak| fields(self, TypeDescriptor::Recursive(weak.clone())).finish())
    }

    fn finish(self) -> StructDescriptor {
        StructDescriptor {
            origin: self.origin,
            schema_name: self.schema_name,
            description: self.description,
            fields: self.fields,
        }
    }
}
