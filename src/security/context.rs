use crate::request::{RequestView, RouteCaptures};
use http::Extensions;
use serde_json::Value;

/// Application-wide services made available to security predicates.
///
/// Typed by value type, one instance per type:
///
/// ```rust
/// use brrtschema::security::ServiceSet;
///
/// #[derive(Clone)]
/// struct KeyStore(Vec<String>);
///
/// let services = ServiceSet::new().with(KeyStore(vec!["k1".into()]));
/// assert_eq!(services.get::<KeyStore>().map(|s| s.0.len()), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceSet {
    services: Extensions,
}

impl ServiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Clone + Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Returns the previously registered service of the same type, if any.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, service: T) -> Option<T> {
        self.services.insert(service)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services.get::<T>()
    }
}

/// Everything a security predicate gets to look at.
///
/// `credential` is filled in by the security descriptor right before its
/// predicate runs. `extensions` lives for one request: predicates write to it
/// (resolved principal, scopes) and the application reads it back from the
/// validated request.
pub struct SecurityContext<'a> {
    pub request: &'a dyn RequestView,
    pub captures: &'a RouteCaptures,
    pub services: &'a ServiceSet,
    pub credential: Option<Value>,
    pub extensions: Extensions,
}

impl<'a> SecurityContext<'a> {
    pub fn new(
        request: &'a dyn RequestView,
        captures: &'a RouteCaptures,
        services: &'a ServiceSet,
    ) -> Self {
        SecurityContext {
            request,
            captures,
            services,
            credential: None,
            extensions: Extensions::new(),
        }
    }

    /// The credential as text, when it is a string.
    pub fn credential_str(&self) -> Option<&str> {
        self.credential.as_ref().and_then(Value::as_str)
    }

    pub fn service<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services.get::<T>()
    }

    pub fn into_extensions(self) -> Extensions {
        self.extensions
    }
}

/// Normalizes a predicate result to accept/reject.
pub trait Truthy {
    fn truthy(&self) -> bool;
}

impl Truthy for bool {
    fn truthy(&self) -> bool {
        *self
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::truthy)
    }
}

/// `null` and `false` reject; any other value accepts.
impl Truthy for Value {
    fn truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }
}
