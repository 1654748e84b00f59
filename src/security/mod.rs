//! # Security Descriptors
//!
//! A security descriptor extracts a credential from a request and hands it to
//! an application-supplied predicate. Two schemes are supported:
//!
//! - [`ApiKeySecurity`]: the credential is read through an embedded query,
//!   header or cookie parameter
//! - [`HttpSecurity`]: the credential is whatever follows the scheme token in
//!   the `Authorization` header (`Bearer abc123` gives `abc123`)
//!
//! ## Outcomes
//!
//! [`SecurityDescriptor::validate`] returns `Ok(true)` when the predicate
//! accepts, `Ok(false)` when no credential is present, when the predicate
//! rejects or errors, or when no predicate was configured. Only an
//! [`InfrastructureFault`] raised by the predicate becomes `Err`.
//!
//! ## Example
//!
//! ```rust
//! use brrtschema::request::{ParsedRequest, RouteCaptures};
//! use brrtschema::security::{HttpSecurity, SecurityContext, SecurityDescriptor, ServiceSet};
//!
//! let bearer = SecurityDescriptor::from(
//!     HttpSecurity::new("bearerAuth", "Bearer")
//!         .validate_with(|ctx| Ok(ctx.credential_str() == Some("abc123"))),
//! );
//!
//! let req = ParsedRequest::new().with_header("Authorization", "Bearer abc123");
//! let captures = RouteCaptures::new();
//! let services = ServiceSet::new();
//! let mut ctx = SecurityContext::new(&req, &captures, &services);
//! assert!(bearer.validate(&mut ctx).unwrap());
//! ```

mod context;

pub use context::{SecurityContext, ServiceSet, Truthy};

use crate::error::{InfrastructureFault, SecurityFault, SetupError};
use crate::params::{CookieParameter, HeaderParameter, ParameterDescriptor, QueryParameter};
use crate::request::{RequestView, RouteCaptures};
use base64::Engine;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Transport key of the `Authorization` header.
const AUTHORIZATION_KEY: &str = "HTTP_AUTHORIZATION";

type Predicate = Arc<dyn Fn(&mut SecurityContext<'_>) -> anyhow::Result<bool> + Send + Sync>;

fn erase<F>(predicate: F) -> Predicate
where
    F: Fn(&mut SecurityContext<'_>) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    Arc::new(predicate)
}

/// Name, description and predicate shared by both schemes.
#[derive(Clone)]
pub struct SecurityMeta {
    pub name: String,
    pub description: Option<String>,
    predicate: Option<Predicate>,
}

impl SecurityMeta {
    fn new(name: String) -> Self {
        SecurityMeta {
            name,
            description: None,
            predicate: None,
        }
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }
}

impl fmt::Debug for SecurityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityMeta")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

macro_rules! meta_builders {
    ($variant:ty) => {
        impl $variant {
            /// Install the credential check.
            ///
            /// The closure may return anything [`Truthy`]. Returning an error
            /// rejects the credential, unless the error is an
            /// [`InfrastructureFault`].
            pub fn validate_with<F, R>(mut self, predicate: F) -> Self
            where
                F: Fn(&mut SecurityContext<'_>) -> anyhow::Result<R> + Send + Sync + 'static,
                R: Truthy,
            {
                self.meta.predicate = Some(erase(move |ctx| predicate(ctx).map(|r| r.truthy())));
                self
            }

            pub fn describe(mut self, description: impl Into<String>) -> Self {
                self.meta.description = Some(description.into());
                self
            }

            pub fn meta(&self) -> &SecurityMeta {
                &self.meta
            }
        }
    };
}

/// Parameter kinds an API key may be carried in.
pub trait ApiKeyLocation: Into<ParameterDescriptor> + sealed::Sealed {}

impl ApiKeyLocation for QueryParameter {}
impl ApiKeyLocation for HeaderParameter {}
impl ApiKeyLocation for CookieParameter {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::params::QueryParameter {}
    impl Sealed for crate::params::HeaderParameter {}
    impl Sealed for crate::params::CookieParameter {}
}

/// An API key carried in a query, header or cookie parameter.
#[derive(Debug, Clone)]
pub struct ApiKeySecurity {
    meta: SecurityMeta,
    parameter: ParameterDescriptor,
}

impl ApiKeySecurity {
    /// # Errors
    ///
    /// [`SetupError::RequiredApiKeyParameter`] when the parameter is marked
    /// required; a missing key is the security layer's outcome to report.
    pub fn new<P: ApiKeyLocation>(name: impl Into<String>, parameter: P) -> Result<Self, SetupError> {
        let name = name.into();
        let parameter: ParameterDescriptor = parameter.into();
        if parameter.is_required() {
            return Err(SetupError::RequiredApiKeyParameter {
                scheme: name,
                parameter: parameter.friendly_name().to_string(),
            });
        }
        Ok(ApiKeySecurity {
            meta: SecurityMeta::new(name),
            parameter,
        })
    }

    pub fn parameter(&self) -> &ParameterDescriptor {
        &self.parameter
    }

    fn credential(&self, request: &dyn RequestView, captures: &RouteCaptures) -> Option<Value> {
        match self.parameter.lookup(request, captures) {
            Ok(value) => value.filter(|v| !v.is_null()),
            Err(err) => {
                debug!(scheme = %self.meta.name, error = %err, "Unreadable API key");
                None
            }
        }
    }
}

/// An `Authorization: <scheme> <credential>` scheme such as `Bearer` or `Basic`.
#[derive(Debug, Clone)]
pub struct HttpSecurity {
    meta: SecurityMeta,
    scheme: String,
    bearer_format: Option<String>,
}

impl HttpSecurity {
    pub fn new(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        HttpSecurity {
            meta: SecurityMeta::new(name.into()),
            scheme: scheme.into(),
            bearer_format: None,
        }
    }

    /// Documentation hint such as `JWT`.
    pub fn bearer_format(mut self, format: impl Into<String>) -> Self {
        self.bearer_format = Some(format.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The credential following this scheme's token in an `Authorization` value.
    ///
    /// ```rust
    /// use brrtschema::security::HttpSecurity;
    ///
    /// let bearer = HttpSecurity::new("bearerAuth", "Bearer");
    /// assert_eq!(bearer.extract_credential("bearer abc123"), Some("abc123"));
    /// assert_eq!(bearer.extract_credential("Basic abc123"), None);
    /// ```
    pub fn extract_credential<'v>(&self, authorization: &'v str) -> Option<&'v str> {
        let (token, rest) = authorization.trim().split_once(char::is_whitespace)?;
        if !token.eq_ignore_ascii_case(&self.scheme) {
            return None;
        }
        let credential = rest.trim();
        (!credential.is_empty()).then_some(credential)
    }

    /// Decode a `Basic` credential into `(user, password)`.
    pub fn basic_credentials(credential: &str) -> Option<(String, String)> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(credential.trim())
            .ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (user, password) = text.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }

    fn credential(&self, request: &dyn RequestView) -> Option<Value> {
        let header = request.header(AUTHORIZATION_KEY)?;
        self.extract_credential(header)
            .map(|c| Value::String(c.to_string()))
    }
}

meta_builders!(ApiKeySecurity);
meta_builders!(HttpSecurity);

/// A declared security scheme.
#[derive(Debug, Clone)]
pub enum SecurityDescriptor {
    ApiKey(ApiKeySecurity),
    Http(HttpSecurity),
}

impl From<ApiKeySecurity> for SecurityDescriptor {
    fn from(s: ApiKeySecurity) -> Self {
        SecurityDescriptor::ApiKey(s)
    }
}

impl From<HttpSecurity> for SecurityDescriptor {
    fn from(s: HttpSecurity) -> Self {
        SecurityDescriptor::Http(s)
    }
}

impl SecurityDescriptor {
    pub fn meta(&self) -> &SecurityMeta {
        match self {
            SecurityDescriptor::ApiKey(s) => &s.meta,
            SecurityDescriptor::Http(s) => &s.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    /// Extract the credential and run the predicate over it.
    ///
    /// The predicate is not invoked when no credential is present.
    pub fn validate(&self, ctx: &mut SecurityContext<'_>) -> Result<bool, SecurityFault> {
        let scheme = self.name();
        ctx.credential = match self {
            SecurityDescriptor::ApiKey(s) => s.credential(ctx.request, ctx.captures),
            SecurityDescriptor::Http(s) => s.credential(ctx.request),
        };
        if ctx.credential.is_none() {
            debug!(scheme, "No credential supplied");
            return Ok(false);
        }
        let Some(predicate) = &self.meta().predicate else {
            warn!(scheme, "Security scheme has no validator; rejecting");
            return Ok(false);
        };
        match predicate(ctx) {
            Ok(true) => {
                debug!(scheme, "Credential accepted");
                Ok(true)
            }
            Ok(false) => {
                warn!(scheme, "Credential rejected");
                Ok(false)
            }
            Err(err) if err.downcast_ref::<InfrastructureFault>().is_some() => {
                error!(scheme, error = %err, "Security validator could not reach a verdict");
                Err(SecurityFault {
                    scheme: scheme.to_string(),
                    source: err,
                })
            }
            Err(err) => {
                warn!(scheme, error = %err, "Security validator failed; rejecting credential");
                Ok(false)
            }
        }
    }

    /// The OpenAPI security scheme object.
    pub fn to_openapi(&self) -> Value {
        let mut obj = Map::new();
        match self {
            SecurityDescriptor::ApiKey(s) => {
                obj.insert("type".to_string(), json!("apiKey"));
                obj.insert("name".to_string(), json!(s.parameter.friendly_name()));
                obj.insert("in".to_string(), json!(s.parameter.location().as_str()));
            }
            SecurityDescriptor::Http(s) => {
                obj.insert("type".to_string(), json!("http"));
                obj.insert("scheme".to_string(), json!(s.scheme.to_ascii_lowercase()));
                if let Some(format) = &s.bearer_format {
                    obj.insert("bearerFormat".to_string(), json!(format));
                }
            }
        }
        if let Some(text) = &self.meta().description {
            obj.insert("description".to_string(), json!(text));
        }
        Value::Object(obj)
    }
}
