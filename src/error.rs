//! Error types shared by every descriptor family.
//!
//! Errors fall into three groups:
//!
//! - [`SetupError`] - configuration mistakes found while assembling descriptors
//!   or compiling schemas. These are fatal and belong to the descriptor author.
//! - [`ParameterError`], [`BodyError`] and [`RequestRejection`] - problems with
//!   the inbound request. They map to 4xx responses and never crash the process.
//! - [`SecurityFault`] - a validation predicate reported that its backing
//!   infrastructure failed, as opposed to rejecting the credential.

use crate::params::ParameterLocation;
use http::StatusCode;
use serde::Serialize;
use std::fmt;

/// A single field-level problem found while coercing a value.
///
/// `path` is empty for the root value, a field name for top-level fields,
/// and a dotted/indexed path (`items[2].name`) for nested ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Location of the offending value inside the candidate
    pub path: String,
    /// Human readable description of the problem
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-root the violation under `prefix`.
    pub(crate) fn nested(mut self, prefix: &str) -> Self {
        self.path = join_path(prefix, &self.path);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

pub(crate) fn join_path(prefix: &str, rest: &str) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) if rest.starts_with('[') => format!("{prefix}{rest}"),
        (false, false) => format!("{prefix}.{rest}"),
    }
}

/// Configuration error raised while assembling descriptors or compiling schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A primitive descriptor references a leaf that is not in the type registry
    UnrecognizedLiteralType {
        /// The leaf name
        leaf: String,
    },
    /// Two different struct origins resolve to the same canonical schema name
    ///
    /// Give one of them an explicit schema name.
    DuplicateSchemaName {
        /// The contested canonical name
        name: String,
        /// Origin already registered under `name`
        existing: String,
        /// Origin that tried to claim `name`
        conflicting: String,
    },
    /// An API-Key security scheme was built over a required parameter
    RequiredApiKeyParameter {
        /// Security scheme name
        scheme: String,
        /// Wire name of the offending parameter
        parameter: String,
    },
    /// A leaf identity was rejected by the type registry
    UnrecognizedLeaf {
        /// The rejected leaf name
        leaf: String,
    },
    /// A registry fragment is not a JSON object
    InvalidFragment {
        /// The leaf the fragment was registered for
        leaf: String,
    },
    /// A recursive struct reference outlived the struct it points to
    DanglingRecursiveReference,
    /// An endpoint declares the same parameter twice in one location
    DuplicateParameter {
        /// Parameter location
        location: ParameterLocation,
        /// Wire name of the parameter
        name: String,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::UnrecognizedLiteralType { leaf } => {
                write!(f, "unrecognized literal type '{leaf}': register it in the type registry")
            }
            SetupError::DuplicateSchemaName {
                name,
                existing,
                conflicting,
            } => write!(
                f,
                "duplicate schema name '{name}': '{conflicting}' collides with '{existing}'. \
                Supply an explicit schema name for one of them."
            ),
            SetupError::RequiredApiKeyParameter { scheme, parameter } => write!(
                f,
                "API key scheme '{scheme}' uses required parameter '{parameter}'. \
                Declare it with required = false; missing credentials are handled by the security layer."
            ),
            SetupError::UnrecognizedLeaf { leaf } => {
                write!(f, "'{leaf}' is not a valid terminal type identity")
            }
            SetupError::InvalidFragment { leaf } => {
                write!(f, "schema fragment registered for '{leaf}' must be a JSON object")
            }
            SetupError::DanglingRecursiveReference => {
                write!(f, "recursive struct reference points to a dropped struct descriptor")
            }
            SetupError::DuplicateParameter { location, name } => {
                write!(f, "{location} parameter '{name}' is declared more than once")
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// Failure retrieving a single parameter from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// A required parameter was not supplied
    MissingRequired {
        /// Wire-facing name of the parameter
        friendly_name: String,
        /// Where it was expected
        location: ParameterLocation,
    },
    /// A value was supplied but could not be coerced to the declared type
    Unparseable {
        /// Wire-facing name of the parameter
        friendly_name: String,
        /// Where it was found
        location: ParameterLocation,
        /// What went wrong
        violations: Vec<Violation>,
    },
    /// The query string holds more pairs than the configured ceiling
    TooManyQueryParameters {
        /// Configured ceiling
        limit: usize,
    },
}

impl ParameterError {
    /// Flatten into violations keyed by the parameter's friendly name.
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            ParameterError::MissingRequired { friendly_name, .. } => {
                vec![Violation::new(friendly_name.clone(), "is missing")]
            }
            ParameterError::Unparseable {
                friendly_name,
                violations,
                ..
            } => violations
                .iter()
                .cloned()
                .map(|v| v.nested(friendly_name))
                .collect(),
            ParameterError::TooManyQueryParameters { limit } => vec![Violation::new(
                "",
                format!("query string exceeds {limit} parameters"),
            )],
        }
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::MissingRequired {
                friendly_name,
                location,
            } => write!(f, "missing required {location} parameter '{friendly_name}'"),
            ParameterError::Unparseable {
                friendly_name,
                location,
                violations,
            } => {
                write!(f, "unparseable {location} parameter '{friendly_name}'")?;
                for v in violations {
                    write!(f, "; {v}")?;
                }
                Ok(())
            }
            ParameterError::TooManyQueryParameters { limit } => {
                write!(f, "query string exceeds the limit of {limit} parameters")
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Failure validating a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// The body is required but none was supplied
    Missing,
    /// The body did not match its declared type
    Invalid(Vec<Violation>),
}

impl BodyError {
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            BodyError::Missing => vec![Violation::new("body", "is missing")],
            BodyError::Invalid(violations) => violations
                .iter()
                .cloned()
                .map(|v| v.nested("body"))
                .collect(),
        }
    }
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Missing => write!(f, "missing required body"),
            BodyError::Invalid(violations) => {
                write!(f, "invalid body")?;
                for v in violations {
                    write!(f, "; {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for BodyError {}

/// Raised by a validation predicate to signal that it could not reach the
/// system it depends on (credential store down, introspection endpoint timed
/// out). Any other predicate error simply rejects the credential.
///
/// ```rust
/// use brrtschema::InfrastructureFault;
///
/// let err: anyhow::Error = InfrastructureFault::new("token store unreachable").into();
/// assert!(err.downcast_ref::<InfrastructureFault>().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureFault {
    message: String,
}

impl InfrastructureFault {
    pub fn new(message: impl Into<String>) -> Self {
        InfrastructureFault {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InfrastructureFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "infrastructure fault: {}", self.message)
    }
}

impl std::error::Error for InfrastructureFault {}

/// A security scheme could not reach a verdict.
#[derive(Debug)]
pub struct SecurityFault {
    /// Security scheme name
    pub scheme: String,
    /// The error raised by the predicate
    pub source: anyhow::Error,
}

impl fmt::Display for SecurityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security scheme '{}' failed: {}", self.scheme, self.source)
    }
}

impl std::error::Error for SecurityFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Outcome of a failed endpoint validation, ready for a response builder.
#[derive(Debug)]
pub enum RequestRejection {
    /// No security scheme accepted the request
    Unauthorized {
        /// Schemes that were tried
        schemes: Vec<String>,
    },
    /// Parameters or body failed validation; every violation found is listed
    Invalid(Vec<Violation>),
    /// A security predicate reported an infrastructure fault
    Fault(SecurityFault),
}

impl RequestRejection {
    /// HTTP status a response builder should use.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestRejection::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestRejection::Invalid(_) => StatusCode::BAD_REQUEST,
            RequestRejection::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            RequestRejection::Invalid(v) => v,
            _ => &[],
        }
    }
}

impl fmt::Display for RequestRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestRejection::Unauthorized { schemes } => {
                write!(f, "unauthorized (tried: {})", schemes.join(", "))
            }
            RequestRejection::Invalid(violations) => {
                write!(f, "invalid request: {} violation(s)", violations.len())
            }
            RequestRejection::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

impl std::error::Error for RequestRejection {}
