//! # brrtschema
//!
//! **brrtschema** is a descriptor-driven API toolkit: parameters, security
//! schemes and request bodies are declared once as structural type
//! descriptors, and the same declarations are used to
//!
//! 1. pull wire values out of a request, coerce them and validate them, and
//! 2. derive an OpenAPI document with stable, de-duplicated schema names.
//!
//! ## Architecture
//!
//! - **[`types`]** - The type algebra ([`TypeDescriptor`]) and the coercion engine
//! - **[`registry`]** - Primitive leaf types and their schema fragments
//! - **[`schema`]** - Descriptor-to-schema compiler with struct memoization
//! - **[`params`]** - Path, query, header and cookie parameter descriptors
//! - **[`security`]** - API-key and HTTP-scheme security descriptors
//! - **[`body`]** - Request body descriptor
//! - **[`openapi`]** - Endpoints (whole-request validation) and document assembly
//! - **[`request`]** - The [`RequestView`] boundary to the transport layer
//! - **[`config`]** - Process-wide toolkit configuration
//! - **[`error`]** - Setup, request and security error types
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport as Transport<br/>(router, server)
//!     participant Endpoint
//!     participant Security as SecurityDescriptor
//!     participant Params as ParameterDescriptor
//!     participant Body as RequestBodyDescriptor
//!
//!     Transport->>Endpoint: validate(request, captures, services)
//!     loop each scheme until one accepts
//!         Endpoint->>Security: validate(&mut ctx)
//!         Security->>Security: extract credential
//!         Security->>Security: run predicate
//!     end
//!     alt no scheme accepted
//!         Endpoint-->>Transport: 401 Unauthorized
//!     end
//!     Endpoint->>Params: retrieve(request, captures)
//!     Endpoint->>Body: validate(body)
//!     alt any violations
//!         Endpoint-->>Transport: 400 with every violation
//!     end
//!     Endpoint-->>Transport: ValidatedRequest
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtschema::openapi::Endpoint;
//! use brrtschema::params::{PathParameter, QueryParameter};
//! use brrtschema::request::{ParsedRequest, RouteCaptures};
//! use brrtschema::security::ServiceSet;
//! use brrtschema::types::TypeDescriptor;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let endpoint = Endpoint::new(Method::GET, "/pets/{id}")
//!     .parameter(PathParameter::new("id", TypeDescriptor::integer()))
//!     .parameter(QueryParameter::new("verbose", TypeDescriptor::boolean().with_default(json!(false))));
//!
//! let mut captures = RouteCaptures::new();
//! captures.push((Arc::from("id"), "42".to_string()));
//!
//! let validated = endpoint
//!     .validate(&ParsedRequest::new(), &captures, &ServiceSet::new())
//!     .unwrap();
//! assert_eq!(validated.param("id"), Some(&json!(42)));
//! assert_eq!(validated.param("verbose"), Some(&json!(false)));
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events and never installs a subscriber.

pub mod body;
pub mod config;
pub mod error;
pub mod openapi;
pub mod params;
pub mod registry;
pub mod request;
pub mod schema;
pub mod security;
pub mod types;

pub use body::RequestBodyDescriptor;
pub use config::ToolkitConfig;
pub use error::{
    BodyError, InfrastructureFault, ParameterError, RequestRejection, SecurityFault, SetupError,
    Violation,
};
pub use openapi::{ApiDocument, Endpoint, ResponseDescriptor, ValidatedRequest};
pub use params::{
    CookieParameter, HeaderParameter, ParameterDescriptor, ParameterLocation, ParameterStyle,
    PathParameter, QueryParameter,
};
pub use registry::TypeRegistry;
pub use request::{ParsedRequest, QueryCache, RequestView, RouteCaptures};
pub use schema::{SchemaCompiler, SchemaDocument};
pub use security::{
    ApiKeySecurity, HttpSecurity, SecurityContext, SecurityDescriptor, ServiceSet, Truthy,
};
pub use types::{Constraint, Field, Leaf, StructDescriptor, TypeDescriptor};
