//! # Endpoints and API Documents
//!
//! An [`Endpoint`] groups the parameters, body and security schemes of one
//! operation. It validates whole requests and renders its own OpenAPI
//! operation object; [`ApiDocument`] collects endpoints into a complete
//! OpenAPI document with a shared `components` section.
//!
//! ## Validation order
//!
//! 1. Security schemes, in declaration order. The first scheme that accepts
//!    wins; if none accept the request is [`RequestRejection::Unauthorized`].
//!    An endpoint without schemes is open.
//! 2. Every parameter and the body. All violations are collected before
//!    failing with [`RequestRejection::Invalid`].
//!
//! ```rust
//! use brrtschema::body::RequestBodyDescriptor;
//! use brrtschema::openapi::{ApiDocument, Endpoint};
//! use brrtschema::params::PathParameter;
//! use brrtschema::registry::TypeRegistry;
//! use brrtschema::types::{StructDescriptor, TypeDescriptor};
//! use http::Method;
//!
//! let pet = StructDescriptor::builder("petstore::Pet")
//!     .field("name", TypeDescriptor::string())
//!     .build();
//!
//! let doc = ApiDocument::new("Petstore", "1.0.0")
//!     .endpoint(
//!         Endpoint::new(Method::PUT, "/pets/{id}")
//!             .operation_id("updatePet")
//!             .parameter(PathParameter::new("id", TypeDescriptor::integer()))
//!             .body(RequestBodyDescriptor::new(TypeDescriptor::from(pet))),
//!     )
//!     .build(&TypeRegistry::builtin())
//!     .unwrap();
//!
//! assert_eq!(doc["paths"]["/pets/{id}"]["put"]["operationId"], "updatePet");
//! assert!(doc["components"]["schemas"]["Pet"].is_object());
//! ```

use crate::body::{RequestBodyDescriptor, JSON_CONTENT_TYPE};
use crate::config::ToolkitConfig;
use crate::error::{RequestRejection, SetupError, Violation};
use crate::params::ParameterDescriptor;
use crate::registry::TypeRegistry;
use crate::request::{QueryCache, RequestView, RouteCaptures};
use crate::schema::SchemaCompiler;
use crate::security::{SecurityContext, SecurityDescriptor, ServiceSet};
use crate::types::TypeDescriptor;
use anyhow::Context;
use http::{Extensions, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// A documented response.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub description: String,
    pub ty: Option<TypeDescriptor>,
    pub content_type: String,
}

impl ResponseDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        ResponseDescriptor {
            description: description.into(),
            ty: None,
            content_type: JSON_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn to_openapi(&self, compiler: &mut SchemaCompiler<'_>) -> Result<Value, SetupError> {
        let mut obj = Map::new();
        obj.insert("description".to_string(), json!(self.description));
        if let Some(ty) = &self.ty {
            obj.insert(
                "content".to_string(),
                json!({ self.content_type.as_str(): { "schema": compiler.fragment(ty)? } }),
            );
        }
        Ok(Value::Object(obj))
    }
}

/// Output of a successful [`Endpoint::validate`].
#[derive(Debug, Default)]
pub struct ValidatedRequest {
    /// Coerced parameter values keyed by logical name; absent optionals are left out
    pub params: HashMap<String, Value>,
    /// Coerced body, if one was supplied
    pub body: Option<Value>,
    /// Values written by security predicates
    pub extensions: Extensions,
}

impl ValidatedRequest {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Deserialize a parameter into an application type.
    pub fn param_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, serde_json::Error> {
        self.params
            .get(name)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
    }

    /// Deserialize the body into an application type.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.body
            .as_ref()
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
    }
}

/// One operation: a method on a path template.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub body: Option<RequestBodyDescriptor>,
    pub security: Vec<SecurityDescriptor>,
    pub responses: BTreeMap<u16, ResponseDescriptor>,
    pub deprecated: bool,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Endpoint {
            method,
            path: path.into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            body: None,
            security: Vec::new(),
            responses: BTreeMap::new(),
            deprecated: false,
        }
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn parameter(mut self, parameter: impl Into<ParameterDescriptor>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn body(mut self, body: RequestBodyDescriptor) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an accepted security scheme. Schemes are alternatives.
    pub fn security(mut self, scheme: impl Into<SecurityDescriptor>) -> Self {
        self.security.push(scheme.into());
        self
    }

    pub fn response(mut self, status: u16, response: ResponseDescriptor) -> Self {
        self.responses.insert(status, response);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Reject parameters declared twice at the same location under the same
    /// wire name.
    pub fn check(&self) -> Result<(), SetupError> {
        let mut seen = HashSet::new();
        for p in &self.parameters {
            if !seen.insert((p.location(), p.friendly_name())) {
                return Err(SetupError::DuplicateParameter {
                    location: p.location(),
                    name: p.friendly_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Authorize and validate one request against this endpoint.
    pub fn validate(
        &self,
        request: &dyn RequestView,
        captures: &RouteCaptures,
        services: &ServiceSet,
    ) -> Result<ValidatedRequest, RequestRejection> {
        let cached = QueryCache::new(request);
        let request: &dyn RequestView = &cached;
        let mut extensions = Extensions::new();
        if !self.security.is_empty() {
            // Each scheme gets its own context; only the accepting one's
            // extensions reach the validated request.
            let mut accepted = None;
            for scheme in &self.security {
                let mut ctx = SecurityContext::new(request, captures, services);
                if scheme.validate(&mut ctx).map_err(RequestRejection::Fault)? {
                    accepted = Some(ctx.into_extensions());
                    break;
                }
            }
            match accepted {
                Some(granted) => extensions = granted,
                None => {
                    let schemes: Vec<String> =
                        self.security.iter().map(|s| s.name().to_string()).collect();
                    warn!(method = %self.method, path = %self.path, ?schemes, "Request not authorized");
                    return Err(RequestRejection::Unauthorized { schemes });
                }
            }
        }

        let mut violations: Vec<Violation> = Vec::new();
        let mut params = HashMap::with_capacity(self.parameters.len());
        for p in &self.parameters {
            match p.retrieve(request, captures) {
                Ok(Some(value)) => {
                    params.insert(p.name().to_string(), value);
                }
                Ok(None) => {}
                Err(err) => violations.extend(err.violations()),
            }
        }
        let body = match &self.body {
            Some(descriptor) => match descriptor.validate(request.body()) {
                Ok(body) => body,
                Err(err) => {
                    violations.extend(err.violations());
                    None
                }
            },
            None => None,
        };

        if !violations.is_empty() {
            debug!(
                method = %self.method,
                path = %self.path,
                violations = violations.len(),
                "Request rejected"
            );
            return Err(RequestRejection::Invalid(violations));
        }
        Ok(ValidatedRequest {
            params,
            body,
            extensions,
        })
    }

    /// The OpenAPI operation object.
    pub fn to_openapi(&self, compiler: &mut SchemaCompiler<'_>) -> Result<Value, SetupError> {
        let mut op = Map::new();
        if let Some(id) = &self.operation_id {
            op.insert("operationId".to_string(), json!(id));
        }
        if let Some(summary) = &self.summary {
            op.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = &self.description {
            op.insert("description".to_string(), json!(description));
        }
        if !self.tags.is_empty() {
            op.insert("tags".to_string(), json!(self.tags));
        }
        if self.deprecated {
            op.insert("deprecated".to_string(), json!(true));
        }
        if !self.parameters.is_empty() {
            let parameters = self
                .parameters
                .iter()
                .map(|p| p.to_openapi(compiler))
                .collect::<Result<Vec<_>, _>>()?;
            op.insert("parameters".to_string(), Value::Array(parameters));
        }
        if let Some(body) = &self.body {
            op.insert("requestBody".to_string(), body.to_openapi(compiler)?);
        }
        let mut responses = Map::new();
        for (status, response) in &self.responses {
            responses.insert(status.to_string(), response.to_openapi(compiler)?);
        }
        if responses.is_empty() {
            responses.insert("default".to_string(), json!({ "description": "Default response" }));
        }
        op.insert("responses".to_string(), Value::Object(responses));
        if !self.security.is_empty() {
            let requirements: Vec<Value> = self
                .security
                .iter()
                .map(|s| json!({ s.name(): [] }))
                .collect();
            op.insert("security".to_string(), Value::Array(requirements));
        }
        Ok(Value::Object(op))
    }
}

/// Builder for a complete OpenAPI document.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    title: String,
    version: String,
    description: Option<String>,
    servers: Vec<String>,
    endpoints: Vec<Endpoint>,
}

impl ApiDocument {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        ApiDocument {
            title: title.into(),
            version: version.into(),
            description: None,
            servers: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(url.into());
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Compile every endpoint into one OpenAPI document.
    ///
    /// Named structs from all endpoints share `components.schemas`; security
    /// schemes are collected into `components.securitySchemes`.
    pub fn build(&self, registry: &TypeRegistry) -> Result<Value, SetupError> {
        let mut compiler = SchemaCompiler::new(registry);
        let mut paths: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
        let mut security_schemes = Map::new();

        for endpoint in &self.endpoints {
            endpoint.check()?;
            let operation = endpoint.to_openapi(&mut compiler)?;
            let method = endpoint.method.as_str().to_ascii_lowercase();
            let item = paths.entry(endpoint.path.as_str()).or_default();
            if item.insert(method, operation).is_some() {
                warn!(method = %endpoint.method, path = %endpoint.path, "Operation declared twice; keeping the last");
            }
            for scheme in &endpoint.security {
                security_schemes.insert(scheme.name().to_string(), scheme.to_openapi());
            }
        }

        let schemas = compiler.finish();
        let mut info_obj = Map::new();
        info_obj.insert("title".to_string(), json!(self.title));
        info_obj.insert("version".to_string(), json!(self.version));
        if let Some(description) = &self.description {
            info_obj.insert("description".to_string(), json!(description));
        }
        let mut components = Map::new();
        components.insert("schemas".to_string(), schemas.to_value());
        if !security_schemes.is_empty() {
            components.insert("securitySchemes".to_string(), Value::Object(security_schemes));
        }

        let mut doc = Map::new();
        doc.insert(
            "openapi".to_string(),
            json!(ToolkitConfig::current().openapi_version),
        );
        doc.insert("info".to_string(), Value::Object(info_obj));
        if !self.servers.is_empty() {
            let servers: Vec<Value> = self.servers.iter().map(|url| json!({ "url": url })).collect();
            doc.insert("servers".to_string(), Value::Array(servers));
        }
        doc.insert("paths".to_string(), json!(paths));
        doc.insert("components".to_string(), Value::Object(components));

        info!(
            endpoints = self.endpoints.len(),
            paths = paths.len(),
            schemas = schemas.len(),
            "API document built"
        );
        Ok(Value::Object(doc))
    }

    /// [`build`](Self::build) rendered as YAML.
    pub fn to_yaml(&self, registry: &TypeRegistry) -> anyhow::Result<String> {
        let doc = self.build(registry)?;
        serde_yaml::to_string(&doc).context("failed to render API document as YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HeaderParameter, QueryParameter};
    use crate::request::ParsedRequest;
    use crate::security::HttpSecurity;

    #[test]
    fn test_duplicate_parameter() {
        let endpoint = Endpoint::new(Method::GET, "/items")
            .parameter(QueryParameter::new("limit", TypeDescriptor::integer()))
            .parameter(QueryParameter::new("limit", TypeDescriptor::string()));
        assert_eq!(
            endpoint.check(),
            Err(SetupError::DuplicateParameter {
                location: crate::params::ParameterLocation::Query,
                name: "limit".into()
            })
        );
        // Same wire name at different locations is fine.
        let ok = Endpoint::new(Method::GET, "/items")
            .parameter(QueryParameter::new("trace", TypeDescriptor::string()))
            .parameter(HeaderParameter::new("trace", TypeDescriptor::string()));
        assert!(ok.check().is_ok());
    }

    #[test]
    fn test_open_endpoint_collects_params() {
        let endpoint = Endpoint::new(Method::GET, "/items")
            .parameter(QueryParameter::new("limit", TypeDescriptor::integer()))
            .parameter(QueryParameter::new("cursor", TypeDescriptor::string()));
        let req = ParsedRequest::new().with_query("limit=20");
        let validated = endpoint
            .validate(&req, &RouteCaptures::new(), &ServiceSet::new())
            .unwrap();
        assert_eq!(validated.param("limit"), Some(&json!(20)));
        assert_eq!(validated.param("cursor"), None);
        assert_eq!(validated.param_as::<u32>("limit").unwrap(), Some(20));
    }

    #[test]
    fn test_operation_object() {
        let registry = TypeRegistry::builtin();
        let mut compiler = SchemaCompiler::new(&registry);
        let endpoint = Endpoint::new(Method::DELETE, "/items/{id}")
            .tag("items")
            .security(HttpSecurity::new("bearerAuth", "Bearer"))
            .response(204, ResponseDescriptor::new("Deleted"))
            .deprecated();
        assert_eq!(
            endpoint.to_openapi(&mut compiler).unwrap(),
            json!({
                "tags": ["items"],
                "deprecated": true,
                "responses": {"204": {"description": "Deleted"}},
                "security": [{"bearerAuth": []}]
            })
        );
    }
}
