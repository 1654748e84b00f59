//! Integration tests for security descriptors
//!
//! # Test Coverage
//!
//! - API keys in header, query and cookie parameters
//! - HTTP schemes (Bearer, Basic) and scheme token matching
//! - Predicate result normalization and infrastructure faults

mod common;

use brrtschema::error::{InfrastructureFault, SetupError};
use brrtschema::params::{CookieParameter, HeaderParameter, QueryParameter};
use brrtschema::request::{ParsedRequest, RouteCaptures};
use brrtschema::security::{
    ApiKeySecurity, HttpSecurity, SecurityContext, SecurityDescriptor, ServiceSet,
};
use brrtschema::types::TypeDescriptor;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct KeyStore {
    keys: Arc<HashSet<String>>,
}

impl KeyStore {
    fn with_keys(keys: &[&str]) -> Self {
        KeyStore {
            keys: Arc::new(keys.iter().map(|k| k.to_string()).collect()),
        }
    }
}

fn check(descriptor: &SecurityDescriptor, req: &ParsedRequest, services: &ServiceSet) -> bool {
    let captures = RouteCaptures::new();
    let mut ctx = SecurityContext::new(req, &captures, services);
    descriptor.validate(&mut ctx).expect("no infrastructure fault")
}

fn key_store_scheme<P>(parameter: P) -> SecurityDescriptor
where
    P: brrtschema::security::ApiKeyLocation,
{
    ApiKeySecurity::new("apiKey", parameter)
        .expect("optional parameter")
        .validate_with(|ctx| {
            let store = ctx
                .service::<KeyStore>()
                .ok_or_else(|| InfrastructureFault::new("key store not configured"))?;
            Ok(ctx.credential_str().is_some_and(|k| store.keys.contains(k)))
        })
        .into()
}

#[test]
fn test_api_key_required_parameter_is_setup_error() {
    common::init_tracing();
    let header = HeaderParameter::new("key", TypeDescriptor::string())
        .header_name("X-Api-Key")
        .required();
    assert!(matches!(
        ApiKeySecurity::new("apiKey", header),
        Err(SetupError::RequiredApiKeyParameter { .. })
    ));
}

#[test]
fn test_api_key_in_each_location() {
    let services = ServiceSet::new().with(KeyStore::with_keys(&["good"]));
    let header = key_store_scheme(HeaderParameter::new("key", TypeDescriptor::string()).header_name("X-Api-Key"));
    let query = key_store_scheme(QueryParameter::new("api_key", TypeDescriptor::string()));
    let cookie = key_store_scheme(CookieParameter::new("key", TypeDescriptor::string()).cookie_name("api_key"));

    assert!(check(&header, &ParsedRequest::new().with_header("X-Api-Key", "good"), &services));
    assert!(!check(&header, &ParsedRequest::new().with_header("X-Api-Key", "bad"), &services));
    assert!(check(&query, &ParsedRequest::new().with_query("api_key=good"), &services));
    assert!(check(&cookie, &ParsedRequest::new().with_header("Cookie", "api_key=good"), &services));
    assert!(!check(&cookie, &ParsedRequest::new(), &services));
}

#[test]
fn test_missing_service_is_infrastructure_fault() {
    let scheme = key_store_scheme(QueryParameter::new("api_key", TypeDescriptor::string()));
    let req = ParsedRequest::new().with_query("api_key=good");
    let captures = RouteCaptures::new();
    let services = ServiceSet::new();
    let mut ctx = SecurityContext::new(&req, &captures, &services);
    let fault = scheme.validate(&mut ctx).unwrap_err();
    assert_eq!(fault.scheme, "apiKey");
    assert!(fault.to_string().contains("key store not configured"));
}

#[test]
fn test_bearer_scheme_is_case_insensitive() {
    let scheme = SecurityDescriptor::from(
        HttpSecurity::new("bearerAuth", "Bearer").validate_with(|ctx| Ok(ctx.credential.clone())),
    );
    let services = ServiceSet::new();
    for value in ["Bearer abc123", "bearer abc123", "BEARER   abc123  "] {
        let req = ParsedRequest::new().with_header("Authorization", value);
        assert!(check(&scheme, &req, &services), "{value}");
    }
}

#[test]
fn test_wrong_scheme_skips_predicate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scheme = SecurityDescriptor::from(HttpSecurity::new("bearerAuth", "Bearer").validate_with(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        },
    ));
    let services = ServiceSet::new();
    assert!(!check(&scheme, &ParsedRequest::new().with_header("Authorization", "Basic abc123"), &services));
    assert!(!check(&scheme, &ParsedRequest::new(), &services));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_basic_auth_predicate() {
    let scheme = SecurityDescriptor::from(HttpSecurity::new("basicAuth", "Basic").validate_with(|ctx| {
        let creds = ctx.credential_str().and_then(HttpSecurity::basic_credentials);
        Ok(creds.is_some_and(|(user, pass)| user == "admin" && pass == "s3cret"))
    }));
    let services = ServiceSet::new();
    // admin:s3cret
    let ok = ParsedRequest::new().with_header("Authorization", "Basic YWRtaW46czNjcmV0");
    assert!(check(&scheme, &ok, &services));
    // admin:wrong
    let wrong = ParsedRequest::new().with_header("Authorization", "Basic YWRtaW46d3Jvbmc=");
    assert!(!check(&scheme, &wrong, &services));
}

#[test]
fn test_value_results_normalized() {
    let scheme = SecurityDescriptor::from(HttpSecurity::new("bearerAuth", "Bearer").validate_with(|ctx| {
        Ok(match ctx.credential_str() {
            Some("admin-token") => json!({"sub": "admin"}),
            _ => json!(null),
        })
    }));
    let services = ServiceSet::new();
    assert!(check(&scheme, &ParsedRequest::new().with_header("Authorization", "Bearer admin-token"), &services));
    assert!(!check(&scheme, &ParsedRequest::new().with_header("Authorization", "Bearer other"), &services));
}
