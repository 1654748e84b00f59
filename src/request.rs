//! # Request View
//!
//! The interface between descriptors and whatever transport is in front of
//! them. Descriptors never see a socket or a framework request type; they read
//! through [`RequestView`], and path captures arrive as [`RouteCaptures`].
//!
//! [`ParsedRequest`] is a ready-made implementation that can be built by hand
//! (tests, adapters) or from an [`http::Request`] whose body has already been
//! decoded.
//!
//! ## Header keys
//!
//! Headers are looked up by their **transport key**: the header name
//! uppercased, `-` replaced by `_`, prefixed with `HTTP_` (so `X-Api-Key`
//! becomes `HTTP_X_API_KEY`). `Content-Type` and `Content-Length` keep their
//! unprefixed `CONTENT_TYPE` / `CONTENT_LENGTH` keys. Header parameters compute
//! their key once at construction via [`transport_header_key`].

use crate::config::ToolkitConfig;
use crate::error::ParameterError;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Prefix prepended to every normalized header name.
pub const TRANSPORT_HEADER_PREFIX: &str = "HTTP_";

/// Maximum number of path captures before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated `(name, value)` storage for route captures.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Path-parameter name to captured string, as produced by the router.
pub type RouteCaptures = ParamVec;

/// Look up a route capture. Last write wins when a name repeats.
pub fn capture<'a>(captures: &'a RouteCaptures, name: &str) -> Option<&'a str> {
    captures
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

/// Read-only view of an inbound request.
pub trait RequestView {
    /// The raw query string, without the leading `?`
    fn query_string(&self) -> Option<&str>;
    /// Header value by transport key (see [`transport_header_key`])
    fn header(&self, transport_key: &str) -> Option<&str>;
    /// Cookie value by cookie name
    fn cookie(&self, name: &str) -> Option<&str>;
    /// The decoded body, or `None` if no body was supplied
    fn body(&self) -> Option<&Value>;

    /// Query pairs parsed under the configured ceiling.
    ///
    /// Parses on every call; wrap the view in a [`QueryCache`] when several
    /// parameters read the same request.
    fn query_pairs(&self) -> Result<Cow<'_, [(String, String)]>, ParameterError> {
        match self.query_string().filter(|q| !q.is_empty()) {
            Some(query) => {
                parse_query_pairs(query, ToolkitConfig::current().max_query_params).map(Cow::Owned)
            }
            None => Ok(Cow::Borrowed(&[])),
        }
    }
}

/// Normalize a header name into its transport key.
///
/// ```rust
/// use brrtschema::request::transport_header_key;
///
/// assert_eq!(transport_header_key("X-Api-Key"), "HTTP_X_API_KEY");
/// assert_eq!(transport_header_key("authorization"), "HTTP_AUTHORIZATION");
/// assert_eq!(transport_header_key("Content-Type"), "CONTENT_TYPE");
/// ```
pub fn transport_header_key(name: &str) -> String {
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    match normalized.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => normalized,
        _ => format!("{TRANSPORT_HEADER_PREFIX}{normalized}"),
    }
}

/// Parse a `Cookie` header value into name/value pairs.
///
/// Values are percent-decoded when they decode cleanly; otherwise the raw
/// value is kept.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let raw = parts.next().unwrap_or("").trim().trim_matches('"');
            let value = urlencoding::decode(raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

/// Parse a raw query string into ordered `(name, value)` pairs.
///
/// Pairs keep their order and repeats so multi-valued parameters survive.
///
/// # Errors
///
/// [`ParameterError::TooManyQueryParameters`] when more than `limit` pairs are
/// present; parsing stops at the first pair over the limit.
pub fn parse_query_pairs(query: &str, limit: usize) -> Result<Vec<(String, String)>, ParameterError> {
    let mut pairs = Vec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        if pairs.len() == limit {
            return Err(ParameterError::TooManyQueryParameters { limit });
        }
        pairs.push((k.into_owned(), v.into_owned()));
    }
    Ok(pairs)
}

/// Concrete [`RequestView`] with headers stored under their transport keys.
///
/// ```rust
/// use brrtschema::request::{ParsedRequest, RequestView};
///
/// let req = ParsedRequest::new()
///     .with_query("limit=10")
///     .with_header("X-Api-Key", "secret")
///     .with_header("Cookie", "session=abc; theme=dark");
/// assert_eq!(req.header("HTTP_X_API_KEY"), Some("secret"));
/// assert_eq!(req.cookie("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRequest {
    /// Raw query string without `?`
    pub query: Option<String>,
    /// Header values keyed by transport key
    pub headers: HashMap<String, String>,
    /// Parsed cookies
    pub cookies: HashMap<String, String>,
    /// Decoded body (if any)
    pub body: Option<Value>,
}

impl ParsedRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add a header by its wire name. A `Cookie` header also populates the
    /// cookie map. Repeated headers are joined with `", "`.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert_header(name, value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Build a view from an [`http::Request`] whose body was already decoded.
    pub fn from_http(req: http::Request<Option<Value>>) -> Self {
        let (parts, body) = req.into_parts();
        let mut parsed = ParsedRequest {
            query: parts.uri.query().map(str::to_string),
            body,
            ..Default::default()
        };
        for (name, value) in &parts.headers {
            parsed.insert_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        debug!(
            header_count = parsed.headers.len(),
            cookie_count = parsed.cookies.len(),
            has_query = parsed.query.is_some(),
            has_body = parsed.body.is_some(),
            "Request view built"
        );
        parsed
    }

    fn insert_header(&mut self, name: &str, value: String) {
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies.extend(parse_cookies(&value));
        }
        let key = transport_header_key(name);
        let separator = if name.eq_ignore_ascii_case("cookie") { "; " } else { ", " };
        self.headers
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(&value);
            })
            .or_insert(value);
    }
}

impl RequestView for ParsedRequest {
    fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn header(&self, transport_key: &str) -> Option<&str> {
        self.headers.get(transport_key).map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// A [`RequestView`] that parses the query string at most once.
///
/// ```rust
/// use brrtschema::request::{ParsedRequest, QueryCache, RequestView};
///
/// let req = ParsedRequest::new().with_query("a=1&b=2");
/// let cached = QueryCache::new(&req);
/// assert_eq!(cached.query_pairs().unwrap().len(), 2);
/// ```
pub struct QueryCache<'a> {
    inner: &'a dyn RequestView,
    pairs: OnceCell<Result<Vec<(String, String)>, ParameterError>>,
}

impl<'a> QueryCache<'a> {
    pub fn new(inner: &'a dyn RequestView) -> Self {
        QueryCache {
            inner,
            pairs: OnceCell::new(),
        }
    }
}

impl RequestView for QueryCache<'_> {
    fn query_string(&self) -> Option<&str> {
        self.inner.query_string()
    }

    fn header(&self, transport_key: &str) -> Option<&str> {
        self.inner.header(transport_key)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.inner.cookie(name)
    }

    fn body(&self) -> Option<&Value> {
        self.inner.body()
    }

    fn query_pairs(&self) -> Result<Cow<'_, [(String, String)]>, ParameterError> {
        match self
            .pairs
            .get_or_init(|| self.inner.query_pairs().map(Cow::into_owned))
        {
            Ok(pairs) => Ok(Cow::Borrowed(pairs.as_slice())),
            Err(err) => Err(err.clone()),
        }
    }
}
