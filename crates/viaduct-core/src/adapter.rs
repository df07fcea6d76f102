//! Transport adapters
//!
//! Two sources feed the dispatcher: an event-driven hyper server and a
//! synchronous CGI-style variable map. Both construct the same
//! [`RequestContext`] through [`RequestBuilder`], so header normalization
//! and body decomposition are identical regardless of source.

use crate::request::{RequestBuilder, RequestContext};
use bytes::Bytes;
use http::Method;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Build a request context from hyper request parts and a collected body.
pub fn from_http(
    parts: &http::request::Parts,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
) -> RequestContext {
    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut builder = RequestContext::builder(parts.method.clone(), uri)
        .secure(parts.uri.scheme_str() == Some("https"))
        .body(body);

    if let Some(addr) = remote_addr {
        builder = builder.remote_addr(addr);
    }

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            builder = builder.header(name.as_str(), value);
        }
    }

    builder.build()
}

/// A request captured from a CGI-style synchronous source: the standard
/// variable map plus the raw payload.
#[derive(Debug, Clone, Default)]
pub struct CgiRequest {
    /// CGI meta-variables (`REQUEST_METHOD`, `PATH_INFO`, `HTTP_*`, ...).
    pub vars: HashMap<String, String>,
    /// The request payload.
    pub body: Bytes,
}

impl CgiRequest {
    /// Build from a variable map and payload.
    pub fn new(vars: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            vars,
            body: body.into(),
        }
    }

    /// Normalize into a [`RequestContext`].
    pub fn into_context(self) -> RequestContext {
        let Self { vars, body } = self;

        let method = vars
            .get("REQUEST_METHOD")
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
            .unwrap_or(Method::GET);

        let uri = match vars.get("REQUEST_URI") {
            Some(uri) => uri.clone(),
            None => {
                let path = vars
                    .get("PATH_INFO")
                    .cloned()
                    .unwrap_or_else(|| "/".to_string());
                match vars.get("QUERY_STRING") {
                    Some(query) if !query.is_empty() => format!("{}?{}", path, query),
                    _ => path,
                }
            }
        };

        let secure = vars.get("HTTPS").is_some_and(|v| v == "on" || v == "1")
            || vars.get("SERVER_PORT").is_some_and(|p| p == "443");

        let mut builder = RequestContext::builder(method, uri).secure(secure).body(body);

        if let Some(addr) = remote_addr(&vars) {
            builder = builder.remote_addr(addr);
        }

        for (name, value) in &vars {
            if let Some(raw) = name.strip_prefix("HTTP_") {
                builder = builder.header(raw.replace('_', "-"), value.as_str());
            }
        }
        // CONTENT_TYPE and CONTENT_LENGTH arrive without the HTTP_ prefix.
        if let Some(content_type) = vars.get("CONTENT_TYPE") {
            builder = builder.header("Content-Type", content_type.as_str());
        }
        if let Some(content_length) = vars.get("CONTENT_LENGTH") {
            builder = builder.header("Content-Length", content_length.as_str());
        }

        builder.build()
    }
}

fn remote_addr(vars: &HashMap<String, String>) -> Option<SocketAddr> {
    let host = vars.get("REMOTE_ADDR")?;
    let port = vars
        .get("REMOTE_PORT")
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(0);
    format!("{}:{}", host, port).parse().ok()
}
