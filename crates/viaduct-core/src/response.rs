//! Response types for Viaduct
//!
//! [`ResponseContext`] is the uniform outcome of every dispatch: a status,
//! a body in one of a few shapes, ordered headers, cookie descriptors, an
//! optional redirect location, and queued one-shot messages. It stays a
//! plain data carrier until [`ResponseContext::into_http`] serializes it
//! for the transport.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use cookie::Cookie;
use http::{header, StatusCode};
use http_body_util::Full;

/// Response payload shapes.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Plain text, serialized as `text/plain; charset=utf-8`.
    Text(String),
    /// A JSON value, serialized as `application/json`.
    Json(serde_json::Value),
    /// An already-serialized payload, passed through untouched.
    Raw(Bytes),
}

/// Uniform dispatch outcome.
///
/// Setting `location` implies a `Location` header on serialization. The
/// core does not force the status into the 3xx range when a location is
/// present; that stays with the caller.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    status: StatusCode,
    body: Body,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
    location: Option<String>,
    messages: Vec<String>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    /// An empty 200 response.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Empty,
            headers: Vec::new(),
            cookies: Vec::new(),
            location: None,
            messages: Vec::new(),
        }
    }

    /// A plain-text response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut resp = Self::new();
        resp.status = status;
        resp.body = Body::Text(text.into());
        resp
    }

    /// A JSON response.
    pub fn json(status: StatusCode, value: serde_json::Value) -> Self {
        let mut resp = Self::new();
        resp.status = status;
        resp.body = Body::Json(value);
        resp
    }

    /// A redirect response. The target lands in the `Location` header when
    /// serialized.
    pub fn redirect(status: StatusCode, target: impl Into<String>) -> Self {
        let mut resp = Self::new();
        resp.status = status;
        resp.location = Some(target.into());
        resp
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Overwrite the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// The body as text, when it has a textual shape.
    pub fn body_text(&self) -> Option<String> {
        match &self.body {
            Body::Empty => None,
            Body::Text(text) => Some(text.clone()),
            Body::Json(value) => serde_json::to_string(value).ok(),
            Body::Raw(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// The headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The first value recorded for a header name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header; an existing value for the same name is replaced
    /// (last write wins).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Append a header without replacing earlier values.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Attach a cookie descriptor.
    pub fn add_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    /// The attached cookies.
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// The redirect target, if set.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Set the redirect target.
    pub fn set_location(&mut self, target: impl Into<String>) {
        self.location = Some(target.into());
    }

    /// Queue a one-shot message for the next page view. Messages are
    /// serialized into a `flash` cookie (base64-wrapped JSON array).
    pub fn queue_message(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    /// The queued one-shot messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Serialize into an HTTP response for the transport layer.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);

        let has_content_type = self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let payload = match self.body {
            Body::Empty => Bytes::new(),
            Body::Text(text) => {
                if !has_content_type {
                    builder = builder.header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
                }
                Bytes::from(text)
            }
            Body::Json(value) => {
                if !has_content_type {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                }
                match serde_json::to_vec(&value) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(_) => Bytes::from_static(b"null"),
                }
            }
            Body::Raw(bytes) => {
                if !has_content_type {
                    builder = builder.header(header::CONTENT_TYPE, "application/octet-stream");
                }
                bytes
            }
        };

        if let Some(location) = &self.location {
            builder = builder.header(header::LOCATION, location.as_str());
        }

        for cookie in &self.cookies {
            builder = builder.header(header::SET_COOKIE, cookie.to_string());
        }

        if !self.messages.is_empty() {
            let encoded = encode_flash(&self.messages);
            let flash = Cookie::build(("flash", encoded)).path("/").build();
            builder = builder.header(header::SET_COOKIE, flash.to_string());
        }

        builder
            .body(Full::new(payload))
            .unwrap_or_else(|_| fallback_response())
    }
}

fn encode_flash(messages: &[String]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    BASE64.encode(json.as_bytes())
}

/// Decode a `flash` cookie written by [`ResponseContext::into_http`].
pub fn decode_flash(value: &str) -> Vec<String> {
    BASE64
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

// Only reachable when a header value failed validation. The body is the
// literal total-failure text required of the final tier.
fn fallback_response() -> http::Response<Full<Bytes>> {
    let mut resp = http::Response::new(Full::new(Bytes::from_static(
        b"500 Internal server error",
    )));
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp
}
