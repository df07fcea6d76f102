//! Request types for Viaduct
//!
//! [`RequestContext`] is the immutable per-request snapshot every later
//! stage works from. It is built once from transport data through
//! [`RequestBuilder`], which performs the normalization both transport
//! adapters share: header canonicalization, query/cookie/body
//! decomposition, and the derived `is_secure` / `is_ajax` flags.

use bytes::Bytes;
use http::Method;
use std::collections::HashMap;
use std::net::SocketAddr;

/// A file received with the request.
///
/// The core only carries the payload; validation and storage belong to the
/// application layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original client-side file name.
    pub file_name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Raw file payload.
    pub data: Bytes,
}

/// Immutable snapshot of an inbound request.
///
/// Constructed once per request; only `language` and `role` are written
/// after construction, each exactly once during dispatch.
pub struct RequestContext {
    method: Method,
    uri: String,
    path: String,
    path_without_language: String,
    query: HashMap<String, String>,
    body: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
    is_secure: bool,
    is_ajax: bool,
    language: Option<String>,
    role: Option<String>,
    remote_addr: Option<SocketAddr>,
    raw_body: Bytes,
}

impl RequestContext {
    /// Start building a request from transport data.
    pub fn builder(method: Method, uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, uri)
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request URI (path plus query).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The path component of the URI.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path with any language prefix stripped. Equals [`Self::path`]
    /// until the language resolver has run.
    pub fn path_without_language(&self) -> &str {
        &self.path_without_language
    }

    /// Query-string parameters.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// A single query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Decoded body fields (urlencoded or multipart text fields).
    pub fn body(&self) -> &HashMap<String, String> {
        &self.body
    }

    /// A single body field.
    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str)
    }

    /// Files received with a multipart body.
    pub fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.files
    }

    /// A single uploaded file.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Request cookies.
    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// A single cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// All headers, keyed by canonical Title-Case name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// A header by name; the probe is canonicalized, so any casing works.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(name))
            .map(String::as_str)
    }

    /// Whether the request arrived over a secure channel.
    pub fn is_secure(&self) -> bool {
        self.is_secure
    }

    /// Whether the request was made with `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.is_ajax
    }

    /// The detected language code, once resolved.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The authorization role, if the application's auth collaborator set one.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Set the authorization role. Called by the application's auth
    /// collaborator before routing.
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = Some(role.into());
    }

    /// Client address, when the transport knows it.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The unparsed request payload.
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    pub(crate) fn set_language(&mut self, code: impl Into<String>) {
        self.language = Some(code.into());
    }

    pub(crate) fn set_path_without_language(&mut self, path: impl Into<String>) {
        self.path_without_language = path.into();
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("language", &self.language)
            .field("role", &self.role)
            .finish()
    }
}

/// Canonicalize a header name to its Title-Case word form
/// (`content-type` → `Content-Type`, `HTTP_USER_AGENT` stays `User-Agent`
/// only after the CGI adapter has replaced the underscores).
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut out = String::with_capacity(word.len());
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                for ch in chars {
                    out.extend(ch.to_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Builder performing the transport-independent request normalization.
///
/// Both adapters (hyper and CGI-style) feed raw header pairs and the body
/// into this builder so the downstream contract is identical regardless of
/// source.
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    secure_hint: bool,
}

impl RequestBuilder {
    /// Create a builder for the given method and URI.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            remote_addr: None,
            secure_hint: false,
        }
    }

    /// Add a raw header pair. Names are canonicalized in [`Self::build`].
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the raw request payload.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Record the client address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Mark the request as having arrived over a secure transport (TLS
    /// listener, `HTTPS` CGI variable). `X-Forwarded-Proto: https` is also
    /// honored during [`Self::build`].
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure_hint = secure;
        self
    }

    /// Normalize everything into a [`RequestContext`].
    pub fn build(self) -> RequestContext {
        let mut headers = HashMap::new();
        for (name, value) in &self.headers {
            headers.insert(canonical_header_name(name), value.clone());
        }

        let (path, query_string) = match self.uri.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (self.uri.clone(), String::new()),
        };

        let query = parse_urlencoded(&query_string);

        let cookies = headers
            .get("Cookie")
            .map(|raw| parse_cookie_header(raw))
            .unwrap_or_default();

        let content_type = headers.get("Content-Type").cloned().unwrap_or_default();
        let (body, files) = decompose_body(&content_type, &self.body);

        let is_secure = self.secure_hint
            || headers
                .get("X-Forwarded-Proto")
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        let is_ajax = headers
            .get("X-Requested-With")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        RequestContext {
            method: self.method,
            uri: self.uri,
            path_without_language: path.clone(),
            path,
            query,
            body,
            files,
            cookies,
            headers,
            is_secure,
            is_ajax,
            language: None,
            role: None,
            remote_addr: self.remote_addr,
            raw_body: self.body,
        }
    }
}

fn parse_urlencoded(raw: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str(raw).unwrap_or_default()
}

fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for pair in raw.split(';') {
        if let Ok(parsed) = cookie::Cookie::parse(pair.trim().to_string()) {
            out.insert(parsed.name().to_string(), parsed.value().to_string());
        }
    }
    out
}

/// Split the payload into text fields and files according to its content
/// type. Unknown content types leave both maps empty; the raw payload is
/// always kept on the context.
fn decompose_body(
    content_type: &str,
    payload: &Bytes,
) -> (HashMap<String, String>, HashMap<String, UploadedFile>) {
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let fields = parse_urlencoded(&String::from_utf8_lossy(payload));
        return (fields, HashMap::new());
    }

    if content_type.starts_with("multipart/form-data") {
        if let Some(boundary) = extract_boundary(content_type) {
            return parse_multipart(payload, &boundary);
        }
    }

    (HashMap::new(), HashMap::new())
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_string())
    })
}

/// Minimal multipart decomposition: text fields land in the body map,
/// fields with a filename in the files map. Carrier only; upload
/// validation stays with the application.
fn parse_multipart(
    payload: &Bytes,
    boundary: &str,
) -> (HashMap<String, String>, HashMap<String, UploadedFile>) {
    let mut fields = HashMap::new();
    let mut files = HashMap::new();

    let delimiter = format!("--{}", boundary);
    let end_delimiter = format!("--{}--", boundary);
    let text = String::from_utf8_lossy(payload);

    for part in text.split(&delimiter).skip(1) {
        let part = part.trim_start_matches("\r\n").trim_start_matches('\n');
        if part.is_empty() || part.starts_with("--") {
            continue;
        }

        let Some(split) = part.find("\r\n\r\n").or_else(|| part.find("\n\n")) else {
            continue;
        };
        let headers_section = &part[..split];
        let body_section = part[split..]
            .trim_start_matches("\r\n\r\n")
            .trim_start_matches("\n\n")
            .trim_end_matches(&end_delimiter)
            .trim_end_matches("\r\n")
            .trim_end_matches('\n');

        let mut name = None;
        let mut file_name = None;
        let mut content_type = None;

        for line in headers_section.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "content-disposition" => {
                    for attr in value.split(';') {
                        let attr = attr.trim();
                        if let Some(v) = attr.strip_prefix("name=") {
                            name = Some(v.trim_matches('"').to_string());
                        } else if let Some(v) = attr.strip_prefix("filename=") {
                            file_name = Some(v.trim_matches('"').to_string());
                        }
                    }
                }
                "content-type" => content_type = Some(value.to_string()),
                _ => {}
            }
        }

        let Some(name) = name else { continue };
        match file_name {
            Some(file_name) => {
                files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        data: Bytes::copy_from_slice(body_section.as_bytes()),
                    },
                );
            }
            None => {
                fields.insert(name, body_section.to_string());
            }
        }
    }

    (fields, files)
}
