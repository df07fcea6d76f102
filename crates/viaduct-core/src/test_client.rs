//! TestClient for driving the dispatcher without network binding
//!
//! Sends simulated requests through the full dispatch pipeline (language
//! resolution, routing, binding, the error chain) and hands back the
//! resulting [`ResponseContext`] for assertions.
//!
//! # Example
//!
//! ```rust,ignore
//! use viaduct_core::{get, App, Endpoint, TestClient};
//!
//! #[tokio::test]
//! async fn test_hello() {
//!     let app = App::new().route("/", get(Endpoint::new("hello", hello)));
//!     let client = TestClient::new(app);
//!
//!     let response = client.get("/").await;
//!     response.assert_status(200);
//! }
//! ```

use crate::app::App;
use crate::dispatch::Dispatcher;
use crate::request::RequestContext;
use crate::response::ResponseContext;
use bytes::Bytes;
use http::Method;
use std::sync::Arc;

/// In-process client over a built dispatcher.
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
}

impl TestClient {
    /// Build a client from an application.
    pub fn new(app: App) -> Self {
        Self {
            dispatcher: Arc::new(app.build_dispatcher()),
        }
    }

    /// Send a GET request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(TestRequest::new(Method::GET, uri)).await
    }

    /// Send a POST request with a form body.
    pub async fn post_form(&self, uri: &str, form: &str) -> TestResponse {
        self.request(
            TestRequest::new(Method::POST, uri)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(form.to_string()),
        )
        .await
    }

    /// Send a request with full control.
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = RequestContext::builder(req.method, req.uri);
        for (name, value) in req.headers {
            builder = builder.header(name, value);
        }
        let ctx = builder.body(req.body).build();
        TestResponse {
            inner: self.dispatcher.serve(ctx).await,
        }
    }
}

/// A request under construction.
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl TestRequest {
    /// Start a request.
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// The dispatch outcome, with assertion helpers.
pub struct TestResponse {
    inner: ResponseContext,
}

impl TestResponse {
    /// The response status as a bare number.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Assert the status code.
    pub fn assert_status(&self, expected: u16) {
        assert_eq!(
            self.status(),
            expected,
            "expected status {}, got {} (body: {:?})",
            expected,
            self.status(),
            self.inner.body_text(),
        );
    }

    /// The body as text.
    pub fn text(&self) -> String {
        self.inner.body_text().unwrap_or_default()
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.text()).expect("body is not valid JSON")
    }

    /// The redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.inner.location()
    }

    /// A response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    /// The queued one-shot messages.
    pub fn messages(&self) -> &[String] {
        self.inner.messages()
    }

    /// The full response context.
    pub fn into_inner(self) -> ResponseContext {
        self.inner
    }
}
