//! Endpoint registration
//!
//! An [`Endpoint`] is one handler registration: a stable identity, the
//! handler function, the binding directives for its parameters, and an
//! optional guard that runs before the body (the place for authorization
//! checks that would otherwise live in a controller constructor). All of
//! it is declared at startup; requests only read.

use crate::binder::{Args, BindingDirective};
use crate::request::RequestContext;
use crate::response::ResponseContext;
use crate::signal::ControlFlowSignal;
use http::Method;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Outcome future of a handler or guard call.
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<ResponseContext, ControlFlowSignal>> + Send>>;
type GuardFuture = Pin<Box<dyn Future<Output = Result<(), ControlFlowSignal>> + Send>>;

type HandlerFn = Arc<dyn Fn(Arc<RequestContext>, Args) -> HandlerFuture + Send + Sync>;
type GuardFn = Arc<dyn Fn(Arc<RequestContext>) -> GuardFuture + Send + Sync>;

/// One handler registration.
#[derive(Clone)]
pub struct Endpoint {
    id: String,
    handler: HandlerFn,
    directives: Vec<BindingDirective>,
    guard: Option<GuardFn>,
}

impl Endpoint {
    /// Register a handler under a stable identity.
    ///
    /// ```rust,ignore
    /// Endpoint::new("users.show", |_ctx, args| async move {
    ///     let id = args.get_str("id").unwrap_or_default().to_string();
    ///     Ok(ResponseContext::text(StatusCode::OK, format!("user {id}")))
    /// })
    /// ```
    pub fn new<F, Fut>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<RequestContext>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseContext, ControlFlowSignal>> + Send + 'static,
    {
        Self {
            id: id.into(),
            handler: Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
            directives: Vec::new(),
            guard: None,
        }
    }

    /// Attach a binding directive for one parameter. Directives run in
    /// declaration order.
    pub fn directive(mut self, directive: BindingDirective) -> Self {
        self.directives.push(directive);
        self
    }

    /// Attach a guard that runs before the handler body. A guard signal is
    /// mapped exactly like one raised inside the body.
    pub fn guard<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ControlFlowSignal>> + Send + 'static,
    {
        self.guard = Some(Arc::new(move |ctx| Box::pin(guard(ctx))));
        self
    }

    /// The endpoint identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The binding directives.
    pub fn directives(&self) -> &[BindingDirective] {
        &self.directives
    }

    pub(crate) fn call(&self, ctx: Arc<RequestContext>, args: Args) -> HandlerFuture {
        (self.handler)(ctx, args)
    }

    pub(crate) async fn check_guard(
        &self,
        ctx: Arc<RequestContext>,
    ) -> Result<(), ControlFlowSignal> {
        match &self.guard {
            Some(guard) => guard(ctx).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("directives", &self.directives.len())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Endpoints for a single path, one per HTTP method.
#[derive(Clone, Default)]
pub struct MethodEndpoints {
    endpoints: HashMap<Method, Endpoint>,
}

impl MethodEndpoints {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn on(mut self, method: Method, endpoint: Endpoint) -> Self {
        self.endpoints.insert(method, endpoint);
        self
    }

    /// Add a GET endpoint.
    pub fn get(self, endpoint: Endpoint) -> Self {
        self.on(Method::GET, endpoint)
    }

    /// Add a POST endpoint.
    pub fn post(self, endpoint: Endpoint) -> Self {
        self.on(Method::POST, endpoint)
    }

    /// Add a PUT endpoint.
    pub fn put(self, endpoint: Endpoint) -> Self {
        self.on(Method::PUT, endpoint)
    }

    /// Add a PATCH endpoint.
    pub fn patch(self, endpoint: Endpoint) -> Self {
        self.on(Method::PATCH, endpoint)
    }

    /// Add a DELETE endpoint.
    pub fn delete(self, endpoint: Endpoint) -> Self {
        self.on(Method::DELETE, endpoint)
    }

    pub(crate) fn into_endpoints(self) -> HashMap<Method, Endpoint> {
        self.endpoints
    }
}

/// A GET endpoint set.
pub fn get(endpoint: Endpoint) -> MethodEndpoints {
    MethodEndpoints::new().get(endpoint)
}

/// A POST endpoint set.
pub fn post(endpoint: Endpoint) -> MethodEndpoints {
    MethodEndpoints::new().post(endpoint)
}

/// A PUT endpoint set.
pub fn put(endpoint: Endpoint) -> MethodEndpoints {
    MethodEndpoints::new().put(endpoint)
}

/// A PATCH endpoint set.
pub fn patch(endpoint: Endpoint) -> MethodEndpoints {
    MethodEndpoints::new().patch(endpoint)
}

/// A DELETE endpoint set.
pub fn delete(endpoint: Endpoint) -> MethodEndpoints {
    MethodEndpoints::new().delete(endpoint)
}
