//! Tiered error recovery
//!
//! When routing fails, a handler is missing, or an internal error
//! surfaces, the [`ErrorChain`] produces the response. Tiers are tried in
//! order and each tier's own failure logs and falls through: the
//! application-supplied [`ErrorHandler`], then the status-keyed error-page
//! registry, then a bare response carrying the literal default text. The
//! final tier cannot fail, so every dispatch terminates in a concrete
//! response.

use crate::request::RequestContext;
use crate::response::ResponseContext;
use crate::signal::ControlFlowSignal;
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::warn;

/// Boxed error for collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The application-supplied error collaborator, tier one of the chain.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// Produce a response for the given status. An `Err` falls through to
    /// the next tier.
    async fn handle(
        &self,
        status: StatusCode,
        default_text: &str,
        ctx: Arc<RequestContext>,
    ) -> Result<ResponseContext, BoxError>;
}

type ErrorPageFuture =
    Pin<Box<dyn Future<Output = Result<ResponseContext, ControlFlowSignal>> + Send>>;

/// A registered error page, tier two. The explicit status→handler map
/// replaces name-convention lookups: pages are registered at startup.
pub type ErrorPage = Arc<dyn Fn(Arc<RequestContext>) -> ErrorPageFuture + Send + Sync>;

/// Ordered fallback chain.
#[derive(Clone, Default)]
pub struct ErrorChain {
    handler: Option<Arc<dyn ErrorHandler>>,
    pages: HashMap<u16, ErrorPage>,
}

impl ErrorChain {
    /// An empty chain: only the bare default tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tier-one collaborator.
    pub fn set_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.handler = Some(handler);
    }

    /// Register an error page for a status code.
    pub fn set_page<F, Fut>(&mut self, status: u16, page: F)
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseContext, ControlFlowSignal>> + Send + 'static,
    {
        self.pages
            .insert(status, Arc::new(move |ctx| Box::pin(page(ctx))));
    }

    /// Resolve a status into a response. Never fails.
    pub async fn resolve(
        &self,
        status: StatusCode,
        default_text: &str,
        ctx: Arc<RequestContext>,
    ) -> ResponseContext {
        if let Some(handler) = &self.handler {
            match handler.handle(status, default_text, ctx.clone()).await {
                Ok(response) => return response,
                Err(err) => {
                    warn!(status = status.as_u16(), error = %err, "error handler failed, falling through");
                }
            }
        }

        if let Some(page) = self.pages.get(&status.as_u16()) {
            match page(ctx.clone()).await {
                Ok(response) => return response,
                // A page demanding login is answered directly, with no
                // further fallback.
                Err(ControlFlowSignal::LoginRequired { target, code }) => {
                    return login_required_response(&target, code, &ctx);
                }
                Err(signal) => {
                    warn!(status = status.as_u16(), signal = %signal, "error page failed, falling through");
                }
            }
        }

        ResponseContext::text(status, default_text)
    }
}

impl std::fmt::Debug for ErrorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChain")
            .field("has_handler", &self.handler.is_some())
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The response for a login-required signal: a 403 JSON `{"forward": ..}`
/// for AJAX callers, a redirect with the signal's code otherwise.
pub(crate) fn login_required_response(
    target: &str,
    code: StatusCode,
    ctx: &RequestContext,
) -> ResponseContext {
    if code == StatusCode::FORBIDDEN && ctx.is_ajax() {
        return ResponseContext::json(
            StatusCode::FORBIDDEN,
            serde_json::json!({ "forward": target }),
        );
    }
    ResponseContext::redirect(code, sanitize_redirect_target(target))
}

/// Restrict redirect targets to relative same-origin paths. Anything else
/// (absolute URLs, protocol-relative `//host` forms) collapses to `/`.
pub(crate) fn sanitize_redirect_target(raw: &str) -> String {
    if raw.starts_with('/') && !raw.starts_with("//") {
        raw.to_string()
    } else {
        "/".to_string()
    }
}

/// The literal body text of the bare final tier.
pub(crate) fn default_text(status: StatusCode) -> String {
    match status.as_u16() {
        404 => "404 Not Found".to_string(),
        405 => "405 Method not allowed".to_string(),
        500 => "500 Internal server error".to_string(),
        code => match status.canonical_reason() {
            Some(reason) => format!("{} {}", code, reason),
            None => code.to_string(),
        },
    }
}
