//! The dispatch state machine
//!
//! One dispatcher execution handles exactly one request, walking a linear
//! pipeline: language resolution, route lookup, argument binding, guard,
//! handler invocation, response. Every failure branch terminates in a
//! concrete [`ResponseContext`]; nothing escapes [`Dispatcher::serve`].
//!
//! Control-flow signals raised by guards, handlers, or binding are caught
//! here and mapped deterministically; they are expected outcomes and are
//! logged at debug level only. Internal errors and collaborator failures
//! go through the tiered error chain and are logged as errors.

use crate::binder::{bind, DomainSource};
use crate::endpoint::Endpoint;
use crate::errors::{default_text, login_required_response, sanitize_redirect_target, ErrorChain};
use crate::language::{LanguageOutcome, Languages};
use crate::request::RequestContext;
use crate::response::ResponseContext;
use crate::routing::{RouteMatch, RouteTable};
use crate::signal::ControlFlowSignal;
use http::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Hook the application's auth collaborator uses to assign a role before
/// routing.
pub type RoleHook = Arc<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

/// Per-process dispatch engine. Holds no per-request state; many requests
/// may be in flight against one dispatcher.
pub struct Dispatcher {
    routes: Arc<dyn RouteTable>,
    endpoints: HashMap<String, Endpoint>,
    languages: Languages,
    domain: Option<Arc<dyn DomainSource>>,
    chain: ErrorChain,
    role_hook: Option<RoleHook>,
}

impl Dispatcher {
    pub(crate) fn new(
        routes: Arc<dyn RouteTable>,
        endpoints: HashMap<String, Endpoint>,
        languages: Languages,
        domain: Option<Arc<dyn DomainSource>>,
        chain: ErrorChain,
        role_hook: Option<RoleHook>,
    ) -> Self {
        Self {
            routes,
            endpoints,
            languages,
            domain,
            chain,
            role_hook,
        }
    }

    /// Dispatch one request to a response. Never fails: total collaborator
    /// failure still produces a response with the literal default text.
    pub async fn serve(&self, mut ctx: RequestContext) -> ResponseContext {
        if let Some(hook) = &self.role_hook {
            if let Some(role) = hook(&ctx) {
                ctx.set_role(role);
            }
        }

        // Start → LanguageResolved. A redirect skips straight to Responded.
        match self.languages.resolve(ctx.path()) {
            LanguageOutcome::Redirect { target, status } => {
                debug!(location = %target, "redirecting into default language");
                return ResponseContext::redirect(status, target);
            }
            LanguageOutcome::Pass { stripped, language } => {
                if let Some(code) = language {
                    ctx.set_language(code);
                }
                ctx.set_path_without_language(stripped);
            }
        }

        // LanguageResolved → Routed.
        let (endpoint, path_args) =
            match self.routes.lookup(ctx.method(), ctx.path_without_language()) {
                RouteMatch::Found {
                    handler_id,
                    path_args,
                } => match self.endpoints.get(&handler_id) {
                    Some(endpoint) => (endpoint, path_args),
                    None => {
                        error!(handler_id = %handler_id, "route table returned an unregistered handler");
                        let ctx = Arc::new(ctx);
                        let status = StatusCode::INTERNAL_SERVER_ERROR;
                        return self.chain.resolve(status, &default_text(status), ctx).await;
                    }
                },
                RouteMatch::NotFound => {
                    debug!(path = ctx.path_without_language(), "no route matched");
                    let ctx = Arc::new(ctx);
                    let status = StatusCode::NOT_FOUND;
                    return self.chain.resolve(status, &default_text(status), ctx).await;
                }
                RouteMatch::MethodNotAllowed { allowed } => {
                    debug!(path = ctx.path_without_language(), method = %ctx.method(), "method not allowed");
                    let ctx = Arc::new(ctx);
                    let status = StatusCode::METHOD_NOT_ALLOWED;
                    let mut resp = self.chain.resolve(status, &default_text(status), ctx).await;
                    let allow = allowed
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    resp.set_header("Allow", allow);
                    return resp;
                }
                RouteMatch::Error { detail } => {
                    error!(detail = %detail, "route table failed");
                    let ctx = Arc::new(ctx);
                    let status = StatusCode::INTERNAL_SERVER_ERROR;
                    return self.chain.resolve(status, &default_text(status), ctx).await;
                }
            };

        // Routed → Bound.
        let args = match bind(endpoint.directives(), &path_args, self.domain.as_ref()).await {
            Ok(args) => args,
            Err(signal) => {
                let ctx = Arc::new(ctx);
                return self.signal_to_response(signal, &ctx).await;
            }
        };

        // Bound → Invoked → Responded. The guard stands in for the
        // controller constructor: its signals map exactly like body
        // signals.
        let ctx = Arc::new(ctx);
        if let Err(signal) = endpoint.check_guard(ctx.clone()).await {
            return self.signal_to_response(signal, &ctx).await;
        }

        match endpoint.call(ctx.clone(), args).await {
            Ok(response) => response,
            Err(signal) => self.signal_to_response(signal, &ctx).await,
        }
    }

    /// The deterministic signal→response mapping.
    async fn signal_to_response(
        &self,
        signal: ControlFlowSignal,
        ctx: &Arc<RequestContext>,
    ) -> ResponseContext {
        match signal {
            ControlFlowSignal::LoginRequired { target, code } => {
                debug!(forward = %target, code = code.as_u16(), "login required");
                login_required_response(&target, code, ctx)
            }
            ControlFlowSignal::RestFailure { code, payload } => {
                debug!(code = code.as_u16(), "rest failure");
                ResponseContext::json(code, payload)
            }
            ControlFlowSignal::MessageFailure { code, text } => {
                debug!(code = code.as_u16(), "message failure");
                ResponseContext::text(code, text)
            }
            ControlFlowSignal::Internal { text } => {
                error!(text = %text, "internal error during dispatch");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                self.chain
                    .resolve(status, &default_text(status), ctx.clone())
                    .await
            }
            ControlFlowSignal::NotFound { text, status } => {
                if status.is_redirection() {
                    // Binding failures default here: back to the referer
                    // with the message queued for the next page view.
                    debug!(status = status.as_u16(), "not found, redirecting to referer");
                    let mut resp = ResponseContext::redirect(status, referer(ctx));
                    resp.queue_message(text);
                    resp
                } else {
                    debug!(status = status.as_u16(), "not found");
                    let text = if text.is_empty() {
                        default_text(status)
                    } else {
                        text
                    };
                    self.chain.resolve(status, &text, ctx.clone()).await
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoints", &self.endpoints.len())
            .field("languages", &self.languages.is_enabled())
            .finish()
    }
}

fn referer(ctx: &RequestContext) -> String {
    match ctx.header("Referer") {
        Some(referer) => sanitize_redirect_target(referer),
        None => "/".to_string(),
    }
}
