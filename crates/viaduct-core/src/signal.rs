//! Control-flow signals raised by handler code
//!
//! A signal is a typed early return, not an unexpected failure. Handlers,
//! endpoint guards, and error pages short-circuit by returning one as the
//! `Err` variant of their result; the dispatcher catches every signal at
//! its boundary and maps it to a concrete
//! [`ResponseContext`](crate::ResponseContext). Signals never propagate
//! past the dispatcher.

use http::StatusCode;
use thiserror::Error;

/// Typed short-circuit outcome of handler execution.
#[derive(Debug, Clone, Error)]
pub enum ControlFlowSignal {
    /// Authorization is required before the handler may run.
    ///
    /// `target` is the login location the client should be sent to. When the
    /// code is 403 and the request is AJAX, the dispatcher answers with a
    /// JSON `{"forward": target}` body instead of a redirect.
    #[error("login required ({code}): {target}")]
    LoginRequired { target: String, code: StatusCode },

    /// A REST-style failure carrying a JSON payload.
    #[error("rest failure ({code})")]
    RestFailure {
        code: StatusCode,
        payload: serde_json::Value,
    },

    /// A plain-text failure with an explicit status.
    #[error("{text} ({code})")]
    MessageFailure { code: StatusCode, text: String },

    /// An unexpected internal condition. Mapped to a 500 through the error
    /// chain and logged, unlike the other variants.
    #[error("internal error: {text}")]
    Internal { text: String },

    /// A missing resource or an unresolvable path argument.
    ///
    /// `status` is usually 404, but argument-binding directives default it
    /// to 301: a 3xx status sends the client back to the referer with the
    /// message queued as a one-shot notification.
    #[error("not found: {text}")]
    NotFound { text: String, status: StatusCode },
}

impl ControlFlowSignal {
    /// A 403 login-required signal.
    pub fn login(target: impl Into<String>) -> Self {
        Self::LoginRequired {
            target: target.into(),
            code: StatusCode::FORBIDDEN,
        }
    }

    /// A login-required signal with an explicit status code.
    pub fn login_with_code(target: impl Into<String>, code: StatusCode) -> Self {
        Self::LoginRequired {
            target: target.into(),
            code,
        }
    }

    /// A REST failure with a JSON payload.
    pub fn rest(code: StatusCode, payload: serde_json::Value) -> Self {
        Self::RestFailure { code, payload }
    }

    /// A plain-text failure.
    pub fn message(code: StatusCode, text: impl Into<String>) -> Self {
        Self::MessageFailure {
            code,
            text: text.into(),
        }
    }

    /// An internal error.
    pub fn internal(text: impl Into<String>) -> Self {
        Self::Internal { text: text.into() }
    }

    /// A 404 not-found signal.
    pub fn not_found(text: impl Into<String>) -> Self {
        Self::NotFound {
            text: text.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    /// A not-found signal with an explicit status, as emitted by binding
    /// directives.
    pub fn not_found_with_status(text: impl Into<String>, status: StatusCode) -> Self {
        Self::NotFound {
            text: text.into(),
            status,
        }
    }
}
