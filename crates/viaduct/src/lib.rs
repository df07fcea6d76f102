//! # Viaduct
//!
//! A request-dispatch core for web applications in Rust.
//!
//! Viaduct takes a normalized HTTP request, resolves a target endpoint,
//! binds path arguments (including foreign-key-style identifiers resolved
//! into domain objects), invokes the handler, and reduces the outcome
//! (return value or control-flow signal) into a uniform response. It ships
//! language-prefixed URL routing and a tiered error-recovery chain.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viaduct::prelude::*;
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     App::new()
//!         .languages([("en", "English"), ("bg", "Bulgarian")], "en")
//!         .route(
//!             "/users/{id}",
//!             get(Endpoint::new("users.show", |_ctx, args| async move {
//!                 let id = args.get_str("id").unwrap_or_default().to_string();
//!                 Ok(ResponseContext::text(StatusCode::OK, format!("user {id}")))
//!             })),
//!         )
//!         .run("127.0.0.1:8080")
//!         .await
//! }
//! ```
//!
//! ## Key pieces
//!
//! - [`App`]: builder wiring routes, languages, collaborators
//! - [`Endpoint`]: one handler registration with binding directives and
//!   an optional guard
//! - [`ControlFlowSignal`]: typed early returns, mapped deterministically
//!   to responses at the dispatcher boundary
//! - [`ErrorChain`]: tiered fallback for routing failures and internal
//!   errors

// Re-export core functionality
pub use viaduct_core::*;

/// Commonly used imports.
pub mod prelude {
    pub use viaduct_core::{
        delete, get, patch, post, put, App, ArgValue, Args, BindingDirective, BindingTarget,
        ControlFlowSignal, DomainSource, Endpoint, ErrorHandler, Languages, PathEnum,
        RequestContext, ResponseContext,
    };
}
