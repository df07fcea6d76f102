//! # Viaduct Core
//!
//! Core library providing the request-dispatch engine for Viaduct.
//!
//! This crate is not meant to be used directly. Use `viaduct` instead.

pub mod adapter;
mod app;
pub mod binder;
mod dispatch;
mod endpoint;
mod errors;
pub mod install;
mod language;
mod request;
mod response;
mod routing;
mod server;
mod signal;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::App;
pub use binder::{bind, ArgValue, Args, BindingDirective, BindingTarget, DomainSource, PathEnum, SourceError};
pub use dispatch::{Dispatcher, RoleHook};
pub use endpoint::{delete, get, patch, post, put, Endpoint, MethodEndpoints};
pub use errors::{BoxError, ErrorChain, ErrorHandler, ErrorPage};
pub use language::{LanguageOutcome, Languages};
pub use request::{canonical_header_name, RequestBuilder, RequestContext, UploadedFile};
pub use response::{decode_flash, Body, ResponseContext};
pub use routing::{RadixRouteTable, RouteMatch, RouteTable};
pub use signal::ControlFlowSignal;
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
