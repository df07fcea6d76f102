//! Viaduct application builder
//!
//! # Example
//!
//! ```rust,ignore
//! use viaduct::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     App::new()
//!         .languages([("en", "English"), ("bg", "Bulgarian")], "en")
//!         .route("/users/{id}", get(Endpoint::new("users.show", show_user)))
//!         .run("127.0.0.1:8080")
//!         .await
//! }
//! ```

use crate::binder::DomainSource;
use crate::dispatch::{Dispatcher, RoleHook};
use crate::endpoint::{Endpoint, MethodEndpoints};
use crate::errors::{ErrorChain, ErrorHandler};
use crate::language::Languages;
use crate::request::RequestContext;
use crate::response::ResponseContext;
use crate::routing::{RadixRouteTable, RouteTable};
use crate::server::Server;
use crate::signal::ControlFlowSignal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application builder wiring routes, endpoints, languages, and the error
/// chain into a [`Dispatcher`].
pub struct App {
    table: RadixRouteTable,
    custom_table: Option<Arc<dyn RouteTable>>,
    endpoints: HashMap<String, Endpoint>,
    languages: Languages,
    domain: Option<Arc<dyn DomainSource>>,
    chain: ErrorChain,
    role_hook: Option<RoleHook>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create a new application.
    pub fn new() -> Self {
        // Initialize tracing if not already done
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,viaduct=debug")),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        Self {
            table: RadixRouteTable::new(),
            custom_table: None,
            endpoints: HashMap::new(),
            languages: Languages::disabled(),
            domain: None,
            chain: ErrorChain::new(),
            role_hook: None,
        }
    }

    /// Register endpoints under a `{param}` path pattern.
    ///
    /// ```rust,ignore
    /// App::new()
    ///     .route("/users", get(list).post(create))
    ///     .route("/users/{id}", get(show).delete(destroy))
    /// ```
    ///
    /// Panics on a duplicate endpoint identity: registration happens at
    /// startup and identities must be stable.
    pub fn route(mut self, pattern: &str, endpoints: MethodEndpoints) -> Self {
        for (method, endpoint) in endpoints.into_endpoints() {
            let id = endpoint.id().to_string();
            self.table = self.table.route(pattern, method, id.clone());
            if self.endpoints.insert(id.clone(), endpoint).is_some() {
                panic!("duplicate endpoint id `{}`", id);
            }
        }
        self
    }

    /// Configure language-prefixed routing.
    pub fn languages<I, C, L>(mut self, entries: I, default_code: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        self.languages = Languages::new(entries, default_code);
        self
    }

    /// Install the data-access collaborator used by getter directives.
    pub fn domain_source(mut self, source: Arc<dyn DomainSource>) -> Self {
        self.domain = Some(source);
        self
    }

    /// Install the tier-one error collaborator.
    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.chain.set_handler(handler);
        self
    }

    /// Register an error page for a status code (tier two of the chain).
    pub fn error_page<F, Fut>(mut self, status: u16, page: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseContext, ControlFlowSignal>> + Send + 'static,
    {
        self.chain.set_page(status, page);
        self
    }

    /// Install the auth collaborator's role hook, run before routing.
    pub fn roles<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        self.role_hook = Some(Arc::new(hook));
        self
    }

    /// Replace the default radix table with an external route table.
    /// Registered endpoints are still looked up by the identities the
    /// table returns.
    pub fn route_table(mut self, table: Arc<dyn RouteTable>) -> Self {
        self.custom_table = Some(table);
        self
    }

    /// Finish the wiring. Exposed so in-process callers (tests, embedded
    /// runtimes) can drive the dispatcher without a socket.
    pub fn build_dispatcher(self) -> Dispatcher {
        let table: Arc<dyn RouteTable> = match self.custom_table {
            Some(table) => table,
            None => Arc::new(self.table),
        };
        Dispatcher::new(
            table,
            self.endpoints,
            self.languages,
            self.domain,
            self.chain,
            self.role_hook,
        )
    }

    /// Bind and serve until the process ends.
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Server::new(self.build_dispatcher()).run(addr).await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("endpoints", &self.endpoints.len())
            .field("languages", &self.languages.is_enabled())
            .finish()
    }
}
