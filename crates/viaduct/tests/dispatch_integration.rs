//! Integration tests for the Viaduct dispatch pipeline
//!
//! These drive full request cycles through the in-process test client:
//! language redirects, positional and directive-bound arguments, signal
//! mapping, and the tiered error chain.

use async_trait::async_trait;
use http::{Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viaduct::prelude::*;
use viaduct_core::{SourceError, TestClient, TestRequest};

#[derive(Debug, PartialEq)]
enum ArticleStatus {
    Draft,
    Published,
}

impl PathEnum for ArticleStatus {
    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct User {
    id: String,
}

struct Directory;

#[async_trait]
impl DomainSource for Directory {
    async fn resolve(&self, getter: &str, raw: &str) -> Result<Option<ArgValue>, SourceError> {
        match getter {
            "find_user" => {
                if raw == "7" {
                    Ok(Some(ArgValue::object(User { id: raw.to_string() })))
                } else {
                    Ok(None)
                }
            }
            other => Err(SourceError::UnknownGetter(other.to_string())),
        }
    }
}

fn localized_app() -> App {
    App::new()
        .languages([("en", "English"), ("bg", "Bulgarian")], "en")
        .route(
            "/users/{id}",
            get(Endpoint::new("users.show", |_ctx, args| async move {
                let id = args.get_str("id").unwrap_or_default().to_string();
                Ok(ResponseContext::text(StatusCode::OK, format!("user {}", id)))
            })),
        )
}

// Scenario: languages {en, bg}, default en, unprefixed path.
#[tokio::test]
async fn unprefixed_path_redirects_307_into_default_language() {
    let client = TestClient::new(localized_app());
    let resp = client.get("/users/5").await;

    resp.assert_status(307);
    assert_eq!(resp.location(), Some("/en/users/5"));
}

// Scenario: /bg/users/5 routes with pathArgs {id: "5"}, no directives.
#[tokio::test]
async fn prefixed_path_strips_language_and_passes_positional_arg() {
    let client = TestClient::new(localized_app());
    let resp = client.get("/bg/users/5").await;

    resp.assert_status(200);
    assert_eq!(resp.text(), "user 5");
}

// Scenario: enum directive misses; 301 back to the referer with the
// message queued.
#[tokio::test]
async fn enum_binding_failure_redirects_to_referer() {
    let app = App::new().route(
        "/articles/{status_id}",
        get(
            Endpoint::new("articles.by_status", |_ctx, args| async move {
                let status = args
                    .downcast::<ArticleStatus>("status")
                    .expect("bound status");
                Ok(ResponseContext::text(StatusCode::OK, format!("{:?}", status)))
            })
            .directive(BindingDirective::new(
                "status",
                BindingTarget::enum_of::<ArticleStatus>(),
            )),
        ),
    );
    let client = TestClient::new(app);

    let resp = client
        .request(TestRequest::new(Method::GET, "/articles/zz").header("Referer", "/articles"))
        .await;
    resp.assert_status(301);
    assert_eq!(resp.location(), Some("/articles"));
    assert_eq!(resp.messages(), ["Not Found".to_string()]);

    let ok = client.get("/articles/published").await;
    ok.assert_status(200);
    assert_eq!(ok.text(), "Published");
}

// Scenario: MethodNotAllowed with no error collaborators configured.
#[tokio::test]
async fn method_not_allowed_uses_bare_default_text() {
    let app = App::new().route(
        "/users",
        get(Endpoint::new("users.index", |_ctx, _args| async move {
            Ok(ResponseContext::new())
        })),
    );
    let client = TestClient::new(app);

    let resp = client.request(TestRequest::new(Method::POST, "/users")).await;
    resp.assert_status(405);
    assert_eq!(resp.text(), "405 Method not allowed");
    assert_eq!(resp.header("Allow"), Some("GET"));
}

// Scenario: RestFailure{422, {field: email}}.
#[tokio::test]
async fn rest_failure_serializes_payload_exactly() {
    let app = App::new().route(
        "/signup",
        post(Endpoint::new("signup", |_ctx, _args| async move {
            Err(ControlFlowSignal::rest(
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"field": "email"}),
            ))
        })),
    );
    let client = TestClient::new(app);

    let resp = client.request(TestRequest::new(Method::POST, "/signup")).await;
    resp.assert_status(422);
    assert_eq!(resp.json(), serde_json::json!({"field": "email"}));
}

#[tokio::test]
async fn getter_directive_resolves_domain_object() {
    let app = App::new()
        .domain_source(Arc::new(Directory))
        .route(
            "/profiles/{user_id}",
            get(
                Endpoint::new("profiles.show", |_ctx, args| async move {
                    let user = args.downcast::<User>("user").expect("bound user");
                    Ok(ResponseContext::text(StatusCode::OK, format!("profile of {}", user.id)))
                })
                .directive(
                    BindingDirective::new("user", BindingTarget::getter("find_user"))
                        .source_field("user_id")
                        .not_found_message("No such user")
                        .not_found_status(StatusCode::NOT_FOUND),
                ),
            ),
        );
    let client = TestClient::new(app);

    let resp = client.get("/profiles/7").await;
    resp.assert_status(200);
    assert_eq!(resp.text(), "profile of 7");

    // An unresolvable id flows through the chain with the directive's
    // status and message.
    let missing = client.get("/profiles/9").await;
    missing.assert_status(404);
    assert_eq!(missing.text(), "No such user");
}

#[tokio::test]
async fn ajax_login_required_answers_json_forward() {
    let app = App::new().route(
        "/account",
        get(
            Endpoint::new("account.show", |_ctx, _args| async move {
                Ok(ResponseContext::text(StatusCode::OK, "account"))
            })
            .guard(|ctx| async move {
                if ctx.role().is_none() {
                    Err(ControlFlowSignal::login("/login"))
                } else {
                    Ok(())
                }
            }),
        ),
    );
    let client = TestClient::new(app);

    let resp = client
        .request(
            TestRequest::new(Method::GET, "/account")
                .header("X-Requested-With", "XMLHttpRequest"),
        )
        .await;
    resp.assert_status(403);

    #[derive(serde::Deserialize)]
    struct Forward {
        forward: String,
    }
    let body: Forward = serde_json::from_str(&resp.text()).unwrap();
    assert_eq!(body.forward, "/login");
}

#[tokio::test]
async fn role_hook_satisfies_guard() {
    let app = App::new()
        .roles(|ctx| ctx.header("X-Role").map(str::to_string))
        .route(
            "/account",
            get(
                Endpoint::new("account.show", |ctx, _args| async move {
                    Ok(ResponseContext::text(
                        StatusCode::OK,
                        ctx.role().unwrap_or_default().to_string(),
                    ))
                })
                .guard(|ctx| async move {
                    if ctx.role().is_none() {
                        Err(ControlFlowSignal::login("/login"))
                    } else {
                        Ok(())
                    }
                }),
            ),
        );
    let client = TestClient::new(app);

    let resp = client
        .request(TestRequest::new(Method::GET, "/account").header("X-Role", "member"))
        .await;
    resp.assert_status(200);
    assert_eq!(resp.text(), "member");
}

// Adversarial chain: both collaborators fail, the bare tier still answers
// with the literal default text.
#[tokio::test]
async fn serve_terminates_when_every_error_tier_fails() {
    struct ExplodingHandler;

    #[async_trait]
    impl ErrorHandler for ExplodingHandler {
        async fn handle(
            &self,
            _status: StatusCode,
            _default_text: &str,
            _ctx: Arc<RequestContext>,
        ) -> Result<ResponseContext, viaduct_core::BoxError> {
            Err("boom".into())
        }
    }

    let app = App::new()
        .error_handler(Arc::new(ExplodingHandler))
        .error_page(404, |_ctx| async move {
            Err(ControlFlowSignal::internal("page boom"))
        });
    let client = TestClient::new(app);

    let resp = client.get("/nowhere").await;
    resp.assert_status(404);
    assert_eq!(resp.text(), "404 Not Found");
}

#[tokio::test]
async fn error_page_tier_answers_when_handler_tier_is_absent() {
    let app = App::new().error_page(404, |_ctx| async move {
        Ok(ResponseContext::text(
            StatusCode::NOT_FOUND,
            "custom missing page",
        ))
    });
    let client = TestClient::new(app);

    let resp = client.get("/nowhere").await;
    resp.assert_status(404);
    assert_eq!(resp.text(), "custom missing page");
}

// Two structurally identical requests produce equal responses; the only
// process-wide side effect allowed is the one-time install registry,
// which is itself idempotent.
#[tokio::test]
async fn dispatch_is_idempotent() {
    let installs = Arc::new(AtomicUsize::new(0));
    let installs_seen = installs.clone();

    let app = App::new().route(
        "/dashboard",
        get(Endpoint::new("dashboard", move |_ctx, _args| {
            let installs = installs_seen.clone();
            async move {
                viaduct_core::install::install_once("integration.panel", || {
                    installs.fetch_add(1, Ordering::SeqCst);
                });
                Ok(ResponseContext::text(StatusCode::OK, "dashboard"))
            }
        })),
    );
    let client = TestClient::new(app);

    let first = client.get("/dashboard").await;
    let second = client.get("/dashboard").await;

    assert_eq!(first.status(), second.status());
    assert_eq!(first.text(), second.text());
    assert_eq!(installs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn form_body_reaches_the_handler() {
    let app = App::new().route(
        "/comments",
        post(Endpoint::new("comments.create", |ctx, _args| async move {
            let text = ctx.body_param("text").unwrap_or_default().to_string();
            Ok(ResponseContext::text(StatusCode::CREATED, text))
        })),
    );
    let client = TestClient::new(app);

    let resp = client.post_form("/comments", "text=first%20post").await;
    resp.assert_status(201);
    assert_eq!(resp.text(), "first post");
}
