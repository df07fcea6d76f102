//! Argument binding
//!
//! Handler parameters that need more than the raw path string declare a
//! [`BindingDirective`] at registration time: convert through an enum
//! lookup, or resolve a domain object through a named getter on the
//! data-access collaborator. Directives are plain data attached to the
//! endpoint once and reused for every request; there is no runtime
//! introspection.

use crate::signal::ControlFlowSignal;
use async_trait::async_trait;
use http::StatusCode;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// A value bound to a handler parameter.
#[derive(Clone)]
pub enum ArgValue {
    /// The raw captured string, untouched.
    Raw(String),
    /// A typed value: an enum variant or a resolved domain object.
    Object(Arc<dyn Any + Send + Sync>),
    /// An absent value for a nullable parameter.
    Null,
}

impl ArgValue {
    /// Wrap a typed value.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// The raw string, when the value is untyped.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// Downcast a typed value.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Object(obj) => Arc::clone(obj).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Whether this is the null placeholder.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(raw) => f.debug_tuple("Raw").field(raw).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Null => f.write_str("Null"),
        }
    }
}

/// The ordered, merged argument list passed to a handler: the positional
/// remainder of the path captures first, named bindings applied last.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    /// An empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The arguments in call order.
    pub fn values(&self) -> &[(String, ArgValue)] {
        &self.values
    }

    /// Look up an argument by parameter name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// A raw string argument by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    /// A typed argument by name.
    pub fn downcast<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(ArgValue::downcast)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a raw positional value.
    pub(crate) fn push_raw(&mut self, name: impl Into<String>, raw: impl Into<String>) {
        self.values.push((name.into(), ArgValue::Raw(raw.into())));
    }

    /// Insert a named value; replaces an existing value for the same name
    /// (named bindings win over the positional remainder).
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        let name = name.into();
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
    }
}

/// How a directive produces its typed value.
#[derive(Clone)]
pub enum BindingTarget {
    /// Convert the raw string through an enum lookup table.
    Enum(fn(&str) -> Option<ArgValue>),
    /// Resolve through the named getter on the domain collaborator.
    Getter(String),
}

impl std::fmt::Debug for BindingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enum(_) => f.write_str("Enum(..)"),
            Self::Getter(name) => f.debug_tuple("Getter").field(name).finish(),
        }
    }
}

impl BindingTarget {
    /// An enum target for any [`PathEnum`] type.
    pub fn enum_of<T: PathEnum>() -> Self {
        Self::Enum(lookup_enum::<T>)
    }

    /// A getter target.
    pub fn getter(name: impl Into<String>) -> Self {
        Self::Getter(name.into())
    }
}

fn lookup_enum<T: PathEnum>(raw: &str) -> Option<ArgValue> {
    T::from_raw(raw).map(ArgValue::object)
}

/// Enum types usable as binding targets.
pub trait PathEnum: Sized + Send + Sync + 'static {
    /// Parse a raw path segment into a variant.
    fn from_raw(raw: &str) -> Option<Self>;
}

/// Declarative binding metadata for one handler parameter.
///
/// Built once at endpoint registration and cached for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct BindingDirective {
    /// The handler parameter the resolved value binds to.
    pub param: String,
    /// The expected path-argument key. A key carrying or lacking an `_id`
    /// suffix still matches, see [`effective_key`].
    pub source_field: String,
    /// How the raw value becomes typed.
    pub target: BindingTarget,
    /// Message for the failure response.
    pub not_found_message: String,
    /// Status for the failure response. A 3xx sends the client back to
    /// the referer with the message queued.
    pub not_found_status: StatusCode,
    /// Whether the parameter accepts an absent domain object.
    pub nullable: bool,
}

impl BindingDirective {
    /// A directive with the defaults: `source_field` equal to the
    /// parameter name, 301 status, "Not Found" message, not nullable.
    pub fn new(param: impl Into<String>, target: BindingTarget) -> Self {
        let param = param.into();
        Self {
            source_field: param.clone(),
            param,
            target,
            not_found_message: "Not Found".to_string(),
            not_found_status: StatusCode::MOVED_PERMANENTLY,
            nullable: false,
        }
    }

    /// Override the expected path-argument key.
    pub fn source_field(mut self, field: impl Into<String>) -> Self {
        self.source_field = field.into();
        self
    }

    /// Override the failure message.
    pub fn not_found_message(mut self, message: impl Into<String>) -> Self {
        self.not_found_message = message.into();
        self
    }

    /// Override the failure status.
    pub fn not_found_status(mut self, status: StatusCode) -> Self {
        self.not_found_status = status;
        self
    }

    /// Allow the getter to resolve to nothing.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn failure(&self) -> ControlFlowSignal {
        ControlFlowSignal::not_found_with_status(
            self.not_found_message.clone(),
            self.not_found_status,
        )
    }
}

/// Errors from the data-access collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(String),
    /// The getter name is not known to the collaborator.
    #[error("unknown getter `{0}`")]
    UnknownGetter(String),
}

/// The data-access collaborator resolving foreign-key-style identifiers
/// into domain objects. `Ok(None)` means "no such object".
#[async_trait]
pub trait DomainSource: Send + Sync {
    async fn resolve(&self, getter: &str, raw: &str) -> Result<Option<ArgValue>, SourceError>;
}

/// Find the path-argument key a directive consumes.
///
/// Search order: the exact `source_field`; the field with `_id` appended
/// when it lacks the suffix (URL segment `status_id` binding field
/// `status`); the field with `_id` stripped when it carries the suffix
/// and the stripped form names the parameter (segment `user` binding
/// field `user_id`, param `user`).
fn effective_key<'a>(
    directive: &BindingDirective,
    path_args: &'a [(String, String)],
) -> Option<&'a str> {
    let has = |key: &str| path_args.iter().any(|(k, _)| k == key);

    if has(&directive.source_field) {
        return path_args
            .iter()
            .find(|(k, _)| *k == directive.source_field)
            .map(|(k, _)| k.as_str());
    }

    match directive.source_field.strip_suffix("_id") {
        None => {
            let suffixed = format!("{}_id", directive.source_field);
            path_args
                .iter()
                .find(|(k, _)| *k == suffixed)
                .map(|(k, _)| k.as_str())
        }
        Some(stripped) if stripped == directive.param => path_args
            .iter()
            .find(|(k, _)| *k == stripped)
            .map(|(k, _)| k.as_str()),
        Some(_) => None,
    }
}

/// Bind the captured path arguments against the endpoint's directives.
///
/// Directives run in declaration order; the first failure aborts the rest
/// (getter calls already made are not rolled back). Consumed keys leave
/// the positional remainder, and the final list applies named bindings
/// after the remainder so they win on collision.
pub async fn bind(
    directives: &[BindingDirective],
    path_args: &[(String, String)],
    domain: Option<&Arc<dyn DomainSource>>,
) -> Result<Args, ControlFlowSignal> {
    let mut remaining: Vec<(String, String)> = path_args.to_vec();
    let mut named: Vec<(String, ArgValue)> = Vec::new();

    for directive in directives {
        let Some(key) = effective_key(directive, &remaining).map(str::to_string) else {
            return Err(directive.failure());
        };
        let raw = remaining
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        let resolved = match &directive.target {
            BindingTarget::Enum(lookup) => lookup(&raw),
            BindingTarget::Getter(getter) => {
                let Some(domain) = domain else {
                    return Err(ControlFlowSignal::internal(format!(
                        "no domain source configured for getter `{}`",
                        getter
                    )));
                };
                domain
                    .resolve(getter, &raw)
                    .await
                    .map_err(|err| ControlFlowSignal::internal(err.to_string()))?
            }
        };

        match resolved {
            Some(value) => {
                remaining.retain(|(k, _)| *k != key);
                named.push((directive.param.clone(), value));
            }
            None if directive.nullable && matches!(directive.target, BindingTarget::Getter(_)) => {
                remaining.retain(|(k, _)| *k != key);
                named.push((directive.param.clone(), ArgValue::Null));
            }
            None => return Err(directive.failure()),
        }
    }

    let mut args = Args::new();
    for (name, raw) in remaining {
        args.push_raw(name, raw);
    }
    for (name, value) in named {
        args.insert(name, value);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl PathEnum for Color {
        fn from_raw(raw: &str) -> Option<Self> {
            match raw {
                "red" => Some(Self::Red),
                "blue" => Some(Self::Blue),
                _ => None,
            }
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        known: &'static str,
    }

    #[async_trait]
    impl DomainSource for CountingSource {
        async fn resolve(&self, _getter: &str, raw: &str) -> Result<Option<ArgValue>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if raw == self.known {
                Ok(Some(ArgValue::object(raw.to_string())))
            } else {
                Ok(None)
            }
        }
    }

    fn args(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn binds_enum_variant() {
        let directives = [BindingDirective::new("color", BindingTarget::enum_of::<Color>())];
        let bound = bind(&directives, &args(&[("color", "red")]), None)
            .await
            .unwrap();
        assert_eq!(*bound.downcast::<Color>("color").unwrap(), Color::Red);
        assert_eq!(bound.len(), 1);
    }

    #[tokio::test]
    async fn enum_failure_uses_directive_status_and_message() {
        let directives = [BindingDirective::new("color", BindingTarget::enum_of::<Color>())
            .not_found_message("No such color")
            .not_found_status(StatusCode::NOT_FOUND)];
        let err = bind(&directives, &args(&[("color", "green")]), None)
            .await
            .unwrap_err();
        match err {
            ControlFlowSignal::NotFound { text, status } => {
                assert_eq!(text, "No such color");
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn suffixed_path_key_binds_unsuffixed_field() {
        // URL segment `status_id` binding directive field `status`
        // (scenario from the original route layer).
        let directives = [BindingDirective::new("status", BindingTarget::enum_of::<Color>())];
        let bound = bind(&directives, &args(&[("status_id", "blue")]), None)
            .await
            .unwrap();
        assert_eq!(*bound.downcast::<Color>("status").unwrap(), Color::Blue);
    }

    #[tokio::test]
    async fn suffixed_field_matches_stripped_key_named_like_param() {
        let source: Arc<dyn DomainSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            known: "42",
        });
        let directives = [BindingDirective::new("user", BindingTarget::getter("find_user"))
            .source_field("user_id")];
        let bound = bind(&directives, &args(&[("user", "42")]), Some(&source))
            .await
            .unwrap();
        assert!(bound.downcast::<String>("user").is_some());
    }

    #[tokio::test]
    async fn failure_short_circuits_remaining_directives() {
        let counting = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            known: "ok",
        });
        let source: Arc<dyn DomainSource> = counting.clone();
        let directives = [
            BindingDirective::new("first", BindingTarget::getter("find")),
            BindingDirective::new("second", BindingTarget::getter("find")),
        ];
        let err = bind(
            &directives,
            &args(&[("first", "missing"), ("second", "ok")]),
            Some(&source),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ControlFlowSignal::NotFound { .. }));
        // Only the failing directive ran; the second getter was never called.
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nullable_getter_binds_null() {
        let source: Arc<dyn DomainSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            known: "present",
        });
        let directives =
            [BindingDirective::new("user", BindingTarget::getter("find_user")).nullable()];
        let bound = bind(&directives, &args(&[("user", "absent")]), Some(&source))
            .await
            .unwrap();
        assert!(bound.get("user").unwrap().is_null());
    }

    #[tokio::test]
    async fn unconsumed_keys_pass_through_positionally() {
        let directives = [BindingDirective::new("color", BindingTarget::enum_of::<Color>())];
        let bound = bind(
            &directives,
            &args(&[("id", "5"), ("color", "red"), ("page", "2")]),
            None,
        )
        .await
        .unwrap();

        // Untouched captures keep their raw form and order.
        assert_eq!(bound.get_str("id"), Some("5"));
        assert_eq!(bound.get_str("page"), Some("2"));
        assert_eq!(bound.values()[0].0, "id");
        assert_eq!(bound.values()[1].0, "page");
        // The named binding was applied after the remainder.
        assert_eq!(bound.values()[2].0, "color");
    }

    #[tokio::test]
    async fn named_binding_wins_over_positional_remainder() {
        // A directive whose param collides with a leftover capture
        // overwrites it in place.
        let source: Arc<dyn DomainSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            known: "7",
        });
        let directives = [BindingDirective::new("user", BindingTarget::getter("find_user"))
            .source_field("user_id")];
        let bound = bind(
            &directives,
            &args(&[("user_id", "7"), ("user", "raw-shadow")]),
            Some(&source),
        )
        .await
        .unwrap();

        // `user_id` was consumed; `user` holds the resolved object, not
        // the leftover raw capture.
        assert!(bound.downcast::<String>("user").is_some());
        assert_eq!(bound.get_str("user"), None);
    }

    #[tokio::test]
    async fn missing_key_fails_with_directive_response() {
        let directives = [BindingDirective::new("color", BindingTarget::enum_of::<Color>())];
        let err = bind(&directives, &args(&[("id", "1")]), None).await.unwrap_err();
        assert!(matches!(
            err,
            ControlFlowSignal::NotFound {
                status: StatusCode::MOVED_PERMANENTLY,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn getter_without_domain_source_is_internal() {
        let directives = [BindingDirective::new("user", BindingTarget::getter("find_user"))];
        let err = bind(&directives, &args(&[("user", "1")]), None).await.unwrap_err();
        assert!(matches!(err, ControlFlowSignal::Internal { .. }));
    }
}
