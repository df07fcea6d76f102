//! Route table lookup
//!
//! The dispatcher consumes a single operation, [`RouteTable::lookup`], and
//! only branches on the four [`RouteMatch`] statuses. Pattern compilation
//! lives behind the trait; [`RadixRouteTable`] is the default
//! implementation, a radix tree (matchit) mapping `{param}` patterns to
//! per-method handler identities.

use http::Method;
use std::collections::{BTreeMap, HashMap};

/// Result of looking up a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// A handler matched. `path_args` holds the captured path parameters
    /// in pattern order.
    Found {
        handler_id: String,
        path_args: Vec<(String, String)>,
    },
    /// No pattern matched the path.
    NotFound,
    /// The path matched but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    /// The table failed in an unspecified way.
    Error { detail: String },
}

/// Maps `(method, path)` to a handler identity.
pub trait RouteTable: Send + Sync {
    /// Look up a request. Never panics; table failures surface as
    /// [`RouteMatch::Error`].
    fn lookup(&self, method: &Method, path: &str) -> RouteMatch;
}

/// Radix-tree route table over `{param}` path patterns.
///
/// ```rust,ignore
/// let table = RadixRouteTable::new()
///     .route("/users", Method::GET, "users.index")
///     .route("/users/{id}", Method::GET, "users.show")
///     .route("/users/{id}", Method::DELETE, "users.destroy");
/// ```
pub struct RadixRouteTable {
    inner: matchit::Router<HashMap<Method, String>>,
    // Pattern → methods, kept for rebuilds and introspection.
    entries: BTreeMap<String, HashMap<Method, String>>,
}

impl Default for RadixRouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RadixRouteTable {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            inner: matchit::Router::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Register a handler identity for a method and `{param}` pattern.
    ///
    /// Panics on conflicting patterns (e.g. `/users/{id}` vs
    /// `/users/{user_id}`): registration happens at startup and a broken
    /// table must not boot.
    pub fn route(
        mut self,
        pattern: &str,
        method: Method,
        handler_id: impl Into<String>,
    ) -> Self {
        let matchit_pattern = convert_path_params(pattern);
        self.entries
            .entry(matchit_pattern)
            .or_default()
            .insert(method, handler_id.into());
        self.inner = Self::rebuild(&self.entries, pattern);
        self
    }

    fn rebuild(
        entries: &BTreeMap<String, HashMap<Method, String>>,
        being_added: &str,
    ) -> matchit::Router<HashMap<Method, String>> {
        let mut router = matchit::Router::new();
        for (pattern, methods) in entries {
            if let Err(err) = router.insert(pattern.clone(), methods.clone()) {
                panic!(
                    "conflicting route pattern `{}` (while adding `{}`): {}",
                    pattern, being_added, err
                );
            }
        }
        router
    }

    /// Registered patterns and their methods, for diagnostics.
    pub fn patterns(&self) -> impl Iterator<Item = (&str, Vec<&Method>)> + '_ {
        self.entries
            .iter()
            .map(|(pattern, methods)| (pattern.as_str(), methods.keys().collect()))
    }
}

impl RouteTable for RadixRouteTable {
    fn lookup(&self, method: &Method, path: &str) -> RouteMatch {
        match self.inner.at(path) {
            Ok(matched) => {
                let methods = matched.value;
                match methods.get(method) {
                    Some(handler_id) => {
                        let path_args = matched
                            .params
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect();
                        RouteMatch::Found {
                            handler_id: handler_id.clone(),
                            path_args,
                        }
                    }
                    None => {
                        let mut allowed: Vec<Method> = methods.keys().cloned().collect();
                        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                        RouteMatch::MethodNotAllowed { allowed }
                    }
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }
}

/// Convert `{param}` style to `:param` for matchit.
fn convert_path_params(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '{' => result.push(':'),
            '}' => {}
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RadixRouteTable {
        RadixRouteTable::new()
            .route("/users", Method::GET, "users.index")
            .route("/users", Method::POST, "users.create")
            .route("/users/{id}", Method::GET, "users.show")
            .route("/users/{user_id}/posts/{post_id}", Method::GET, "posts.show")
    }

    #[test]
    fn test_convert_path_params() {
        assert_eq!(convert_path_params("/users/{id}"), "/users/:id");
        assert_eq!(
            convert_path_params("/users/{user_id}/posts/{post_id}"),
            "/users/:user_id/posts/:post_id"
        );
        assert_eq!(convert_path_params("/static/path"), "/static/path");
    }

    #[test]
    fn finds_handler_with_params() {
        match table().lookup(&Method::GET, "/users/123") {
            RouteMatch::Found {
                handler_id,
                path_args,
            } => {
                assert_eq!(handler_id, "users.show");
                assert_eq!(path_args, vec![("id".to_string(), "123".to_string())]);
            }
            other => panic!("unexpected match: {:?}", other),
        }
    }

    #[test]
    fn params_keep_pattern_order() {
        match table().lookup(&Method::GET, "/users/7/posts/42") {
            RouteMatch::Found { path_args, .. } => {
                assert_eq!(
                    path_args,
                    vec![
                        ("user_id".to_string(), "7".to_string()),
                        ("post_id".to_string(), "42".to_string()),
                    ]
                );
            }
            other => panic!("unexpected match: {:?}", other),
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(table().lookup(&Method::GET, "/posts"), RouteMatch::NotFound);
    }

    #[test]
    fn wrong_method_reports_allowed_set() {
        match table().lookup(&Method::DELETE, "/users") {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected match: {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "conflicting route pattern")]
    fn conflicting_patterns_panic_at_registration() {
        let _ = RadixRouteTable::new()
            .route("/users/{id}", Method::GET, "a")
            .route("/users/{user_id}", Method::GET, "b");
    }
}
