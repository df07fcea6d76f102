//! Language-prefixed URL routing
//!
//! When a set of languages is configured, every path must carry one of the
//! configured codes as its first segment. The resolver strips the prefix
//! for route lookup; a path without a recognized prefix is answered with a
//! 307 redirect into the default language, preserving method and body.
//! Language routing is opt-in: an empty configuration passes every path
//! through untouched.

use http::StatusCode;

/// Ordered set of supported languages plus the default code.
#[derive(Debug, Clone, Default)]
pub struct Languages {
    entries: Vec<(String, String)>,
    default_code: String,
}

impl Languages {
    /// Configure languages from `(code, label)` pairs. Iteration order is
    /// configuration order and decides which code wins for overlapping
    /// prefixes.
    pub fn new<I, C, L>(entries: I, default_code: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(c, l)| (c.into(), l.into()))
                .collect(),
            default_code: default_code.into(),
        }
    }

    /// The no-language configuration: every path passes through.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether language routing is active.
    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    /// The configured `(code, label)` pairs.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// The default language code.
    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Resolve a request path against the configured languages.
    pub fn resolve(&self, path: &str) -> LanguageOutcome {
        if self.entries.is_empty() {
            return LanguageOutcome::Pass {
                stripped: path.to_string(),
                language: None,
            };
        }

        // Exact segment boundaries only: `/en` or `/en/...`, never a bare
        // prefix test (`/eng` must not match code `en`).
        for (code, _) in &self.entries {
            let root = format!("/{}", code);
            if path == root {
                return LanguageOutcome::Pass {
                    stripped: "/".to_string(),
                    language: Some(code.clone()),
                };
            }
            let prefix = format!("/{}/", code);
            if let Some(rest) = path.strip_prefix(&prefix) {
                return LanguageOutcome::Pass {
                    stripped: format!("/{}", rest),
                    language: Some(code.clone()),
                };
            }
        }

        LanguageOutcome::Redirect {
            target: format!("/{}{}", self.default_code, path),
            status: StatusCode::TEMPORARY_REDIRECT,
        }
    }
}

/// Result of language resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageOutcome {
    /// Continue dispatch with the stripped path.
    Pass {
        stripped: String,
        language: Option<String>,
    },
    /// Stop and redirect into the default language. 307 preserves the
    /// request method and body.
    Redirect { target: String, status: StatusCode },
}
