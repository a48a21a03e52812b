//! The application under test.
//!
//! This crate never starts or owns the application: an [`AppHost`] is only
//! the base URL pages navigate under.

/// A running web application that pages navigate into.
pub trait AppHost: Send + Sync {
    /// Entry URL, e.g. `https://www.qrcode-monkey.com`.
    fn base_url(&self) -> &str;

    /// Absolute URL of `path` on this host.
    fn url(&self, path: &str) -> String {
        join_url(self.base_url(), path)
    }
}

/// Joins with exactly one slash between `base` and `path`.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A host managed elsewhere, addressed by a fixed base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost {
    base_url: String,
}

impl StaticHost {
    /// Host rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl AppHost for StaticHost {
    fn base_url(&self) -> &str {
        &self.base_url
    }
}
