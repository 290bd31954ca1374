//! Cache key derivation.

use std::fmt;

use axum::http::Uri;

/// Key of a cached response: the route as requested, path plus raw query.
///
/// Viewer identity is never part of the key, so every visitor shares an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    path: String,
    query: String,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            path: path.into(),
            query: query.unwrap_or_default().to_string(),
        }
    }

    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(uri.path(), uri.query())
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}
