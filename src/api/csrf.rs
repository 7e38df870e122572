//! One-shot CSRF bootstrap.
//!
//! The token is fetched at most once per [`CsrfBootstrap`] (clones share it).
//! Callers racing before the first fetch completes all wait on that single
//! attempt. A failed attempt leaves the cell empty so the next caller retries.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::ApiResult;

/// Shared, lazily-initialized CSRF token.
#[derive(Debug, Clone, Default)]
pub struct CsrfBootstrap {
    token: Arc<OnceCell<String>>,
}

impl CsrfBootstrap {
    /// Create an empty bootstrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the token, running `fetch` only if no token has been obtained yet.
    pub async fn ensure<F, Fut>(&self, fetch: F) -> ApiResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<String>>,
    {
        self.token.get_or_try_init(fetch).await.cloned()
    }

    /// Token obtained so far, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    /// Whether a token has been obtained.
    pub fn is_ready(&self) -> bool {
        self.token.initialized()
    }
}
