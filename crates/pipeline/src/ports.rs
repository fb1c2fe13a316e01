//! Port traits implemented by infrastructure crates.
//!
//! The domain only states *what* it needs from the outside world. The
//! `fetcher` crate supplies an HTTP implementation; tests supply in-memory
//! ones.

use async_trait::async_trait;

use crate::FetchError;

/// Retrieves the full content behind a target string.
///
/// One call per Request. Implementations must not retry and impose no
/// timeout; a hung call blocks the caller until it returns. Both failure
/// points (no response, unreadable body) are reported through [`FetchError`]
/// rather than by panicking.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `target` and returns the complete body bytes.
    async fn fetch(&self, target: &str) -> Result<Vec<u8>, FetchError>;
}
