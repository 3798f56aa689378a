use async_trait::async_trait;

use crate::error::LookupError;

/// Transport used by the body-type lookup. Implementations must be safe to
/// call from many tasks at once.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the response body, or a description of the transport
    /// failure (timeout, DNS, non-2xx status).
    async fn get(&self, url: &str) -> Result<String, String>;
}

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound(LookupError),
}

/// Resolves a car model to its body type. Per-item failures are reported as
/// `Resolution::NotFound`, never as a panic or error.
#[async_trait]
pub trait AttributeResolver: Send + Sync {
    async fn resolve(&self, model: &str) -> Resolution;
}
