//! PriceSource trait definition and shared error types.

use spot_core::{PriceGroup, ResourceQuery};

/// Errors that can occur while fetching prices.
///
/// Any of these abandons the current evaluation cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Response decoding failed: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Something that can answer "what did these instances cost recently".
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch per (instance type, zone) price history matching `query`.
    async fn query(&self, query: &ResourceQuery) -> Result<Vec<PriceGroup>, SourceError>;

    /// Human-readable name for logs (e.g., "aliyun").
    fn name(&self) -> &str;
}
