//! Provider abstraction for hosted inference APIs
//!
//! A provider runs a model with some input and hands back an ordered list of
//! result handles. Each handle reads the raw bytes of one generated output.

use async_trait::async_trait;
use thiserror::Error;

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid model reference: {0}")]
    InvalidModel(String),

    #[error("Prediction {id} did not succeed: {message}")]
    PredictionFailed { id: String, message: String },

    #[error("Malformed prediction output: {0}")]
    MalformedOutput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Map an HTTP status and error text to a provider error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            429 => ProviderError::RateLimit(message),
            400 | 404 | 422 => ProviderError::BadRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ProviderError::from_status(status.as_u16(), e.to_string()),
            None => ProviderError::Network(e.to_string()),
        }
    }
}

/// One generated output
#[async_trait]
pub trait ResultHandle: Send + Sync {
    /// Read the full content of the output
    async fn read(&self) -> Result<Vec<u8>, ProviderError>;
}

/// Trait for hosted inference providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run `model` with `input` and wait for its outputs
    async fn run(
        &self,
        model: &str,
        input: serde_json::Value,
    ) -> Result<Vec<Box<dyn ResultHandle>>, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
