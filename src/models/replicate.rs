//! Replicate API data models
//!
//! Request and response structures for the predictions endpoints, plus the
//! `owner/name[:version]` model reference format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a hosted model, optionally pinned to a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
}

impl ModelRef {
    /// Parse `owner/name` or `owner/name:version`
    ///
    /// Returns `None` when a segment is empty or the reference has more than
    /// one `/`.
    pub fn parse(reference: &str) -> Option<Self> {
        let (path, version) = match reference.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (reference, None),
        };

        let (owner, name) = path.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }

        let version = match version {
            Some("") => return None,
            Some(v) => Some(v.to_string()),
            None => None,
        };

        Some(ModelRef {
            owner: owner.to_string(),
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        Ok(())
    }
}

/// Body of `POST /v1/predictions` and `POST /v1/models/{owner}/{name}/predictions`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePredictionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: serde_json::Value,
}

/// Prediction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    /// Whether the prediction will not change any more
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

/// Links returned with a prediction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    #[serde(default)]
    pub get: Option<String>,
}

/// A prediction as returned by the create and get endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub urls: PredictionUrls,
}

impl Prediction {
    /// Error text reported by the API, if any
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => "no error detail".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Problem-details body returned on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}
