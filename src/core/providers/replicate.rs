//! Replicate provider implementation
//!
//! Creates a prediction in synchronous mode (`Prefer: wait`), polls it until
//! it reaches a terminal state when the API returns early, and exposes each
//! output file as a [`ResultHandle`].

use crate::core::constants::replicate::PREFER_WAIT;
use crate::core::provider::{Provider, ProviderError, ResultHandle};
use crate::models::replicate::{
    ApiErrorBody, CreatePredictionRequest, ModelRef, Prediction, PredictionStatus,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Replicate provider
pub struct ReplicateProvider {
    client: Client,
    api_token: String,
    base_url: String,
    poll_interval: Duration,
}

impl ReplicateProvider {
    /// Create a new Replicate provider
    ///
    /// # Arguments
    ///
    /// * `api_token` - Replicate API token
    /// * `base_url` - API origin, without the `/v1` prefix
    /// * `timeout` - Request timeout in seconds
    /// * `poll_interval` - Delay between prediction status checks
    pub fn new(
        api_token: String,
        base_url: String,
        timeout: u64,
        poll_interval: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| ProviderError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    fn create_url(&self, model: &ModelRef) -> String {
        match model.version {
            Some(_) => format!("{}/v1/predictions", self.base_url),
            None => format!(
                "{}/v1/models/{}/{}/predictions",
                self.base_url, model.owner, model.name
            ),
        }
    }

    /// Turn a non-2xx response into a provider error
    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(ApiErrorBody {
                detail: Some(detail),
                ..
            }) => detail,
            Ok(ApiErrorBody {
                title: Some(title), ..
            }) => title,
            _ => body,
        };

        ProviderError::from_status(status, message)
    }

    async fn parse_prediction(response: reqwest::Response) -> Result<Prediction, ProviderError> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| ProviderError::Unexpected(format!("Failed to parse prediction: {}", e)))
    }

    async fn create_prediction(
        &self,
        model: &ModelRef,
        input: serde_json::Value,
    ) -> Result<Prediction, ProviderError> {
        let url = self.create_url(model);
        let body = CreatePredictionRequest {
            version: model.version.clone(),
            input,
        };

        debug!("Creating prediction for {} at {}", model, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Prefer", PREFER_WAIT)
            .json(&body)
            .send()
            .await?;

        Self::parse_prediction(response).await
    }

    /// Poll until the prediction reaches a terminal state
    async fn wait(&self, mut prediction: Prediction) -> Result<Prediction, ProviderError> {
        while !prediction.status.is_terminal() {
            let url = prediction.urls.get.clone().ok_or_else(|| {
                ProviderError::Unexpected(format!(
                    "Prediction {} has no status URL",
                    prediction.id
                ))
            })?;

            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await?;

            prediction = Self::parse_prediction(response).await?;
            debug!("Prediction {} is {:?}", prediction.id, prediction.status);
        }

        Ok(prediction)
    }
}

#[async_trait]
impl Provider for ReplicateProvider {
    async fn run(
        &self,
        model: &str,
        input: serde_json::Value,
    ) -> Result<Vec<Box<dyn ResultHandle>>, ProviderError> {
        let model_ref =
            ModelRef::parse(model).ok_or_else(|| ProviderError::InvalidModel(model.to_string()))?;

        let prediction = self.create_prediction(&model_ref, input).await?;
        info!("Created prediction {} ({:?})", prediction.id, prediction.status);

        let prediction = self.wait(prediction).await?;

        match prediction.status {
            PredictionStatus::Succeeded => {
                let outputs = file_outputs(&self.client, prediction.output)?;
                info!(
                    "Prediction {} succeeded with {} output(s)",
                    prediction.id,
                    outputs.len()
                );
                Ok(outputs
                    .into_iter()
                    .map(|output| Box::new(output) as Box<dyn ResultHandle>)
                    .collect())
            }
            _ => Err(ProviderError::PredictionFailed {
                message: prediction.error_message(),
                id: prediction.id,
            }),
        }
    }

    fn provider_name(&self) -> &str {
        "replicate"
    }
}

/// A file produced by a prediction, addressed by URL or `data:` URI
#[derive(Debug, Clone)]
pub struct FileOutput {
    client: Client,
    location: String,
}

impl FileOutput {
    pub fn location(&self) -> &str {
        &self.location
    }
}

#[async_trait]
impl ResultHandle for FileOutput {
    async fn read(&self) -> Result<Vec<u8>, ProviderError> {
        if let Some(uri) = self.location.strip_prefix("data:") {
            return decode_data_uri(uri);
        }

        debug!("Downloading {}", self.location());
        let bytes = self
            .client
            .get(self.location())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }
}

/// Convert prediction output into file handles
///
/// A list of strings yields one handle per entry, a single string yields one
/// handle, and `null` yields none.
fn file_outputs(client: &Client, output: serde_json::Value) -> Result<Vec<FileOutput>, ProviderError> {
    let entries = match output {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items,
        single @ serde_json::Value::String(_) => vec![single],
        other => {
            return Err(ProviderError::MalformedOutput(format!(
                "expected a file or a list of files, got {}",
                other
            )));
        }
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            serde_json::Value::String(location) => Ok(FileOutput {
                client: client.clone(),
                location,
            }),
            other => Err(ProviderError::MalformedOutput(format!(
                "expected a file URL, got {}",
                other
            ))),
        })
        .collect()
}

/// Decode the part of a `data:` URI after the scheme
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ProviderError> {
    let (meta, payload) = uri
        .split_once(',')
        .ok_or_else(|| ProviderError::MalformedOutput("data URI without payload".to_string()))?;

    if meta.ends_with(";base64") {
        STANDARD
            .decode(payload)
            .map_err(|e| ProviderError::MalformedOutput(format!("invalid base64 payload: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> ReplicateProvider {
        ReplicateProvider::new(
            "r8_test".to_string(),
            server.base_url(),
            5,
            Duration::from_millis(10),
        )
        .unwrap()
    }

    #[test]
    fn test_file_outputs_from_list() {
        let outputs = file_outputs(
            &Client::new(),
            json!(["https://example.com/a.png", "https://example.com/b.png"]),
        )
        .unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].location(), "https://example.com/a.png");
    }

    #[test]
    fn test_file_outputs_from_single_string_and_null() {
        let single = file_outputs(&Client::new(), json!("https://example.com/a.png")).unwrap();
        assert_eq!(single.len(), 1);

        let none = file_outputs(&Client::new(), serde_json::Value::Null).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_file_outputs_rejects_non_files() {
        assert!(matches!(
            file_outputs(&Client::new(), json!({"image": "x"})),
            Err(ProviderError::MalformedOutput(_))
        ));
        assert!(matches!(
            file_outputs(&Client::new(), json!([42])),
            Err(ProviderError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(
            decode_data_uri("image/png;base64,iVBORw0K").unwrap(),
            STANDARD.decode("iVBORw0K").unwrap()
        );
        assert_eq!(decode_data_uri("text/plain,hello").unwrap(), b"hello");
        assert!(decode_data_uri("image/png;base64").is_err());
    }

    #[tokio::test]
    async fn test_run_official_model_in_sync_mode() {
        let server = MockServer::start_async().await;
        let image = server
            .mock_async(|when, then| {
                when.method(GET).path("/files/out-0.webp");
                then.status(200).body("IMAGE-BYTES");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-schnell/predictions")
                    .header("Authorization", "Bearer r8_test")
                    .header("Prefer", "wait")
                    .json_body(json!({"input": {"prompt": "an iguana"}}));
                then.status(201).json_body(json!({
                    "id": "p1",
                    "status": "succeeded",
                    "output": [server.url("/files/out-0.webp")],
                    "urls": {"get": server.url("/v1/predictions/p1")}
                }));
            })
            .await;

        let handles = provider(&server)
            .run("black-forest-labs/flux-schnell", json!({"prompt": "an iguana"}))
            .await
            .unwrap();

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].read().await.unwrap(), b"IMAGE-BYTES");
        create.assert_async().await;
        image.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_versioned_model_polls_until_done() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/predictions")
                    .json_body(json!({"version": "abc123", "input": {"prompt": "x"}}));
                then.status(201).json_body(json!({
                    "id": "p2",
                    "status": "starting",
                    "output": null,
                    "urls": {"get": server.url("/v1/predictions/p2")}
                }));
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/predictions/p2")
                    .header("Authorization", "Bearer r8_test");
                then.status(200).json_body(json!({
                    "id": "p2",
                    "status": "succeeded",
                    "output": "data:text/plain;base64,aGVsbG8=",
                    "urls": {"get": server.url("/v1/predictions/p2")}
                }));
            })
            .await;

        let handles = provider(&server)
            .run("acme/painter:abc123", json!({"prompt": "x"}))
            .await
            .unwrap();

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].read().await.unwrap(), b"hello");
        create.assert_async().await;
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_failed_prediction() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/models/acme/painter/predictions");
                then.status(201).json_body(json!({
                    "id": "p3",
                    "status": "failed",
                    "error": "CUDA out of memory",
                    "urls": {"get": server.url("/v1/predictions/p3")}
                }));
            })
            .await;

        let result = provider(&server).run("acme/painter", json!({})).await;

        match result {
            Err(ProviderError::PredictionFailed { id, message }) => {
                assert_eq!(id, "p3");
                assert_eq!(message, "CUDA out of memory");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_run_unauthenticated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/models/acme/painter/predictions");
                then.status(401).json_body(json!({
                    "title": "Unauthenticated",
                    "detail": "You did not pass a valid authentication token",
                    "status": 401
                }));
            })
            .await;

        let result = provider(&server).run("acme/painter", json!({})).await;

        match result {
            Err(ProviderError::Authentication(message)) => {
                assert_eq!(message, "You did not pass a valid authentication token");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_model() {
        let server = MockServer::start_async().await;
        let result = provider(&server).run("not-a-model", json!({})).await;
        assert!(matches!(result, Err(ProviderError::InvalidModel(_))));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/gone.png");
                then.status(404);
            })
            .await;

        let output = FileOutput {
            client: Client::new(),
            location: server.url("/files/gone.png"),
        };

        assert!(matches!(
            output.read().await,
            Err(ProviderError::BadRequest(_))
        ));
    }
}
