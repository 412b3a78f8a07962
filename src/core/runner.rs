//! End-to-end run: generate one image and save it
//!
//! The runner sends the fixed request through a [`Provider`], reads the first
//! returned output and writes it to the output path, replacing any previous
//! file. The file is only opened once the bytes are in memory, so a failed
//! remote call never leaves a file behind.

use crate::core::constants::{output, request};
use crate::core::provider::{Provider, ProviderError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Error types for a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("The model returned no outputs")]
    EmptyOutput,

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to console: {0}")]
    Console(#[source] std::io::Error),
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub path: PathBuf,
    pub bytes_written: usize,
}

/// Runs the fixed generation request
pub struct Runner {
    provider: Arc<dyn Provider>,
    output_path: PathBuf,
}

impl Runner {
    /// Create a runner writing to `output_path`
    pub fn new(provider: Arc<dyn Provider>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Run and print the confirmation to stdout
    pub async fn run(&self) -> Result<RunReport, RunError> {
        self.run_with_console(&mut std::io::stdout()).await
    }

    /// Run and print the confirmation to `console`
    ///
    /// # Errors
    ///
    /// Returns error if the remote call fails, the model returns no outputs,
    /// the first output cannot be read, or the file cannot be written.
    pub async fn run_with_console<W: Write>(&self, console: &mut W) -> Result<RunReport, RunError> {
        let mut input = serde_json::Map::new();
        input.insert(request::PROMPT_KEY.to_string(), request::PROMPT.into());
        let input = serde_json::Value::Object(input);

        info!(
            "Running {} on {}",
            request::MODEL,
            self.provider.provider_name()
        );
        let outputs = self.provider.run(request::MODEL, input).await?;
        debug!("Received {} output(s)", outputs.len());

        let first = outputs.first().ok_or(RunError::EmptyOutput)?;
        let bytes = first.read().await?;

        tokio::fs::write(&self.output_path, &bytes)
            .await
            .map_err(|source| RunError::Write {
                path: self.output_path.clone(),
                source,
            })?;
        info!(
            "Wrote {} bytes to {}",
            bytes.len(),
            self.output_path.display()
        );

        writeln!(console, "{}", output::SAVED_MESSAGE).map_err(RunError::Console)?;

        Ok(RunReport {
            path: self.output_path.clone(),
            bytes_written: bytes.len(),
        })
    }
}
