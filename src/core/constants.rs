//! Fixed request parameters and API defaults
//!
//! The program takes no arguments: the model, the prompt and the output
//! location are all defined here.

/// Request constants
pub mod request {
    /// Model invoked on every run
    pub const MODEL: &str = "black-forest-labs/flux-schnell";

    /// Prompt sent as the `prompt` input
    pub const PROMPT: &str = "an iguana on the beach, pointillism";

    /// Input key carrying the prompt
    pub const PROMPT_KEY: &str = "prompt";
}

/// Output constants
pub mod output {
    /// Relative path the first image is written to
    pub const PATH: &str = "output.png";

    /// Line printed after a successful write
    pub const SAVED_MESSAGE: &str = "Image saved as output.png";
}

/// Replicate API constants
pub mod replicate {
    /// Default API origin
    pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

    /// Environment variable holding the API token
    pub const API_TOKEN_VAR: &str = "REPLICATE_API_TOKEN";

    /// Environment variable overriding the API origin
    pub const BASE_URL_VAR: &str = "REPLICATE_BASE_URL";

    /// Environment variable overriding the poll interval (seconds)
    pub const POLL_INTERVAL_VAR: &str = "REPLICATE_POLL_INTERVAL";

    /// Asks the API to hold the create request until the prediction finishes
    pub const PREFER_WAIT: &str = "wait";
}

