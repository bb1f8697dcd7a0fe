use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::image::ImagePayload;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to decode completion: {0}")]
    Decode(String),
    #[error("Model returned an empty completion")]
    EmptyCompletion,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Credential for the upstream model service. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank keys.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

/// One prompt plus one image, answered with free-form text.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: ImagePayload,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send the request and return the raw text of the first completion.
    async fn complete(&self, api_key: &ApiKey, request: VisionRequest) -> Result<String, VisionError>;

    /// Model identifier used for logging (e.g. "gpt-4o")
    fn name(&self) -> &str;
}
