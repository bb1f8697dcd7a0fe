use thiserror::Error;

use crate::envelope::ResponseEnvelope;
use crate::signal::SignalParseError;
use crate::vision::VisionError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Image data is required")]
    MissingImage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,
}

/// Every way a chart analysis can fail, mapped 1:1 onto an error envelope.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Upstream call failed: {0}")]
    Upstream(#[from] VisionError),
    #[error("AI response parsing error: {0}")]
    ResponseParse(#[from] SignalParseError),
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl AnalysisError {
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::Validation(ValidationError::MethodNotAllowed) => 405,
            AnalysisError::Validation(ValidationError::MissingImage) => 400,
            AnalysisError::Configuration(_)
            | AnalysisError::Upstream(_)
            | AnalysisError::ResponseParse(_)
            | AnalysisError::Unexpected(_) => 500,
        }
    }

    /// Value of the `error` field in the response body.
    pub fn classification(&self) -> &'static str {
        match self {
            AnalysisError::Validation(ValidationError::MethodNotAllowed) => "Method not allowed",
            AnalysisError::Validation(ValidationError::MissingImage) => "Image data is required",
            AnalysisError::Configuration(ConfigurationError::MissingApiKey) => {
                "OpenAI API key not configured"
            }
            AnalysisError::ResponseParse(_) => "AI response parsing error",
            AnalysisError::Upstream(_) | AnalysisError::Unexpected(_) => "Analysis failed",
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            AnalysisError::Validation(_) | AnalysisError::Configuration(_) => None,
            AnalysisError::Upstream(e) => Some(e.to_string()),
            AnalysisError::ResponseParse(e) => Some(e.to_string()),
            AnalysisError::Unexpected(msg) => Some(msg.clone()),
        }
    }

    pub fn into_response(self) -> ResponseEnvelope {
        ResponseEnvelope::error(self.status_code(), self.classification(), self.details())
    }
}
