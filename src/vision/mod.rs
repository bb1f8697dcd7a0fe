pub mod adapter;
pub mod openai;

pub use adapter::{ApiKey, VisionError, VisionModel, VisionRequest};
pub use openai::{OpenAiClientConfig, OpenAiVisionClient};
