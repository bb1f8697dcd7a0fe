use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::vision::adapter::{ApiKey, VisionError, VisionModel, VisionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chat-completions client for vision-capable OpenAI models.
pub struct OpenAiVisionClient {
    client: Client,
    endpoint: Url,
    model: String,
    timeout_secs: u64,
}

impl OpenAiVisionClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, VisionError> {
        if config.timeout_secs == 0 {
            return Err(VisionError::Config("timeout_secs must be positive".into()));
        }

        let endpoint = chat_endpoint(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_transport_error(&self, e: reqwest::Error) -> VisionError {
        if e.is_timeout() {
            VisionError::Timeout(self.timeout_secs)
        } else {
            VisionError::Network(e.to_string())
        }
    }
}

fn chat_endpoint(base_url: &str) -> Result<Url, VisionError> {
    // Url::join replaces the last path segment unless the base ends with '/'
    let base = format!("{}/", base_url.trim().trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join("chat/completions"))
        .map_err(|e| VisionError::Config(format!("invalid base_url {:?}: {}", base_url, e)))
}

pub fn build_chat_payload(model: &str, request: &VisionRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": request.prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": request.image.to_data_url() }
                    }
                ]
            }
        ],
        "max_tokens": request.max_tokens,
        "temperature": request.temperature
    })
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Pulls `choices[0].message.content` out of a chat-completions body.
pub fn extract_completion_text(body: &str) -> Result<String, VisionError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| VisionError::Decode(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(VisionError::EmptyCompletion)
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    async fn complete(&self, api_key: &ApiKey, request: VisionRequest) -> Result<String, VisionError> {
        let payload = build_chat_payload(&self.model, &request);
        debug!(model = %self.model, mime = %request.image.mime(), "Sending chart to vision model");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key.expose())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            error!("Vision model HTTP error {}", status);
            return Err(VisionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_completion_text(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImagePayload;

    fn request() -> VisionRequest {
        VisionRequest {
            prompt: "analyze".to_string(),
            image: ImagePayload::parse("data:image/jpeg;base64,/9j/4AAQ").unwrap(),
            max_tokens: 1000,
            temperature: 0.3,
        }
    }

    #[test]
    fn test_chat_endpoint_keeps_version_segment() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1").unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:8080/v1/").unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert!(chat_endpoint("not a url").is_err());
    }

    #[test]
    fn test_build_chat_payload() {
        let payload = build_chat_payload("gpt-4o", &request());

        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["max_tokens"], 1000);
        assert_eq!(payload["temperature"], 0.3);

        let content = &payload["messages"][0]["content"];
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "analyze");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_extract_completion_text() {
        let body = r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"signal\":\"ВВЕРХ\"}"}}]}"#;
        assert_eq!(extract_completion_text(body).unwrap(), "{\"signal\":\"ВВЕРХ\"}");
    }

    #[test]
    fn test_extract_completion_text_failures() {
        assert!(matches!(
            extract_completion_text(r#"{"choices":[]}"#),
            Err(VisionError::EmptyCompletion)
        ));
        assert!(matches!(
            extract_completion_text(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(VisionError::EmptyCompletion)
        ));
        assert!(matches!(
            extract_completion_text("<html>bad gateway</html>"),
            Err(VisionError::Decode(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = OpenAiClientConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(OpenAiVisionClient::new(config), Err(VisionError::Config(_))));
    }

    #[test]
    fn test_client_uses_configured_model() {
        let client = OpenAiVisionClient::new(OpenAiClientConfig::default()).unwrap();
        assert_eq!(client.name(), "gpt-4o");
        assert_eq!(
            client.endpoint().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
