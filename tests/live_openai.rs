//! Live OpenAI Tests
//!
//! These tests call the real chat-completions API and are ignored by default:
//!   cargo test --test live_openai -- --ignored
//!
//! Prerequisites:
//!   OPENAI_API_KEY must be set (optionally CHART_SIGNAL_OPENAI__MODEL)

#[cfg(test)]
mod live_tests {
    use std::env;
    use std::sync::Arc;

    use chart_signal_rs::config::Settings;
    use chart_signal_rs::envelope::RequestEnvelope;
    use chart_signal_rs::handler::SignalRequestHandler;
    use chart_signal_rs::vision::{ApiKey, OpenAiClientConfig, OpenAiVisionClient, VisionError, VisionModel, VisionRequest};
    use chart_signal_rs::image::ImagePayload;

    // 1x1 transparent PNG
    const TINY_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn live_configured() -> bool {
        env::var("OPENAI_API_KEY").is_ok()
    }

    #[tokio::test]
    #[ignore] // Only run explicitly: cargo test --test live_openai -- --ignored
    async fn test_live_handler_round_trip() {
        if !live_configured() {
            eprintln!("⚠️ Skipping: OPENAI_API_KEY not set");
            return;
        }

        let settings = Settings::new().expect("settings");
        let model = Arc::new(OpenAiVisionClient::new(settings.client_config()).expect("client"));
        let handler = SignalRequestHandler::new(settings.analyzer_config(), model);

        let body = serde_json::json!({ "image": format!("data:image/png;base64,{}", TINY_PNG) });
        let resp = handler.handle(RequestEnvelope::post(body.to_string())).await;

        // A blank image may legitimately produce a refusal; anything but a
        // configuration or transport failure is acceptable here.
        println!("status={} body={}", resp.status_code, resp.body);
        assert!(resp.status_code == 200 || resp.body.contains("AI response parsing error"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_rejects_bad_key() {
        let client = OpenAiVisionClient::new(OpenAiClientConfig::default()).expect("client");
        let request = VisionRequest {
            prompt: "Describe this image.".to_string(),
            image: ImagePayload::parse(TINY_PNG).expect("payload"),
            max_tokens: 10,
            temperature: 0.0,
        };

        let result = client
            .complete(&ApiKey::new("sk-invalid").expect("key"), request)
            .await;

        match result {
            Err(VisionError::Api { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected 401, got {:?}", other),
        }
    }
}
