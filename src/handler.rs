use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::envelope::{METHOD_OPTIONS, METHOD_POST, RequestEnvelope, ResponseEnvelope};
use crate::error::{AnalysisError, ConfigurationError, ValidationError};
use crate::image::ImagePayload;
use crate::metrics;
use crate::prompt::{ANALYST_PROMPT, MAX_TOKENS, TEMPERATURE};
use crate::signal::{SignalResult, parse_signal_reply};
use crate::vision::{ApiKey, VisionModel, VisionRequest};

/// Everything the handler needs from configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    pub api_key: Option<ApiKey>,
}

impl AnalyzerConfig {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(key),
        }
    }
}

/// Stateless chart-screenshot to trading-signal transform.
pub struct SignalRequestHandler {
    config: AnalyzerConfig,
    model: Arc<dyn VisionModel>,
}

impl SignalRequestHandler {
    pub fn new(config: AnalyzerConfig, model: Arc<dyn VisionModel>) -> Self {
        Self { config, model }
    }

    /// Never fails: every error is turned into a JSON error envelope.
    pub async fn handle(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze_chart", %request_id, method = %request.http_method);

        async move {
            let response = match self.dispatch(&request).await {
                Ok(response) => response,
                Err(err) => {
                    match err.status_code() {
                        400..=499 => debug!("Rejected request: {}", err),
                        _ => error!("Analysis failed: {}", err),
                    }
                    err.into_response()
                }
            };

            metrics::inc_requests(response.status_code);
            info!(status = response.status_code, "Request handled");
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope, AnalysisError> {
        match request.http_method.as_str() {
            METHOD_OPTIONS => return Ok(ResponseEnvelope::preflight()),
            METHOD_POST => {}
            _ => return Err(ValidationError::MethodNotAllowed.into()),
        }

        let body = request.json_body();
        let image = extract_image(&body)?;
        let signal = self.analyze(image).await?;

        info!(
            direction = ?signal.direction,
            confidence = signal.confidence,
            "Signal produced"
        );
        Ok(ResponseEnvelope::json(200, signal.to_json()))
    }

    /// Credential check, one model call, then the untrusted-reply parse.
    pub async fn analyze(&self, image: ImagePayload) -> Result<SignalResult, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ConfigurationError::MissingApiKey)?;

        let request = VisionRequest {
            prompt: ANALYST_PROMPT.to_string(),
            image,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.model.complete(api_key, request))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::observe_upstream_latency(elapsed);
        debug!(model = self.model.name(), elapsed_sec = elapsed, "Vision model returned");

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                metrics::inc_upstream_failures();
                return Err(e.into());
            }
            Err(panic) => {
                metrics::inc_upstream_failures();
                return Err(AnalysisError::Unexpected(panic_message(panic)));
            }
        };

        parse_signal_reply(&reply).map_err(|e| {
            metrics::inc_parse_failures();
            warn!("Model reply rejected: {}", e);
            AnalysisError::from(e)
        })
    }
}

fn extract_image(body: &Map<String, Value>) -> Result<ImagePayload, ValidationError> {
    match body.get("image") {
        Some(Value::String(raw)) if !raw.is_empty() => {
            ImagePayload::parse(raw).ok_or(ValidationError::MissingImage)
        }
        _ => Err(ValidationError::MissingImage),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "model call panicked".to_string()
    }
}
