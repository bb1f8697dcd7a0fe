use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

pub const METHOD_POST: &str = "POST";
pub const METHOD_OPTIONS: &str = "OPTIONS";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Inbound invocation as delivered by the hosting platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "httpMethod", alias = "method", default = "default_method")]
    pub http_method: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(rename = "isBase64Encoded", default)]
    pub is_base64_encoded: bool,
}

fn default_method() -> String {
    METHOD_POST.to_string()
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, body: Option<String>) -> Self {
        Self {
            http_method: method.into(),
            body,
            is_base64_encoded: false,
        }
    }

    pub fn post(body: impl Into<String>) -> Self {
        Self::new(METHOD_POST, Some(body.into()))
    }

    /// Decodes the body as a JSON object.
    ///
    /// Missing, blank, undecodable or non-object bodies all collapse to an
    /// empty object; clients sending slightly malformed payloads still reach
    /// the image check and get a 400 there.
    pub fn json_body(&self) -> Map<String, Value> {
        let raw = match self.raw_body() {
            Some(raw) => raw,
            None => return Map::new(),
        };

        if raw.trim().is_empty() {
            return Map::new();
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(obj)) => obj,
            Ok(other) => {
                debug!("Request body is not a JSON object ({}), treating as empty", json_kind(&other));
                Map::new()
            }
            Err(e) => {
                debug!("Request body is not valid JSON ({}), treating as empty", e);
                Map::new()
            }
        }
    }

    fn raw_body(&self) -> Option<String> {
        let body = self.body.as_deref()?;
        if !self.is_base64_encoded {
            return Some(body.to_string());
        }

        match STANDARD.decode(body.trim()) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                debug!("Base64 request body failed to decode: {}", e);
                None
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outbound envelope handed back to the hosting platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    pub headers: BTreeMap<String, String>,

    pub body: String,

    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    /// CORS preflight answer: allow every origin, POST and OPTIONS, cached for 24h.
    pub fn preflight() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            "POST, OPTIONS".to_string(),
        );
        headers.insert(
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        );
        headers.insert("Access-Control-Max-Age".to_string(), "86400".to_string());

        Self {
            status_code: 200,
            headers,
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    pub fn json(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());

        Self {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    /// `{"error": ..., "details": ...}` with `details` omitted when absent.
    pub fn error(status_code: u16, error: &str, details: Option<String>) -> Self {
        let mut obj = Map::new();
        obj.insert("error".to_string(), Value::String(error.to_string()));
        if let Some(details) = details {
            obj.insert("details".to_string(), Value::String(details));
        }
        Self::json(status_code, Value::Object(obj).to_string())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
