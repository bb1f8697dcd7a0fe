use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const REQUIRED_INDICATORS: [&str; 3] = ["trend", "momentum", "volume"];
const OPTIONAL_TEXT_FIELDS: [&str; 3] = ["timeframe", "expiration", "entry_point"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalParseError {
    #[error("{0}")]
    Syntax(String),
    #[error("Model reply is not a JSON object")]
    NotAnObject,
    #[error("{0}")]
    Schema(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Maps the labels models actually emit onto a direction.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "ВВЕРХ" | "UP" | "BUY" | "CALL" | "LONG" => Some(Direction::Up),
            "ВНИЗ" | "DOWN" | "SELL" | "PUT" | "SHORT" => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub trend: String,
    pub momentum: String,
    pub volume: String,
}

/// A validated trading signal, built once from the model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalResult {
    pub direction: Direction,
    pub confidence: u8,
    pub indicators: Indicators,
    pub analysis: String,
    pub timeframe: Option<String>,
    pub expiration: Option<String>,
    pub entry_point: Option<String>,
    raw: Map<String, Value>,
}

impl SignalResult {
    /// The reply object exactly as the model produced it, key order included.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Serializes the reply object; Cyrillic stays unescaped.
    pub fn to_json(&self) -> String {
        Value::Object(self.raw.clone()).to_string()
    }
}

/// Removes a leading ```` ```json ```` / ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence, then trims.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    }
    if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parses untrusted model output into a [`SignalResult`].
pub fn parse_signal_reply(reply: &str) -> Result<SignalResult, SignalParseError> {
    let sanitized = strip_code_fence(reply);
    let value: Value =
        serde_json::from_str(sanitized).map_err(|e| SignalParseError::Syntax(e.to_string()))?;

    match value {
        Value::Object(obj) => validate_signal(obj),
        _ => Err(SignalParseError::NotAnObject),
    }
}

fn require_string(obj: &Map<String, Value>, key: &str) -> Result<String, SignalParseError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(_) => Err(SignalParseError::Schema(format!(
            "{} must be a non-empty string",
            key
        ))),
        None => Err(SignalParseError::Schema(format!("{} is required", key))),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, SignalParseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SignalParseError::Schema(format!("{} must be a string", key))),
    }
}

fn require_confidence(obj: &Map<String, Value>) -> Result<u8, SignalParseError> {
    let out_of_range =
        || SignalParseError::Schema("confidence must be a number between 0 and 100".to_string());

    match obj.get("confidence") {
        Some(Value::Number(n)) => {
            let value = n
                .as_i64()
                .or_else(|| n.as_f64().map(|v| v.round() as i64))
                .ok_or_else(out_of_range)?;
            u8::try_from(value)
                .ok()
                .filter(|v| *v <= 100)
                .ok_or_else(out_of_range)
        }
        Some(_) => Err(out_of_range()),
        None => Err(SignalParseError::Schema("confidence is required".to_string())),
    }
}

fn require_indicators(obj: &Map<String, Value>) -> Result<Indicators, SignalParseError> {
    let indicators = match obj.get("indicators") {
        Some(Value::Object(inner)) => inner,
        Some(_) => {
            return Err(SignalParseError::Schema(
                "indicators must be an object".to_string(),
            ));
        }
        None => return Err(SignalParseError::Schema("indicators is required".to_string())),
    };

    for key in REQUIRED_INDICATORS {
        if !matches!(indicators.get(key), Some(Value::String(_))) {
            return Err(SignalParseError::Schema(format!(
                "indicators.{} must be a string",
                key
            )));
        }
    }

    serde_json::from_value(Value::Object(indicators.clone()))
        .map_err(|e| SignalParseError::Schema(format!("indicators mismatch: {}", e)))
}

fn validate_signal(obj: Map<String, Value>) -> Result<SignalResult, SignalParseError> {
    let label = require_string(&obj, "signal")?;
    let direction = Direction::from_label(&label).ok_or_else(|| {
        SignalParseError::Schema(format!("signal must be an up/down direction, got {:?}", label))
    })?;

    let confidence = require_confidence(&obj)?;
    let indicators = require_indicators(&obj)?;
    let analysis = require_string(&obj, "analysis")?;

    let mut optional = OPTIONAL_TEXT_FIELDS
        .iter()
        .map(|key| optional_string(&obj, key))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    Ok(SignalResult {
        direction,
        confidence,
        indicators,
        analysis,
        timeframe: optional.next().flatten(),
        expiration: optional.next().flatten(),
        entry_point: optional.next().flatten(),
        raw: obj,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_reply() -> Value {
        json!({
            "signal": "ВВЕРХ",
            "confidence": 78,
            "timeframe": "1 минута",
            "expiration": "1-2 минуты",
            "indicators": {
                "trend": "Восходящий тренд, пробой сопротивления",
                "momentum": "RSI 62, MACD выше сигнальной",
                "volume": "Объёмы растут на зелёных свечах"
            },
            "analysis": "Цена закрепилась выше уровня.",
            "entry_point": "На откате к 1.0850"
        })
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_fenced_reply_equals_unfenced_object() {
        let reply = "```json\n{\"signal\":\"BUY\",\"confidence\":80,\"indicators\":{\"trend\":\"up\",\"momentum\":\"strong\",\"volume\":\"high\"},\"analysis\":\"breakout\"}\n```";
        let result = parse_signal_reply(reply).unwrap();

        assert_eq!(result.direction, Direction::Up);
        assert_eq!(result.confidence, 80);
        assert_eq!(
            Value::Object(result.raw().clone()),
            json!({
                "signal": "BUY",
                "confidence": 80,
                "indicators": {"trend": "up", "momentum": "strong", "volume": "high"},
                "analysis": "breakout"
            })
        );
    }

    #[test]
    fn test_full_schema_parsed() {
        let result = parse_signal_reply(&full_reply().to_string()).unwrap();
        assert_eq!(result.direction, Direction::Up);
        assert_eq!(result.timeframe.as_deref(), Some("1 минута"));
        assert_eq!(result.expiration.as_deref(), Some("1-2 минуты"));
        assert_eq!(result.entry_point.as_deref(), Some("На откате к 1.0850"));
        assert_eq!(result.indicators.momentum, "RSI 62, MACD выше сигнальной");
    }

    #[test]
    fn test_to_json_keeps_cyrillic_and_order() {
        let result = parse_signal_reply(&full_reply().to_string()).unwrap();
        let body = result.to_json();
        assert!(body.starts_with("{\"signal\":\"ВВЕРХ\""));
        assert!(!body.contains("\\u"));
    }

    #[test]
    fn test_extra_keys_preserved() {
        let mut reply = full_reply();
        reply["risk"] = json!("medium");
        let result = parse_signal_reply(&reply.to_string()).unwrap();
        assert_eq!(result.raw().get("risk"), Some(&json!("medium")));
    }

    #[test]
    fn test_prose_reply_is_syntax_error() {
        let err = parse_signal_reply("I cannot analyze this").unwrap_err();
        assert!(matches!(err, SignalParseError::Syntax(_)));
    }

    #[test]
    fn test_non_object_reply_rejected() {
        assert_eq!(
            parse_signal_reply("[1, 2, 3]").unwrap_err(),
            SignalParseError::NotAnObject
        );
    }

    #[test]
    fn test_missing_confidence_rejected() {
        let mut reply = full_reply();
        reply.as_object_mut().unwrap().remove("confidence");
        let err = parse_signal_reply(&reply.to_string()).unwrap_err();
        assert_eq!(err, SignalParseError::Schema("confidence is required".to_string()));
    }

    #[test]
    fn test_confidence_bounds() {
        for bad in [json!(101), json!(-5), json!("80")] {
            let mut reply = full_reply();
            reply["confidence"] = bad.clone();
            assert!(
                parse_signal_reply(&reply.to_string()).is_err(),
                "confidence {} should be rejected",
                bad
            );
        }

        let mut reply = full_reply();
        reply["confidence"] = json!(72.6);
        assert_eq!(parse_signal_reply(&reply.to_string()).unwrap().confidence, 73);
    }

    #[test]
    fn test_unknown_direction_rejected() {
        let mut reply = full_reply();
        reply["signal"] = json!("SIDEWAYS");
        assert!(matches!(
            parse_signal_reply(&reply.to_string()).unwrap_err(),
            SignalParseError::Schema(_)
        ));
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::from_label("вниз"), Some(Direction::Down));
        assert_eq!(Direction::from_label(" sell "), Some(Direction::Down));
        assert_eq!(Direction::from_label("Call"), Some(Direction::Up));
        assert_eq!(Direction::from_label("hold"), None);
    }

    #[test]
    fn test_incomplete_indicators_rejected() {
        let mut reply = full_reply();
        reply["indicators"] = json!({"trend": "up", "momentum": "weak"});
        let err = parse_signal_reply(&reply.to_string()).unwrap_err();
        assert_eq!(
            err,
            SignalParseError::Schema("indicators.volume must be a string".to_string())
        );
    }

    #[test]
    fn test_optional_fields_must_be_strings() {
        let mut reply = full_reply();
        reply["timeframe"] = json!(5);
        assert!(parse_signal_reply(&reply.to_string()).is_err());

        let mut reply = full_reply();
        reply["timeframe"] = Value::Null;
        assert_eq!(parse_signal_reply(&reply.to_string()).unwrap().timeframe, None);
    }
}
