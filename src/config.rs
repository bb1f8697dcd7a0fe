use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::handler::AnalyzerConfig;
use crate::vision::{ApiKey, OpenAiClientConfig};
use crate::vision::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OpenAiSettings {
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(alias = "baseUrl")]
    pub base_url: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // 1. Project config from config/config.{toml,json,ini}
            .add_source(File::with_name("config/config").required(false))
            // 2. Local overrides from config/local.* (not checked in)
            .add_source(File::with_name("config/local").required(false))
            // 3. Environment, e.g. CHART_SIGNAL_OPENAI__MODEL
            .add_source(
                Environment::with_prefix("CHART_SIGNAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.apply_platform_env(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Fills gaps from the variables serverless platforms conventionally set.
    pub fn apply_platform_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.openai.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.openai.api_key = lookup("OPENAI_API_KEY");
        }
        if self.server.port.is_none() {
            self.server.port = lookup("PORT").and_then(|p| p.parse().ok());
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            api_key: self.openai.api_key.clone().and_then(ApiKey::new),
        }
    }

    pub fn client_config(&self) -> OpenAiClientConfig {
        OpenAiClientConfig {
            base_url: self
                .openai
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: self
                .openai
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self.openai.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn bind_address(&self) -> String {
        format!(
            "{}:{}",
            self.server.host.as_deref().unwrap_or(DEFAULT_HOST),
            self.server.port.unwrap_or(DEFAULT_PORT)
        )
    }
}
