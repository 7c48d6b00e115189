use std::{env, path::PathBuf, time::Duration};

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_GATEWAY_KEY: &str = "dev_gateway_key_change_in_production";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("development") => Environment::Development,
            _ => Environment::Production,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub gateway_api_key: SecretString,
    pub model_api_key: SecretString,
    pub model_api_base: String,
    pub remote_model: String,
    pub remote_timeout_secs: u64,
    pub local_model_path: Option<PathBuf>,
    pub local_model_runner: String,
    pub local_model_max_tokens: u32,
    pub local_model_timeout_secs: u64,
    pub local_model_startup_secs: u64,
    pub local_model_preload: bool,
    pub local_fallback_enabled: bool,
    pub strict_quiz_validation: bool,
    pub max_upload_bytes: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let model_api_key = env::var("MODEL_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .unwrap_or_default();

        Self {
            environment: Environment::from_node_env(env::var("NODE_ENV").ok().as_deref()),
            web_server_host: env::var("SERVICE_AI_URL").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_server_port: env_parse("SERVICE_AI_PORT", 3002),
            gateway_api_key: SecretString::from(
                env::var("GATEWAY_API_KEY").unwrap_or_else(|_| DEFAULT_GATEWAY_KEY.to_string()),
            ),
            model_api_key: SecretString::from(model_api_key),
            model_api_base: env::var("MODEL_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            remote_model: env::var("REMOTE_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            remote_timeout_secs: env_parse("REMOTE_TIMEOUT_SECS", 120),
            local_model_path: env::var("LOCAL_MODEL_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            local_model_runner: env::var("LOCAL_MODEL_RUNNER")
                .unwrap_or_else(|_| "llama-server".to_string()),
            local_model_max_tokens: env_parse("LOCAL_MODEL_MAX_TOKENS", 1024),
            local_model_timeout_secs: env_parse("LOCAL_MODEL_TIMEOUT_SECS", 10),
            local_model_startup_secs: env_parse("LOCAL_MODEL_STARTUP_SECS", 120),
            local_model_preload: env_flag("LOCAL_MODEL_PRELOAD"),
            local_fallback_enabled: env_flag("LOCAL_FALLBACK_ENABLED"),
            strict_quiz_validation: env_flag("STRICT_QUIZ_VALIDATION"),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn local_model_timeout(&self) -> Duration {
        Duration::from_secs(self.local_model_timeout_secs)
    }

    pub fn local_model_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.local_model_startup_secs)
    }

    /// Rejects configuration that must never reach production: the default
    /// gateway secret or a missing provider key.
    pub fn validate_for_production(&self) -> AppResult<()> {
        use secrecy::ExposeSecret;

        if self.is_development() {
            return Ok(());
        }

        let gateway_key = self.gateway_api_key.expose_secret();
        if gateway_key == DEFAULT_GATEWAY_KEY || gateway_key.is_empty() {
            return Err(AppError::InternalError(
                "GATEWAY_API_KEY is using the default value. Set GATEWAY_API_KEY to the gateway's shared secret."
                    .to_string(),
            ));
        }

        if self.model_api_key.expose_secret().is_empty() {
            return Err(AppError::InternalError(
                "MODEL_API_KEY (or GEMINI_API_KEY) is not set.".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            environment: Environment::Development,
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 3002,
            gateway_api_key: SecretString::from("test-gateway-key".to_string()),
            model_api_key: SecretString::from("test-model-key".to_string()),
            model_api_base: "http://127.0.0.1:9".to_string(),
            remote_model: "test-remote-model".to_string(),
            remote_timeout_secs: 5,
            local_model_path: None,
            local_model_runner: "llama-server".to_string(),
            local_model_max_tokens: 256,
            local_model_timeout_secs: 1,
            local_model_startup_secs: 5,
            local_model_preload: false,
            local_fallback_enabled: false,
            strict_quiz_validation: false,
            max_upload_bytes: 1024 * 1024,
        }
    }
}
