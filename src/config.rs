use crate::orchestrator::TriggerPolicy;
use anyhow::{anyhow, Context, Result};
use chrono::Duration;

pub const DEFAULT_MODEL_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL_NAME: &str = "openai/gpt-oss-20b";
pub const DEFAULT_TTS_API_URL: &str = "https://translate.google.com/translate_tts";
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Language model (OpenAI-compatible chat completions)
    pub model_api_url: String,
    pub model_name: String,

    // Speech synthesis
    pub tts_api_url: String,

    // Sessions
    pub trigger_policy: TriggerPolicy,
    pub session_idle_timeout: Duration,

    // Optional key protecting the JSON API
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            model_api_url: DEFAULT_MODEL_API_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            tts_api_url: DEFAULT_TTS_API_URL.to_string(),
            trigger_policy: TriggerPolicy::Word,
            session_idle_timeout: Duration::minutes(DEFAULT_SESSION_IDLE_MINUTES),
            api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let trigger_policy = match std::env::var("TRIGGER_POLICY") {
            Ok(value) => value
                .parse()
                .map_err(|e: String| anyhow!(e))
                .context("TRIGGER_POLICY is invalid")?,
            Err(_) => TriggerPolicy::Word,
        };

        let session_idle_minutes: i64 = std::env::var("SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES);
        let session_idle_timeout = Duration::try_minutes(session_idle_minutes)
            .ok_or_else(|| anyhow!("{} minutes exceeds the supported duration", session_idle_minutes))
            .context("SESSION_IDLE_MINUTES is out of range")?;

        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            model_api_url: std::env::var("MODEL_API_URL")
                .unwrap_or_else(|_| DEFAULT_MODEL_API_URL.to_string()),
            model_name: std::env::var("MODEL_NAME")
                .unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string()),

            tts_api_url: std::env::var("TTS_API_URL")
                .unwrap_or_else(|_| DEFAULT_TTS_API_URL.to_string()),

            trigger_policy,
            session_idle_timeout,

            api_key: std::env::var("API_KEY").ok().filter(|key| !key.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "PORT",
        "MODEL_API_URL",
        "MODEL_NAME",
        "TTS_API_URL",
        "TRIGGER_POLICY",
        "SESSION_IDLE_MINUTES",
        "API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = Config::from_env().expect("Should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.model_api_url, DEFAULT_MODEL_API_URL);
        assert_eq!(config.model_name, "openai/gpt-oss-20b");
        assert_eq!(config.tts_api_url, DEFAULT_TTS_API_URL);
        assert_eq!(config.trigger_policy, TriggerPolicy::Word);
        assert_eq!(config.session_idle_timeout, Duration::minutes(60));
        assert!(config.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("PORT", "3000");
        std::env::set_var("MODEL_NAME", "llama-3.1-8b-instant");
        std::env::set_var("TRIGGER_POLICY", "submission");
        std::env::set_var("SESSION_IDLE_MINUTES", "15");
        std::env::set_var("API_KEY", "secret");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.port, 3000);
        assert_eq!(config.model_name, "llama-3.1-8b-instant");
        assert_eq!(config.trigger_policy, TriggerPolicy::Submission);
        assert_eq!(config.session_idle_timeout, Duration::minutes(15));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_trigger_policy() {
        clear_env();
        std::env::set_var("TRIGGER_POLICY", "debounce");

        let result = Config::from_env();
        clear_env();

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("TRIGGER_POLICY"));
        assert!(message.contains("debounce"));
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_bad_numbers_and_empty_key() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("SESSION_IDLE_MINUTES", "0");
        std::env::set_var("API_KEY", "");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.session_idle_timeout, Duration::minutes(60));
        assert!(config.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_idle_minutes_out_of_range() {
        clear_env();
        std::env::set_var("SESSION_IDLE_MINUTES", "9999999999999999");

        let result = Config::from_env();
        clear_env();

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("SESSION_IDLE_MINUTES is out of range"));
    }
}
