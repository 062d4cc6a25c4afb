//! Pipeline configuration.
//!
//! Everything configurable is resolved here at startup and passed to the
//! components at construction; nothing reads the environment afterwards.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bind host for the webhook receiver.
    pub host: String,
    /// Bind port for the webhook receiver.
    pub port: u16,
    /// SQLite database holding the raw and processed tables.
    pub db_path: PathBuf,
    /// JSON file of mail threads the collector scans.
    pub mail_file: PathBuf,
    /// Label marking threads that still need ingestion.
    pub source_label: String,
    /// Label marking threads that have been ingested.
    pub done_label: String,
    /// Base URL of the chat page the launcher opens.
    pub chat_page_url: String,
    /// Endpoint the browser-side agent posts scraped rows back to.
    pub webhook_url: String,
    /// Shared secret both sides present on the webhook.
    pub secret_key: String,
    /// Maximum accepted webhook body size.
    pub inbound_body_max_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SECRET_KEY is not set; the webhook receiver cannot authenticate callers")]
    MissingSecretKey,
}

const DEFAULT_INBOUND_BODY_MAX_BYTES: usize = 2 * 1024 * 1024;

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("PIPELINE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PIPELINE_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(9207);
        let db_path = env_path("PIPELINE_DB_PATH", "meeting_report.db");
        let mail_file = env_path("MAIL_FILE_PATH", "mail_threads.json");
        let source_label =
            env_non_empty("SOURCE_LABEL").unwrap_or_else(|| "zoom notes".to_string());
        let done_label =
            env_non_empty("DONE_LABEL").unwrap_or_else(|| "zoom notes processed".to_string());
        let chat_page_url = env_non_empty("CHAT_PAGE_URL")
            .unwrap_or_else(|| "https://gemini.google.com/app".to_string());
        let webhook_url =
            env_non_empty("WEBHOOK_URL").unwrap_or_else(|| format!("http://localhost:{port}/"));
        let secret_key = env_non_empty("SECRET_KEY").ok_or(ConfigError::MissingSecretKey)?;
        let inbound_body_max_bytes = env::var("INBOUND_BODY_MAX_BYTES")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_INBOUND_BODY_MAX_BYTES);

        Ok(Self {
            host,
            port,
            db_path,
            mail_file,
            source_label,
            done_label,
            chat_page_url,
            webhook_url,
            secret_key,
            inbound_body_max_bytes,
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env_non_empty(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        key: String,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let previous = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                previous,
            }
        }

        fn unset(key: &str) -> Self {
            let previous = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                previous,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(&self.key, value),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn missing_secret_key_fails_fast() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::unset("SECRET_KEY");
        let err = PipelineConfig::from_env().expect_err("no secret");
        assert!(matches!(err, ConfigError::MissingSecretKey));
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::set("SECRET_KEY", "s3cret");
        let _port = EnvGuard::unset("PIPELINE_PORT");
        let _label = EnvGuard::unset("SOURCE_LABEL");
        let _done = EnvGuard::unset("DONE_LABEL");
        let _webhook = EnvGuard::unset("WEBHOOK_URL");
        let config = PipelineConfig::from_env().expect("config");
        assert_eq!(config.port, 9207);
        assert_eq!(config.source_label, "zoom notes");
        assert_eq!(config.done_label, "zoom notes processed");
        assert_eq!(config.webhook_url, "http://localhost:9207/");
        assert_eq!(config.secret_key, "s3cret");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _secret = EnvGuard::set("SECRET_KEY", "s3cret");
        let _port = EnvGuard::set("PIPELINE_PORT", "8088");
        let _label = EnvGuard::set("SOURCE_LABEL", "meeting notes");
        let config = PipelineConfig::from_env().expect("config");
        assert_eq!(config.port, 8088);
        assert_eq!(config.source_label, "meeting notes");
    }
}
