use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub email: EmailSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    /// Maximum retry attempts per notification
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Default cap for history queries
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_history_limit() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

fn default_from_address() -> String {
    "noreply@example.com".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("dispatch.max_retries", 3)?
            .set_default("dispatch.history_limit", 50)?
            .set_default("email.smtp_host", "localhost")?
            .set_default("email.smtp_port", 587)?
            .set_default("email.use_tls", true)?
            .set_default("email.from_address", "noreply@example.com")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // DISPATCH_MAX_RETRIES, EMAIL_SMTP_HOST, EMAIL_FROM_ADDRESS, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: default_use_tls(),
            from_address: default_from_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.history_limit, 50);
    }

    #[test]
    fn test_email_defaults() {
        let settings = EmailSettings::default();
        assert_eq!(settings.smtp_host, "localhost");
        assert_eq!(settings.smtp_port, 587);
        assert!(settings.use_tls);
        assert!(settings.username.is_none());
        assert_eq!(settings.from_address, "noreply@example.com");
    }
}
