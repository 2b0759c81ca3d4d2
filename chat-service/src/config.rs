use anyhow::{Context, Result};
use chat_core::ChatError;
use std::env;
use std::str::FromStr;

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_file: String,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: i64,
    /// Tracked-address count above which idle rate limit entries are evicted.
    pub rate_limit_idle_evict_after: usize,
    /// First closed hour (inclusive).
    pub chat_closed_from_hour: u32,
    /// First open hour after the closed window.
    pub chat_closed_until_hour: u32,
    pub message_page_size: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "./chat.db".to_string(),
            log_file: "logs/chat.log".to_string(),
            rate_limit_max_requests: 5,
            rate_limit_window_secs: 60,
            rate_limit_idle_evict_after: 1024,
            chat_closed_from_hour: 21,
            chat_closed_until_hour: 6,
            message_page_size: 20,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Loads the configuration from the environment; unset variables take their defaults.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            rate_limit_max_requests: env_or(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs)?,
            rate_limit_idle_evict_after: env_or(
                "RATE_LIMIT_IDLE_EVICT_AFTER",
                defaults.rate_limit_idle_evict_after,
            )?,
            chat_closed_from_hour: env_or("CHAT_CLOSED_FROM_HOUR", defaults.chat_closed_from_hour)?,
            chat_closed_until_hour: env_or(
                "CHAT_CLOSED_UNTIL_HOUR",
                defaults.chat_closed_until_hour,
            )?,
            message_page_size: env_or("MESSAGE_PAGE_SIZE", defaults.message_page_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> chat_core::Result<()> {
        for (name, hour) in [
            ("CHAT_CLOSED_FROM_HOUR", self.chat_closed_from_hour),
            ("CHAT_CLOSED_UNTIL_HOUR", self.chat_closed_until_hour),
        ] {
            if hour >= 24 {
                return Err(ChatError::Config(format!("{} must be below 24, got {}", name, hour)));
            }
        }
        if self.rate_limit_max_requests == 0 {
            return Err(ChatError::Config("RATE_LIMIT_MAX_REQUESTS must be positive".to_string()));
        }
        if self.rate_limit_window_secs <= 0 {
            return Err(ChatError::Config("RATE_LIMIT_WINDOW_SECS must be positive".to_string()));
        }
        if self.message_page_size <= 0 {
            return Err(ChatError::Config("MESSAGE_PAGE_SIZE must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "DATABASE_URL",
        "LOG_FILE",
        "RATE_LIMIT_MAX_REQUESTS",
        "RATE_LIMIT_WINDOW_SECS",
        "RATE_LIMIT_IDLE_EVICT_AFTER",
        "CHAT_CLOSED_FROM_HOUR",
        "CHAT_CLOSED_UNTIL_HOUR",
        "MESSAGE_PAGE_SIZE",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        clear_env();

        let config = AppConfig::load().unwrap();

        assert_eq!(config.database_url, "./chat.db");
        assert_eq!(config.log_file, "logs/chat.log");
        assert_eq!(config.rate_limit_max_requests, 5);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.rate_limit_idle_evict_after, 1024);
        assert_eq!(config.chat_closed_from_hour, 21);
        assert_eq!(config.chat_closed_until_hour, 6);
        assert_eq!(config.message_page_size, 20);
    }

    #[test]
    #[serial]
    fn test_load_config_with_custom_values() {
        clear_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("LOG_FILE", "/tmp/chat-test.log");
        env::set_var("RATE_LIMIT_MAX_REQUESTS", "10");
        env::set_var("RATE_LIMIT_WINDOW_SECS", "30");
        env::set_var("CHAT_CLOSED_FROM_HOUR", "0");
        env::set_var("CHAT_CLOSED_UNTIL_HOUR", "0");
        env::set_var("MESSAGE_PAGE_SIZE", " 50 ");

        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.log_file, "/tmp/chat-test.log");
        assert_eq!(config.rate_limit_max_requests, 10);
        assert_eq!(config.rate_limit_window_secs, 30);
        assert_eq!(config.chat_closed_from_hour, 0);
        assert_eq!(config.chat_closed_until_hour, 0);
        assert_eq!(config.message_page_size, 50);
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_unparsable_number() {
        clear_env();
        env::set_var("RATE_LIMIT_MAX_REQUESTS", "five");

        let result = AppConfig::load();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_MAX_REQUESTS"));
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_out_of_range_hour() {
        clear_env();
        env::set_var("CHAT_CLOSED_FROM_HOUR", "24");

        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::default().validate().is_ok());

        let zero_budget = AppConfig {
            rate_limit_max_requests: 0,
            ..AppConfig::default()
        };
        assert!(matches!(zero_budget.validate(), Err(ChatError::Config(_))));

        let zero_window = AppConfig {
            rate_limit_window_secs: 0,
            ..AppConfig::default()
        };
        assert!(matches!(zero_window.validate(), Err(ChatError::Config(_))));

        let zero_page = AppConfig {
            message_page_size: 0,
            ..AppConfig::default()
        };
        assert!(matches!(zero_page.validate(), Err(ChatError::Config(_))));
    }
}
