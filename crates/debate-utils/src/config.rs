//! Application-level configuration shared by every binary in the workspace

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "stock-debate".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build from `APP_ENV` and `LOG_FORMAT`, falling back to defaults
    ///
    /// Production deployments log JSON unless `LOG_FORMAT` says otherwise.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::var("APP_ENV").ok(), std::env::var("LOG_FORMAT").ok())
    }

    fn from_vars(environment: Option<String>, log_format: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(environment) = environment {
            config.environment = environment;
        }
        config.log_format = match log_format.as_deref() {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(format) if format.eq_ignore_ascii_case("text") => LogFormat::Text,
            _ if config.is_production() => LogFormat::Json,
            _ => LogFormat::Text,
        };
        config
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "stock-debate");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_defaults_to_json_logs() {
        let config = AppConfig::from_vars(Some("Production".to_string()), None);
        assert!(config.is_production());
        assert_eq!(config.log_format, LogFormat::Json);

        let config = AppConfig::from_vars(Some("production".to_string()), Some("text".to_string()));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_from_vars() {
        let config = AppConfig::from_vars(None, Some("JSON".to_string()));
        assert_eq!(config.environment, "development");
        assert_eq!(config.log_format, LogFormat::Json);

        let config = AppConfig::from_vars(Some("staging".to_string()), Some("xml".to_string()));
        assert_eq!(config.log_format, LogFormat::Text);
    }
}
