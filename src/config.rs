//! Configuration management for the Flashcard Server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment or .env file")]
    MissingApiKey,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `dotenvy::dotenv()` should run first so a local `.env` file can
    /// supply values. The API key has no default: the server refuses to
    /// start without one.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
            },
            gemini: GeminiConfig {
                api_key,
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
                endpoint: env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the env var mutations stay sequential.
    #[test]
    fn test_api_key_required() {
        env::remove_var("GEMINI_API_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingApiKey)
        ));

        env::set_var("GEMINI_API_KEY", "   ");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingApiKey)
        ));

        env::set_var("GEMINI_API_KEY", "test-key");
        let config = Config::from_env().unwrap();
        assert_eq!(config.gemini.api_key, "test-key");
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        env::remove_var("GEMINI_API_KEY");
    }
}
