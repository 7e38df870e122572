use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub analysis: AnalysisConfig,
}

/// KlinikDeutsch backend configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Timeout applied to every attempt.
    pub timeout_ms: u64,
    /// Extra attempts for idempotent methods.
    pub max_retries: u32,
    /// Linear backoff unit; attempt `n` waits `n * retry_delay_ms`.
    pub retry_delay_ms: u64,
}

/// Two-phase analysis configuration
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Token cap sent with lite and deep analysis calls.
    pub token_limit: u32,
    /// Title sent with create document.
    pub document_title: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = non_empty_var("KLINIK_API_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url).map_err(|e| AppError::Config {
            message: format!("KLINIK_API_URL is not a valid URL: {}", e),
        })?;

        let api = ApiConfig {
            base_url,
            username: non_empty_var("KLINIK_USERNAME"),
            password: non_empty_var("KLINIK_PASSWORD"),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                non_empty_var("DATABASE_PATH").unwrap_or_else(|| "./data/klinik.db".to_string()),
            ),
            max_connections: parsed_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: non_empty_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: match non_empty_var("LOG_FORMAT")
                .unwrap_or_else(|| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: parsed_var("REQUEST_TIMEOUT_MS").unwrap_or(defaults.timeout_ms),
            max_retries: parsed_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: parsed_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
        };

        let defaults = AnalysisConfig::default();
        let analysis = AnalysisConfig {
            token_limit: parsed_var("ANALYSIS_TOKEN_LIMIT").unwrap_or(defaults.token_limit),
            document_title: non_empty_var("DOCUMENT_TITLE").unwrap_or(defaults.document_title),
        };

        Ok(Config {
            api,
            database,
            logging,
            request,
            analysis,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            max_retries: 2,
            retry_delay_ms: 300,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            token_limit: 20,
            document_title: "Texto em alemão".to_string(),
        }
    }
}
