use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub delay_between_requests: Duration,
    /// Extra fetch attempts after the first one.
    pub max_retries: u32,
    pub fetch_timeout: Duration,
    pub output_dir: PathBuf,
    pub source_file: PathBuf,
    pub processed_file: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError("GEMINI_API_KEY not found in environment variables".to_string())
            })?;

        let delay_secs: u64 = parse_or(&lookup, "DELAY_BETWEEN_REQUESTS", 5)?;
        let max_retries: u32 = parse_or(&lookup, "MAX_RETRIES", 3)?;
        let fetch_timeout_secs: u64 = parse_or(&lookup, "FETCH_TIMEOUT_SECS", 30)?;

        let path_or = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        Ok(Config {
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            delay_between_requests: Duration::from_secs(delay_secs),
            max_retries,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            output_dir: path_or("OUTPUT_DIR", "processed_documents"),
            source_file: path_or("SOURCE_FILE", "../source_links.txt"),
            processed_file: path_or("PROCESSED_FILE", "processed_links.txt"),
            log_file: path_or("LOG_FILE", "url_processor.log"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
