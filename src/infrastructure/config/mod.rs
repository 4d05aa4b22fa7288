use crate::domain::subscription::DEFAULT_FREE_DAILY_QUESTION_LIMIT;
use chrono::FixedOffset;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    pub storage_backend: StorageBackend,
    // Quota policy
    pub free_daily_question_limit: u32,
    pub quota_utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => return Err(format!("Unknown STORAGE_BACKEND: {}", other).into()),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL is required when STORAGE_BACKEND=postgres".into());
        }

        let config = Config {
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: match env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .as_str()
            {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            storage_backend,
            free_daily_question_limit: env::var("FREE_DAILY_QUESTION_LIMIT")
                .unwrap_or_else(|_| DEFAULT_FREE_DAILY_QUESTION_LIMIT.to_string())
                .parse()?,
            quota_utc_offset_minutes: env::var("QUOTA_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
        };

        // Reject offsets chrono can't represent up front
        config.quota_offset()?;

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Offset in which quota calendar days are counted
    pub fn quota_offset(&self) -> Result<FixedOffset, Box<dyn std::error::Error>> {
        self.quota_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                format!(
                    "QUOTA_UTC_OFFSET_MINUTES out of range: {}",
                    self.quota_utc_offset_minutes
                )
                .into()
            })
    }
}
