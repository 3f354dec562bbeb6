//! Configuration module
//!
//! Environment-driven configuration for the API and background services.
//! `Config::from_env()` reads `.env` (if present) via dotenvy, applies
//! defaults, and validates the result. No other module reads the environment.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_STORAGE_PATH: &str = "./data/blobs";
// 50 MiB upload ceiling
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
// Files live for 2 hours
const DEFAULT_RETENTION_SECONDS: u64 = 2 * 60 * 60;
// Sweep every 30 minutes
const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 30 * 60;

/// Per-route rate limit: max requests per window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Public base URL used to build download links (e.g. "https://drop.example.com").
    pub base_url: String,
    pub cors_origins: Vec<String>,
    pub storage_path: String,
    pub max_file_size_bytes: u64,
    pub retention: Duration,
    pub cleanup_interval: Duration,
    pub upload_rate_limit: RateLimit,
    pub download_rate_limit: RateLimit,
    pub metadata_rate_limit: RateLimit,
    pub db_max_connections: u32,
    pub environment: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Best-effort; a missing .env file is not an error.
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let base_url = env::var("BASE_URL").context("BASE_URL must be set")?;

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let config = Config {
            server_port: env_or("PORT", DEFAULT_PORT)?,
            database_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            cors_origins,
            storage_path: env_or("STORAGE_PATH", DEFAULT_STORAGE_PATH.to_string())?,
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES)?,
            retention: Duration::from_secs(env_or("RETENTION_SECONDS", DEFAULT_RETENTION_SECONDS)?),
            cleanup_interval: Duration::from_secs(env_or(
                "CLEANUP_INTERVAL_SECONDS",
                DEFAULT_CLEANUP_INTERVAL_SECONDS,
            )?),
            upload_rate_limit: RateLimit {
                max_requests: env_or("UPLOAD_RATE_LIMIT", 15)?,
                window: Duration::from_secs(env_or("UPLOAD_RATE_WINDOW_SECONDS", 15 * 60)?),
            },
            download_rate_limit: RateLimit {
                max_requests: env_or("DOWNLOAD_RATE_LIMIT", 100)?,
                window: Duration::from_secs(env_or("DOWNLOAD_RATE_WINDOW_SECONDS", 5 * 60)?),
            },
            metadata_rate_limit: RateLimit {
                max_requests: env_or("METADATA_RATE_LIMIT", 300)?,
                window: Duration::from_secs(env_or("METADATA_RATE_WINDOW_SECONDS", 5 * 60)?),
            },
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            environment: env_or("ENVIRONMENT", "development".to_string())?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_file_size_bytes == 0 {
            bail!("MAX_FILE_SIZE_BYTES must be greater than zero");
        }
        if self.retention.is_zero() {
            bail!("RETENTION_SECONDS must be greater than zero");
        }
        if self.cleanup_interval.is_zero() {
            bail!("CLEANUP_INTERVAL_SECONDS must be greater than zero");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("BASE_URL must be an absolute http(s) URL");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 8000,
            database_url: "postgres://localhost/flashdrop".to_string(),
            base_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["*".to_string()],
            storage_path: "./data/blobs".to_string(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            retention: Duration::from_secs(DEFAULT_RETENTION_SECONDS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS),
            upload_rate_limit: RateLimit {
                max_requests: 15,
                window: Duration::from_secs(900),
            },
            download_rate_limit: RateLimit {
                max_requests: 100,
                window: Duration::from_secs(300),
            },
            metadata_rate_limit: RateLimit {
                max_requests: 300,
                window: Duration::from_secs(300),
            },
            db_max_connections: 10,
            environment: "development".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let mut config = base_config();
        config.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let mut config = base_config();
        config.base_url = "localhost:3000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_origins_splits_and_trims() {
        let origins = parse_origins("https://a.example, https://b.example ,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
