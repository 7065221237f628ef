use std::str::FromStr;

use anyhow::{Context, Result, bail};
use storage::models::event::DEFAULT_FILE_EXTENSION;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown STORAGE_BACKEND '{}', expected postgres or memory", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub api_keys: String,
    pub allowed_origins: Vec<String>,
    pub results_extension: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("Cannot load DATABASE_URL env variable");
        }

        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("PORT must be a number")?
                .parse()?,
            backend,
            database_url,
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
            allowed_origins: split_list(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            results_extension: std::env::var("RACECHECK_EXTENSION")
                .unwrap_or_else(|_| DEFAULT_FILE_EXTENSION.to_string()),
            max_upload_bytes: match std::env::var("MAX_UPLOAD_BYTES") {
                Ok(value) => value.parse().context("MAX_UPLOAD_BYTES must be a number")?,
                Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
            },
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("Postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn splits_origin_list() {
        assert_eq!(
            split_list("http://a.test, ,http://b.test "),
            vec!["http://a.test", "http://b.test"]
        );
    }
}
