//! Configuration management for Filedrop Server

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::storage::FileBackend;
use crate::upload::{
    UploadLimits, DEFAULT_CONCURRENT_UPLOADS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_READ_TIMEOUT_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub enable_metrics: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub api_version: String,
    pub frontend_origin: String,
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_size_bytes: u64,
    pub concurrent_upload_limit: usize,
    pub request_timeout_secs: u64,
    pub file_backend: FileBackend,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("{var} must be at most {max}")]
    TooLarge { var: &'static str, max: usize },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                api_prefix: "/api/v1".to_string(),
                api_version: "1.0.0".to_string(),
                frontend_origin: "http://localhost:3000".to_string(),
                env: "dev".to_string(),
            },
            uploads: UploadConfig {
                max_upload_size_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                concurrent_upload_limit: DEFAULT_CONCURRENT_UPLOADS,
                request_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
                file_backend: FileBackend::Memory,
            },
            enable_metrics: true,
        }
    }
}

impl Config {
    /// Load from process environment, falling back to defaults per variable
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "PORT", defaults.server.port)?,
                api_prefix: normalize_prefix(
                    &lookup("API_PREFIX").unwrap_or(defaults.server.api_prefix),
                ),
                api_version: lookup("API_VERSION").unwrap_or(defaults.server.api_version),
                frontend_origin: lookup("FRONTEND_ORIGIN").unwrap_or(defaults.server.frontend_origin),
                env: lookup("ENV").unwrap_or(defaults.server.env),
            },
            uploads: UploadConfig {
                max_upload_size_bytes: parse_var(
                    &lookup,
                    "MAX_UPLOAD_SIZE_BYTES",
                    defaults.uploads.max_upload_size_bytes,
                )?,
                concurrent_upload_limit: parse_var(
                    &lookup,
                    "CONCURRENT_UPLOAD_LIMIT",
                    defaults.uploads.concurrent_upload_limit,
                )?,
                request_timeout_secs: parse_var(
                    &lookup,
                    "REQUEST_TIMEOUT_SEC",
                    defaults.uploads.request_timeout_secs,
                )?,
                file_backend: parse_var(&lookup, "FILE_BACKEND", defaults.uploads.file_backend)?,
            },
            enable_metrics: match lookup("ENABLE_METRICS") {
                Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                    var: "ENABLE_METRICS",
                    value,
                })?,
                None => defaults.enable_metrics,
            },
        };

        if config.uploads.concurrent_upload_limit == 0 {
            return Err(ConfigError::MustBePositive("CONCURRENT_UPLOAD_LIMIT"));
        }
        if config.uploads.concurrent_upload_limit > Semaphore::MAX_PERMITS {
            return Err(ConfigError::TooLarge {
                var: "CONCURRENT_UPLOAD_LIMIT",
                max: Semaphore::MAX_PERMITS,
            });
        }
        if config.uploads.request_timeout_secs == 0 {
            return Err(ConfigError::MustBePositive("REQUEST_TIMEOUT_SEC"));
        }

        Ok(config)
    }

    /// Limits handed to the upload coordinator
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            concurrent_uploads: self.uploads.concurrent_upload_limit,
            max_upload_bytes: self.uploads.max_upload_size_bytes,
            read_timeout: Duration::from_secs(self.uploads.request_timeout_secs),
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Ensure a leading slash and no trailing slash
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert_eq!(config.uploads.max_upload_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.uploads.concurrent_upload_limit, 100);
        assert_eq!(config.uploads.request_timeout_secs, 30);
        assert_eq!(config.uploads.file_backend, FileBackend::Memory);
        assert_eq!(config.server.api_version, "1.0.0");
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("API_PREFIX", "api/v2/"),
            ("MAX_UPLOAD_SIZE_BYTES", "2048"),
            ("CONCURRENT_UPLOAD_LIMIT", "4"),
            ("REQUEST_TIMEOUT_SEC", "5"),
            ("ENABLE_METRICS", "false"),
            ("FILE_BACKEND", "MEMORY"),
            ("API_VERSION", "2.0.0"),
        ]))
        .unwrap();

        assert_eq!(config.server.api_version, "2.0.0");
        assert_eq!(config.uploads.file_backend, FileBackend::Memory);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.api_prefix, "/api/v2");
        assert!(!config.enable_metrics);

        let limits = config.upload_limits();
        assert_eq!(limits.max_upload_bytes, 2048);
        assert_eq!(limits.concurrent_uploads, 4);
        assert_eq!(limits.read_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("PORT", "eighty")])),
            Err(ConfigError::InvalidValue { var: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("FILE_BACKEND", "")])),
            Err(ConfigError::InvalidValue { var: "FILE_BACKEND", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("CONCURRENT_UPLOAD_LIMIT", "0")])),
            Err(ConfigError::MustBePositive("CONCURRENT_UPLOAD_LIMIT"))
        ));
    }

    #[test]
    fn test_s3_backend_keeps_other_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("FILE_BACKEND", "s3"),
            ("PORT", "9100"),
            ("MAX_UPLOAD_SIZE_BYTES", "4096"),
            ("CONCURRENT_UPLOAD_LIMIT", "8"),
        ]))
        .unwrap();

        assert_eq!(config.uploads.file_backend, FileBackend::S3Stub);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.uploads.max_upload_size_bytes, 4096);
        assert_eq!(config.uploads.concurrent_upload_limit, 8);
    }

    #[test]
    fn test_concurrency_limit_capped_at_semaphore_max() {
        let too_many = (Semaphore::MAX_PERMITS + 1).to_string();
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("CONCURRENT_UPLOAD_LIMIT", too_many.as_str())])),
            Err(ConfigError::TooLarge { var: "CONCURRENT_UPLOAD_LIMIT", .. })
        ));

        let at_max = Semaphore::MAX_PERMITS.to_string();
        let config =
            Config::from_lookup(lookup_from(&[("CONCURRENT_UPLOAD_LIMIT", at_max.as_str())])).unwrap();
        assert_eq!(config.uploads.concurrent_upload_limit, Semaphore::MAX_PERMITS);
    }
}
