//! Configuration management for the PDF template server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5001;

/// Upper bound for any retention TTL, ten years
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used to build download links handed back to clients
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    pub template_ttl_secs: u64,
    pub artifact_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    /// Remove an uploaded template as soon as a PDF has been generated from it
    pub delete_template_after_generate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                public_url: format!("http://localhost:{}", DEFAULT_PORT),
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                max_upload_bytes: 20 * 1024 * 1024,
            },
            retention: RetentionConfig {
                template_ttl_secs: 3600,
                artifact_ttl_secs: 900,
                sweep_interval_secs: 300,
                delete_template_after_generate: false,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = parse_var("SERVER_PORT", defaults.server.port)?;
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
                public_url,
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.storage.max_upload_bytes)?,
            },
            retention: RetentionConfig {
                template_ttl_secs: parse_ttl("TEMPLATE_TTL_SECS", defaults.retention.template_ttl_secs)?,
                artifact_ttl_secs: parse_ttl("ARTIFACT_TTL_SECS", defaults.retention.artifact_ttl_secs)?,
                sweep_interval_secs: parse_var(
                    "SWEEP_INTERVAL_SECS",
                    defaults.retention.sweep_interval_secs,
                )?,
                delete_template_after_generate: parse_var(
                    "DELETE_TEMPLATE_AFTER_GENERATE",
                    defaults.retention.delete_template_after_generate,
                )?,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { name, value }),
        Err(_) => Ok(default),
    }
}

/// Like `parse_var`, but rejects TTLs above `MAX_TTL_SECS`.
fn parse_ttl(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let secs = parse_var(name, default)?;
    if secs > MAX_TTL_SECS {
        return Err(ConfigError {
            name,
            value: secs.to_string(),
        });
    }
    Ok(secs)
}
