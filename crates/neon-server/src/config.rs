use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Upload ceiling when `NEON_MAX_UPLOAD_BYTES` is unset.
const DEFAULT_MAX_UPLOAD_BYTES: usize = neon_api::services::MAX_IMAGE_BYTES;

/// Room above the file cap for multipart boundaries and part headers.
const MULTIPART_HEADROOM: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Largest accepted image file.
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("NEON_PORT", "8080")
            .parse()
            .context("NEON_PORT must be a port number")?;
        let max_upload_bytes = match lookup("NEON_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse().context("NEON_MAX_UPLOAD_BYTES must be a byte count")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let cors_origins = var("NEON_CORS_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "*")
            .map(str::to_string)
            .collect();

        Ok(Self {
            host: var("NEON_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("NEON_DB_PATH", "neonsquare.db")),
            cors_origins,
            max_upload_bytes,
        })
    }

    /// Request body limit: a file of exactly `max_upload_bytes` must still fit
    /// once wrapped in a multipart form.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_add(MULTIPART_HEADROOM)
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
