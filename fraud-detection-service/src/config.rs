use fraud_model::{resolve_model_path, service_base_dir};
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&service_base_dir(), |key| std::env::var(key).ok())
    }

    /// `base_dir` anchors a relative or absent `MODEL_PATH`.
    pub fn from_lookup(base_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT);
        let max_upload_bytes = parse_or(
            "MAX_UPLOAD_BYTES",
            lookup("MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES,
        );
        let configured = lookup("MODEL_PATH").map(PathBuf::from);
        let model_path = resolve_model_path(base_dir, configured.as_deref());

        Self {
            host,
            port,
            model_path,
            max_upload_bytes,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {} value {:?}, using default {}", key, raw, default);
            default
        }),
    }
}
