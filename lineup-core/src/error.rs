use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("unsupported file format for {path} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
