//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem step that failed while handling a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Read => "read config file",
            FileOp::Write => "write config file",
            FileOp::CreateDir => "create config directory",
        })
    }
}

/// Errors raised while loading, saving or checking configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to {op} '{path}': {source}")]
    Io {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("Unknown index backend: '{0}'. Valid values: pinecone, qdrant")]
    UnknownBackend(String),

    /// Both stages would search the same namespace
    #[error("index.meta_namespace and index.base_namespace must differ (both '{0}')")]
    NamespaceClash(String),

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The environment variable holding a service key is unset or blank
    #[error("missing API key for {service}: set the {env} environment variable")]
    MissingApiKey { service: String, env: String },

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Read, path, source)
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::Write, path, source)
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(FileOp::CreateDir, path, source)
    }

    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing_api_key(service: impl Into<String>, env: impl Into<String>) -> Self {
        Self::MissingApiKey {
            service: service.into(),
            env: env.into(),
        }
    }
}
