//! Error types for deploy-config

use std::path::PathBuf;

use crate::path_merge::ConflictKind;

/// Result type for deploy-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading and merging stage configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No stage was requested
    #[error("Stage not defined")]
    StageNotDefined,

    /// The configuration file (or a referenced env file) does not exist
    #[error("Couldn't find configuration file \"{}\"", path.display())]
    ConfigFileNotFound { path: PathBuf },

    /// The requested stage is not present under `stages`
    #[error("Stage \"{stage}\" not found in {}", path.display())]
    ConfigStageMissing { stage: String, path: PathBuf },

    /// An environment key tried to change the shape of the config tree
    #[error("Tried to {kind} with env: {key} (at {path})")]
    StructureConflict {
        key: String,
        path: String,
        kind: ConflictKind,
    },

    /// YAML that could not be parsed or expanded
    #[error("Failed to parse YAML config at {}: {message}", path.display())]
    YamlParse { path: PathBuf, message: String },

    /// YAML that parsed but cannot be represented as a config tree
    #[error("Unsupported config value at {location}: {reason}")]
    UnsupportedValue { location: String, reason: String },

    /// A dotenv file with invalid syntax
    #[error("Failed to parse env file {}: {message}", path.display())]
    DotenvParse { path: PathBuf, message: String },

    /// A reserved block (`environment`, `env_files`) with the wrong shape
    #[error("Invalid `{key}` block: {message}")]
    InvalidReservedBlock { key: String, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
