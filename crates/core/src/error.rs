use std::io;
use std::path::PathBuf;

/// Errors that can occur during gantry inference operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error(
        "\"{pattern}\" is an invalid path.\n\
         All paths have to start with either {{workspaceRoot}} or {{projectRoot}}.\n\
         For instance: \"{{projectRoot}}/**/not-stories/**\" or \"{{workspaceRoot}}/**/**/not-stories/**\"."
    )]
    InvalidTemplatePath { pattern: String },

    #[error("Glob error: {0}")]
    GlobError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to load {path}: {message}")]
    LoadError { path: PathBuf, message: String },

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Self {
        Error::GlobError(err.to_string())
    }
}

/// Result type alias for gantry operations
pub type Result<T> = std::result::Result<T, Error>;
