//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::reload::PatternError;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("`template_glob` is required")]
    MissingTemplateGlob,

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Config validation error: {0}")]
    Validation(String),
}
