//! Errors raised while loading `fmweave.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid fmweave.toml")]
    Toml(#[from] toml::de::Error),

    /// A setting parsed but cannot drive a build (missing schema, zero depth).
    #[error("invalid fmweave.toml: {0}")]
    Validation(String),
}
