//! Errors raised while setting up a run: reading files, loading descriptors
//! and parsing the configuration file.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor YAML could not be decoded.
    #[error("Malformed setting descriptors: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Descriptor JSON could not be decoded.
    #[error("Malformed setting descriptors: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] libaxcfg::Error),
}

impl CliError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }
}
