use std::{io, path::PathBuf};

use thiserror::Error;

use crate::def::OptKind;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("option {name} expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: OptKind,
        found: String,
    },
    #[error("invalid value {value:?} for option {name}")]
    InvalidValue { name: String, value: String },
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("option {name} cannot be read as the requested type: {source}")]
    Convert {
        name: String,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("options already installed")]
    AlreadyInstalled,
}

impl ConfigError {
    /// `true` when the error is a missing config file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
