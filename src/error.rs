// src/error.rs

//! Error types shared by the resolver, registries and server

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while validating requests and resolving content
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed template category or name
    #[error("invalid {field} '{value}'")]
    InvalidSpec { field: &'static str, value: String },

    /// Malformed or missing OS descriptor field
    #[error("invalid system '{0}' specified")]
    InvalidParameter(&'static str),

    /// Well-formed request with no content at any specificity level
    #[error("no {resource} found for {key}")]
    NotFound { resource: &'static str, key: String },

    #[error("unsupported OS Type ({0})")]
    UnsupportedOsType(String),

    #[error("unsupported OS Distro ({0})")]
    UnsupportedDistro(String),

    #[error("unsupported {distro} version (v{version})")]
    UnsupportedVersion { distro: String, version: String },

    #[error("unsupported architecture ({arch}) for {distro} {version}")]
    UnsupportedArch {
        arch: String,
        distro: String,
        version: String,
    },

    /// Content exists but cannot be served
    #[error("invalid {resource} found ({key}): {reason}")]
    InvalidEntry {
        resource: &'static str,
        key: String,
        reason: String,
    },

    /// Operator misconfiguration detected at use time
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Coarse classification used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent something malformed
    Client,
    /// Nothing matched the request
    NotFound,
    /// Package lookup failed at one nesting level
    Unsupported,
    /// Broken content or I/O failure on the server side
    Fault,
    /// Configuration prevents serving the request
    Configuration,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSpec { .. } | Error::InvalidParameter(_) => ErrorKind::Client,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::UnsupportedOsType(_)
            | Error::UnsupportedDistro(_)
            | Error::UnsupportedVersion { .. }
            | Error::UnsupportedArch { .. } => ErrorKind::Unsupported,
            Error::InvalidEntry { .. } | Error::Io { .. } => ErrorKind::Fault,
            Error::InvalidConfiguration(_) | Error::Config(_) | Error::Regex(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
