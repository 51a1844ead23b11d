//! Error handling for dviz runs
//!
//! Each stage has its own error type; [`DvizError`] wraps them at the
//! top level. Render functions return [`RenderError`] and are free to use the
//! convenience constructors below.

use std::time::Duration;

use thiserror::Error;

use crate::document::SelectorError;
use crate::utils::literal::LiteralError;

/// Errors raised while ensuring libraries are available
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A command declared a library nobody registered
    #[error("Unknown library '{0}'")]
    UnknownLibrary(String),

    /// The all-of barrier did not complete in time
    #[error("Timed out after {after:?} waiting for libraries: {}", .pending.join(", "))]
    Timeout {
        after: Duration,
        pending: Vec<String>,
    },

    /// The resource request itself failed
    #[error("Failed to load '{library}' from {url}: {message}")]
    Fetch {
        library: String,
        url: String,
        message: String,
    },

    /// The post-availability hook failed
    #[error("Initialization of '{library}' failed: {message}")]
    Hook { library: String, message: String },
}

/// Errors raised by a render function
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The data block does not have the shape this command needs
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The options literal could not be parsed
    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] LiteralError),

    /// Layout manipulation failed (e.g. the container was detached)
    #[error("Layout error: {0}")]
    Layout(String),

    /// Anything else a custom render function wants to report
    #[error("{0}")]
    Custom(String),
}

impl RenderError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        RenderError::InvalidData(message.into())
    }

    pub fn layout(message: impl Into<String>) -> Self {
        RenderError::Layout(message.into())
    }

    pub fn custom(message: impl Into<String>) -> Self {
        RenderError::Custom(message.into())
    }
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum DvizError {
    /// Library loading failed; nothing was dispatched
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A render function failed and the batch was aborted
    #[error("Command '@{command}' failed: {source}")]
    Render {
        command: String,
        #[source]
        source: RenderError,
    },

    /// A configured selector could not be parsed
    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    /// Configuration could not be read
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error (CLI and file helpers)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DvizError {
    pub fn render(command: impl Into<String>, source: RenderError) -> Self {
        DvizError::Render {
            command: command.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        DvizError::Config(message.into())
    }
}

impl From<toml::de::Error> for DvizError {
    fn from(err: toml::de::Error) -> Self {
        DvizError::Config(err.to_string())
    }
}

/// Result type for dviz operations
pub type DvizResult<T> = Result<T, DvizError>;
