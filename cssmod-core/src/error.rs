//! Typed error handling for cssmod.
//!
//! Resolution misses (excluded or missing stylesheets) are never errors; they
//! are `Ok(None)` at the cache layer. Everything here is a real failure for the
//! one stylesheet being extracted.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cssmod operations.
#[derive(Error, Debug)]
pub enum CssModError {
    /// I/O error when reading a stylesheet or config file
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Syntax error in a stylesheet
    #[error("Parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        /// Line number (1-indexed) if available
        line: Option<usize>,
        /// Column number (1-indexed) if available
        column: Option<usize>,
    },

    /// Invalid `composes` declaration
    #[error("Composition error in {path}: {message}")]
    Composition { path: PathBuf, message: String },

    /// Selector rejected by the configured scope mode
    #[error("Scope error in {path}: {message}")]
    Scope { path: PathBuf, message: String },

    /// A processor stage failed or its deferred completion was rejected
    #[error("Stage '{stage}' failed: {message}")]
    Pipeline { stage: String, message: String },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CssModError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a parse error without location.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create a parse error with line/column info.
    pub fn parse_at(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn composition(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Composition {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn scope(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Scope {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if analysis of *other* files can continue after this error.
    ///
    /// Every per-stylesheet failure is recoverable at the session level; only
    /// argument errors indicate a caller bug.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidArgument { .. })
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Parse { path, .. } => Some(path),
            Self::Composition { path, .. } => Some(path),
            Self::Scope { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for cssmod results.
pub type CssModResult<T> = Result<T, CssModError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> CssModResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> CssModResult<T> {
        self.map_err(|e| CssModError::io(path, e))
    }
}
