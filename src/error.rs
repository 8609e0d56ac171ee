//! Error types for the fsprep library
//!
//! Errors fall into three classes, reported by [`Error::kind`]:
//! argument errors raised while a stream is being constructed, configuration
//! errors raised when a per-file option cannot be evaluated, and I/O errors
//! raised by the filesystem while a stream is running.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for all library operations
#[derive(Error, Debug)]
pub enum Error {
    /// A filesystem call failed for a specific path
    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal errors from the glob enumerator
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The glob argument was empty, malformed or only negative
    #[error("Invalid glob argument: {reason}")]
    InvalidGlob { reason: String },

    /// A glob without wildcards matched nothing
    #[error("File not found with singular glob: {path}")]
    SingularGlobNotFound { path: PathBuf },

    /// No output folder was given when the writer was created
    #[error("Invalid output folder")]
    MissingOutputFolder,

    /// The output folder evaluated to an empty value for a file
    #[error("Invalid output folder")]
    InvalidOutputFolder,

    /// The `since` option could not be interpreted as a date
    #[error("expected since option to be a date or timestamp: {value}")]
    InvalidSince { value: String },

    /// Symlink resolution did not terminate
    #[error("too many levels of symbolic links: {path}")]
    SymlinkLoop { path: PathBuf },

    /// A descriptor path does not live under its base
    #[error("path {path} is not under base {base}")]
    PathOutsideBase { path: PathBuf, base: PathBuf },

    /// The enumerator task stopped without reporting a result
    #[error("glob enumerator stopped unexpectedly: {reason}")]
    EnumeratorStopped { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the operation and path it came from
    pub fn io_path(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid glob error
    pub fn invalid_glob(reason: impl Into<String>) -> Self {
        Self::InvalidGlob {
            reason: reason.into(),
        }
    }

    /// Create a new singular glob error
    pub fn singular_glob_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SingularGlobNotFound { path: path.into() }
    }

    /// Create a new invalid since error
    pub fn invalid_since(value: impl Into<String>) -> Self {
        Self::InvalidSince {
            value: value.into(),
        }
    }

    /// Create a new symlink loop error
    pub fn symlink_loop(path: impl Into<PathBuf>) -> Self {
        Self::SymlinkLoop { path: path.into() }
    }

    /// Create a new path outside base error
    pub fn path_outside_base(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self::PathOutsideBase {
            path: path.into(),
            base: base.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidGlob { .. } | Self::MissingOutputFolder => ErrorKind::Argument,
            Self::InvalidSince { .. } => ErrorKind::Configuration,
            Self::Io { .. }
            | Self::Walk(_)
            | Self::SingularGlobNotFound { .. }
            | Self::InvalidOutputFolder
            | Self::SymlinkLoop { .. }
            | Self::PathOutsideBase { .. }
            | Self::EnumeratorStopped { .. } => ErrorKind::Io,
        }
    }

    /// The underlying `std::io::ErrorKind`, when there is one
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            Self::Walk(err) => err.io_error().map(|e| e.kind()),
            _ => None,
        }
    }
}

/// Error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected while constructing a stream, before any I/O
    Argument,
    /// A per-file option could not be evaluated
    Configuration,
    /// The filesystem or the enumerator failed mid-stream
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument => write!(f, "ARGUMENT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Io => write!(f, "IO"),
        }
    }
}
