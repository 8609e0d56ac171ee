//! Per-file option values
//!
//! An option is either a literal or a function of the file being processed.
//! [`resolve`] turns one into a concrete value for a given descriptor,
//! coercing it to the option's target type. Only date coercion can fail;
//! every other type falls back to the default when the value is missing.

use crate::core::file::FileDescriptor;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// A literal option value or a function computing one per file
pub enum Resolvable<T> {
    Value(T),
    Computed(Arc<dyn Fn(&FileDescriptor) -> Option<T> + Send + Sync>),
}

impl<T> Resolvable<T> {
    /// Wrap a per-file function
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&FileDescriptor) -> Option<T> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }
}

impl<T: Clone> Resolvable<T> {
    /// The raw value for `file`, before coercion
    pub fn evaluate(&self, file: &FileDescriptor) -> Option<T> {
        match self {
            Self::Value(value) => Some(value.clone()),
            Self::Computed(f) => f(file),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<bool> for Resolvable<bool> {
    fn from(value: bool) -> Self {
        Self::Value(value)
    }
}

impl From<u32> for Resolvable<u32> {
    fn from(value: u32) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Resolvable<PathBuf> {
    fn from(value: &str) -> Self {
        Self::Value(PathBuf::from(value))
    }
}

impl From<String> for Resolvable<PathBuf> {
    fn from(value: String) -> Self {
        Self::Value(PathBuf::from(value))
    }
}

impl From<PathBuf> for Resolvable<PathBuf> {
    fn from(value: PathBuf) -> Self {
        Self::Value(value)
    }
}

impl From<&std::path::Path> for Resolvable<PathBuf> {
    fn from(value: &std::path::Path) -> Self {
        Self::Value(value.to_path_buf())
    }
}

impl From<Timestamp> for Resolvable<Timestamp> {
    fn from(value: Timestamp) -> Self {
        Self::Value(value)
    }
}

impl From<SystemTime> for Resolvable<Timestamp> {
    fn from(value: SystemTime) -> Self {
        Self::Value(Timestamp::At(value))
    }
}

impl From<i64> for Resolvable<Timestamp> {
    fn from(value: i64) -> Self {
        Self::Value(Timestamp::Millis(value))
    }
}

/// Accepted inputs for a date option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    At(SystemTime),
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// RFC 3339 text, e.g. `2024-01-31T12:00:00Z`
    Text(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(time) => write!(f, "{}", DateTime::<Utc>::from(*time).to_rfc3339()),
            Self::Millis(ms) => write!(f, "{ms}"),
            Self::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// Target types an option value can be coerced into
pub trait Coerce: Sized {
    type Target;

    /// Convert a raw value
    ///
    /// `Ok(None)` makes the caller fall back to its default. Only types whose
    /// failure must surface to the caller return `Err`.
    fn coerce(self) -> Result<Option<Self::Target>>;
}

impl Coerce for bool {
    type Target = bool;

    fn coerce(self) -> Result<Option<bool>> {
        Ok(Some(self))
    }
}

impl Coerce for u32 {
    type Target = u32;

    fn coerce(self) -> Result<Option<u32>> {
        Ok(Some(self))
    }
}

impl Coerce for PathBuf {
    type Target = PathBuf;

    fn coerce(self) -> Result<Option<PathBuf>> {
        Ok(Some(self))
    }
}

impl Coerce for Timestamp {
    type Target = DateTime<Utc>;

    fn coerce(self) -> Result<Option<DateTime<Utc>>> {
        let parsed = match &self {
            Self::At(time) => Some(DateTime::<Utc>::from(*time)),
            Self::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Self::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        parsed
            .map(Some)
            .ok_or_else(|| Error::invalid_since(self.to_string()))
    }
}

/// Evaluate an optional option against `file`
///
/// Returns `Ok(None)` when the option is unset, the function produced
/// nothing, or a lenient coercion declined the value.
pub fn resolve<T: Coerce + Clone>(
    option: Option<&Resolvable<T>>,
    file: &FileDescriptor,
) -> Result<Option<T::Target>> {
    match option.and_then(|opt| opt.evaluate(file)) {
        Some(raw) => raw.coerce(),
        None => Ok(None),
    }
}

/// Evaluate a set option that must produce a value for `file`
///
/// A function returning nothing, or a coercion declining the value, fails
/// with the error built by `missing`.
pub fn resolve_required<T: Coerce + Clone>(
    option: &Resolvable<T>,
    file: &FileDescriptor,
    missing: impl FnOnce() -> Error,
) -> Result<T::Target> {
    match option.evaluate(file) {
        Some(raw) => raw.coerce()?.ok_or_else(missing),
        None => Err(missing()),
    }
}

/// [`resolve`] with a fallback for missing values
pub fn resolve_or<T: Coerce + Clone>(
    option: Option<&Resolvable<T>>,
    file: &FileDescriptor,
    default: T::Target,
) -> Result<T::Target> {
    Ok(resolve(option, file)?.unwrap_or(default))
}
