//! Descriptors exchanged between pipeline stages

use crate::core::path;
use crate::core::stat::Stat;
use crate::error::{Error, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// A raw glob match, not yet stat'd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDescriptor {
    /// Absolute path of the match
    pub path: PathBuf,
    /// Directory the glob was rooted at
    pub base: PathBuf,
}

impl MatchDescriptor {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
        }
    }
}

/// How a sink should open the destination of a resolved descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteFlag {
    /// Create or truncate (`"w"`)
    #[serde(rename = "w")]
    Truncate,
    /// Create, failing if the destination exists (`"wx"`)
    #[serde(rename = "wx")]
    Exclusive,
}

impl WriteFlag {
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            Self::Truncate
        } else {
            Self::Exclusive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Truncate => "w",
            Self::Exclusive => "wx",
        }
    }

    /// Configure `options` for writing with this flag
    pub fn apply<'a>(&self, options: &'a mut OpenOptions) -> &'a mut OpenOptions {
        match self {
            Self::Truncate => options.write(true).create(true).truncate(true),
            Self::Exclusive => options.write(true).create_new(true),
        }
    }
}

/// The unit of exchange between all stages
///
/// A descriptor is owned by exactly one stage at a time and moves downstream
/// on emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub base: PathBuf,
    pub cwd: PathBuf,
    pub stat: Option<Stat>,
    pub flag: Option<WriteFlag>,
    /// Opaque payload, never inspected by this crate
    #[serde(skip)]
    pub contents: Option<Vec<u8>>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            cwd: cwd.into(),
            stat: None,
            flag: None,
            contents: None,
        }
    }

    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = Some(contents);
        self
    }

    /// `path` relative to `base`
    pub fn relative(&self) -> Result<PathBuf> {
        path::relative_to(&self.path, &self.base)
            .ok_or_else(|| Error::path_outside_base(&self.path, &self.base))
    }

    pub fn dirname(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn basename(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    pub fn extname(&self) -> Option<&OsStr> {
        self.path.extension()
    }

    pub fn is_symbolic(&self) -> bool {
        self.stat.as_ref().is_some_and(Stat::is_symbolic_link)
    }

    pub fn is_directory(&self) -> bool {
        self.stat.as_ref().is_some_and(Stat::is_directory)
    }

    pub fn is_file(&self) -> bool {
        self.stat.as_ref().is_some_and(Stat::is_file)
    }
}
