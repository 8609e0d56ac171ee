//! File metadata carried on descriptors

use serde::Serialize;
use std::fs::Metadata;
use std::time::SystemTime;

/// What kind of filesystem object a stat describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
    /// Empty metadata record, nothing was stat'd
    #[default]
    Unknown,
}

/// Metadata snapshot for one path
///
/// `mode` holds the full `st_mode` on unix (type bits included). On other
/// platforms it is left unset by [`Stat::from_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Stat {
    pub kind: FileKind,
    pub mode: Option<u32>,
    pub size: u64,
    pub mtime: Option<SystemTime>,
    pub atime: Option<SystemTime>,
    /// Last status change (`st_ctime`), unix only
    pub ctime: Option<SystemTime>,
    pub birthtime: Option<SystemTime>,
}

impl Stat {
    /// Snapshot `std::fs::Metadata`, as returned by either `metadata` or
    /// `symlink_metadata`
    pub fn from_metadata(meta: &Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Self {
            kind,
            mode: mode_of(meta),
            size: meta.len(),
            mtime: meta.modified().ok(),
            atime: meta.accessed().ok(),
            ctime: ctime_of(meta),
            birthtime: meta.created().ok(),
        }
    }

    pub fn is_symbolic_link(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Builder used by tests and in-memory filesystems
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.mode())
}

#[cfg(not(unix))]
fn mode_of(_meta: &Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn ctime_of(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;
    let secs = meta.ctime();
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    if secs >= 0 {
        SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs.unsigned_abs(), nanos))
    } else {
        SystemTime::UNIX_EPOCH
            .checked_sub(Duration::from_secs(secs.unsigned_abs()))?
            .checked_add(Duration::from_nanos(u64::from(nanos)))
    }
}

#[cfg(not(unix))]
fn ctime_of(_meta: &Metadata) -> Option<SystemTime> {
    None
}
