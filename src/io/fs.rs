//! Filesystem seam used by the read normalizer
//!
//! The normalizer only needs two primitives: a stat that does not follow the
//! final symlink, and symlink resolution. Implement [`FileSystem`] to run the
//! pipeline against something other than the local disk.

use crate::core::Stat;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Stat `path` without following a final symlink
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Stat>;

    /// Follow `path` to the location it refers to
    ///
    /// Implementations may resolve the whole chain at once or a single hop;
    /// the normalizer keeps calling until it stats a non-symlink.
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The local disk, through `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Stat> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        Ok(Stat::from_metadata(&meta))
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}
