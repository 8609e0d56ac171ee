//! Read normalization
//!
//! Turns raw glob matches into stat'd descriptors. Symlinks are followed until
//! a non-symlink is found; the emitted descriptor keeps the path of the first
//! link while its `stat` describes the final target. Order is preserved even
//! though up to `high_water_mark` matches are stat'd concurrently.

use crate::core::config::{self, Resolvable, Timestamp};
use crate::core::{FileDescriptor, MatchDescriptor, Stat};
use crate::error::{Error, Result};
use crate::io::fs::{FileSystem, LocalFs};
use crate::io::glob::{GlobEnumerator, GlobOptions, GlobSpec};
use crate::io::stream::{halt_on_error, FileStream, DEFAULT_HIGH_WATER_MARK};
use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{Stream, StreamExt};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound on symlink hops for one match, matching Linux `MAXSYMLINKS`
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Configuration for the read normalizer
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Follow symlinks to their target (default `true`)
    pub resolve_symlinks: Option<Resolvable<bool>>,
    /// Skip files whose mtime is not strictly after this cutoff
    pub since: Option<Resolvable<Timestamp>>,
    /// Options passed to the glob enumerator
    pub glob: GlobOptions,
    /// Maximum number of matches being normalized at once
    pub high_water_mark: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            resolve_symlinks: None,
            since: None,
            glob: GlobOptions::default(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

impl ReadOptions {
    pub fn with_resolve_symlinks(mut self, resolve: impl Into<Resolvable<bool>>) -> Self {
        self.resolve_symlinks = Some(resolve.into());
        self
    }

    pub fn with_since(mut self, since: impl Into<Resolvable<Timestamp>>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn with_glob(mut self, glob: GlobOptions) -> Self {
        self.glob = glob;
        self
    }

    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = high_water_mark;
        self
    }

    /// Working directory recorded on emitted descriptors
    fn cwd(&self) -> Result<PathBuf> {
        match &self.glob.cwd {
            Some(cwd) => crate::core::path::absolute(cwd)
                .map_err(|err| Error::io_path("current_dir", cwd, err)),
            None => std::env::current_dir().map_err(|err| Error::io_path("current_dir", ".", err)),
        }
    }
}

/// Read normalizer over a [`FileSystem`]
#[derive(Debug)]
pub struct FileReader<F = LocalFs> {
    fs: Arc<F>,
    options: Arc<ReadOptions>,
    cwd: PathBuf,
}

impl<F> Clone for FileReader<F> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            options: Arc::clone(&self.options),
            cwd: self.cwd.clone(),
        }
    }
}

impl FileReader<LocalFs> {
    /// Create a reader over the local disk
    pub fn new(options: ReadOptions) -> Result<Self> {
        Self::with_fs(LocalFs, options)
    }
}

impl<F: FileSystem + 'static> FileReader<F> {
    /// Create a reader over a custom filesystem
    pub fn with_fs(fs: F, options: ReadOptions) -> Result<Self> {
        let cwd = options.cwd()?;
        Ok(Self {
            fs: Arc::new(fs),
            options: Arc::new(options),
            cwd,
        })
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Normalize one match
    ///
    /// Returns `Ok(None)` when the file is older than the `since` cutoff.
    pub async fn normalize(&self, candidate: MatchDescriptor) -> Result<Option<FileDescriptor>> {
        let MatchDescriptor { path, base } = candidate;
        let mut file = FileDescriptor::new(path, base, self.cwd.clone());
        let resolve = config::resolve_or(self.options.resolve_symlinks.as_ref(), &file, true)?;

        let mut original_symlink_path: Option<PathBuf> = None;
        let mut hops = 0;
        let stat = loop {
            let stat = self
                .fs
                .symlink_metadata(&file.path)
                .await
                .map_err(|err| Error::io_path("lstat", &file.path, err))?;

            if !(resolve && stat.is_symbolic_link()) {
                break stat;
            }

            hops += 1;
            if hops > MAX_SYMLINK_HOPS {
                return Err(Error::symlink_loop(
                    original_symlink_path.unwrap_or_else(|| file.path.clone()),
                ));
            }

            let target = self
                .fs
                .canonicalize(&file.path)
                .await
                .map_err(|err| Error::io_path("realpath", &file.path, err))?;
            debug!("symlink {} -> {}", file.path.display(), target.display());
            if original_symlink_path.is_none() {
                original_symlink_path = Some(file.path.clone());
            }
            file.path = target;
        };
        file.stat = Some(stat);

        if let Some(since) = self.options.since.as_ref() {
            let cutoff = config::resolve_required(since, &file, || {
                Error::invalid_since(format!("no value for {}", file.path.display()))
            })?;
            if !is_newer(file.stat.as_ref(), cutoff) {
                debug!("skipping {}: not modified since {}", file.path.display(), cutoff);
                return Ok(None);
            }
        }

        if let Some(original) = original_symlink_path {
            file.path = original;
        }

        Ok(Some(file))
    }

    /// Normalize a stream of matches
    ///
    /// Emission follows input order. The first error ends the stream.
    pub fn normalize_stream<S>(&self, matches: S) -> FileStream
    where
        S: Stream<Item = Result<MatchDescriptor>> + Send + 'static,
    {
        let reader = self.clone();
        let in_flight = self.options.high_water_mark.max(1);
        let normalized = matches
            .map(move |candidate| {
                let reader = reader.clone();
                async move {
                    match candidate {
                        Ok(candidate) => reader.normalize(candidate).await,
                        Err(err) => Err(err),
                    }
                }
            })
            .buffered(in_flight)
            .filter_map(|item| future::ready(item.transpose()));
        halt_on_error(normalized).boxed()
    }

    /// Enumerate `globs` and normalize every match
    ///
    /// The glob spec is validated here; a bad spec fails before any I/O.
    pub fn read(&self, globs: impl Into<GlobSpec>) -> Result<FileStream> {
        let enumerator = GlobEnumerator::new(globs, self.options.glob.clone())?;
        Ok(self.normalize_stream(enumerator.stream(self.options.high_water_mark)))
    }
}

/// mtime strictly after `cutoff`, compared at millisecond precision
///
/// A stat without an mtime is never considered old.
fn is_newer(stat: Option<&Stat>, cutoff: DateTime<Utc>) -> bool {
    match stat.and_then(|stat| stat.mtime) {
        Some(mtime) => DateTime::<Utc>::from(mtime).timestamp_millis() > cutoff.timestamp_millis(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fs::memory::MemoryFs;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, SystemTime};

    fn reader(fs: &MemoryFs, options: ReadOptions) -> FileReader<MemoryFs> {
        FileReader::with_fs(fs.clone(), options.with_glob(GlobOptions::default().with_cwd("/")))
            .unwrap()
    }

    fn candidate(path: &str) -> MatchDescriptor {
        MatchDescriptor::new(path, "/src")
    }

    fn secs(n: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(n)
    }

    #[tokio::test]
    async fn test_plain_file() {
        let fs = MemoryFs::new();
        fs.add_file("/src/a.txt", 10);

        let file = reader(&fs, ReadOptions::default())
            .normalize(candidate("/src/a.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.path, PathBuf::from("/src/a.txt"));
        assert_eq!(file.base, PathBuf::from("/src"));
        assert_eq!(file.cwd, PathBuf::from("/"));
        assert!(file.is_file());
        assert_eq!(fs.lstat_calls(), 1);
    }

    #[tokio::test]
    async fn test_chain_keeps_first_link_path() {
        let fs = MemoryFs::new();
        fs.add_file("/src/real.txt", 42);
        fs.add_symlink("/src/c.txt", "/src/real.txt");
        fs.add_symlink("/src/b.txt", "/src/c.txt");
        fs.add_symlink("/src/a.txt", "/src/b.txt");

        let file = reader(&fs, ReadOptions::default())
            .normalize(candidate("/src/a.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.path, PathBuf::from("/src/a.txt"));
        assert!(file.is_file());
        assert_eq!(file.stat.unwrap().mtime, Some(secs(42)));
        assert_eq!(fs.lstat_calls(), 4);
    }

    #[tokio::test]
    async fn test_resolution_disabled() {
        let fs = MemoryFs::new();
        fs.add_file("/src/real.txt", 1);
        fs.add_symlink("/src/link.txt", "/src/real.txt");

        let file = reader(&fs, ReadOptions::default().with_resolve_symlinks(false))
            .normalize(candidate("/src/link.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.path, PathBuf::from("/src/link.txt"));
        assert!(file.is_symbolic());
    }

    #[tokio::test]
    async fn test_resolution_per_file() {
        let fs = MemoryFs::new();
        fs.add_file("/src/real.txt", 1);
        fs.add_symlink("/src/keep.txt", "/src/real.txt");
        fs.add_symlink("/src/follow.txt", "/src/real.txt");

        let options = ReadOptions::default().with_resolve_symlinks(Resolvable::computed(
            |file: &FileDescriptor| Some(!file.path.ends_with("keep.txt")),
        ));
        let reader = reader(&fs, options);

        let kept = reader.normalize(candidate("/src/keep.txt")).await.unwrap().unwrap();
        assert!(kept.is_symbolic());
        let followed = reader.normalize(candidate("/src/follow.txt")).await.unwrap().unwrap();
        assert!(followed.is_file());
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let fs = MemoryFs::new();
        let err = reader(&fs, ReadOptions::default())
            .normalize(candidate("/src/missing.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_dangling_link_is_fatal() {
        let fs = MemoryFs::new();
        fs.add_symlink("/src/dangling.txt", "/src/gone.txt");
        let err = reader(&fs, ReadOptions::default())
            .normalize(candidate("/src/dangling.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { operation: "realpath", .. }));
    }

    #[tokio::test]
    async fn test_cycle_hits_hop_limit() {
        let fs = MemoryFs::new();
        fs.add_symlink("/src/ping", "/src/pong");
        fs.add_symlink("/src/pong", "/src/ping");

        let err = reader(&fs, ReadOptions::default())
            .normalize(candidate("/src/ping"))
            .await
            .unwrap_err();
        match err {
            Error::SymlinkLoop { path } => assert_eq!(path, PathBuf::from("/src/ping")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_since_cutoff() {
        let fs = MemoryFs::new();
        fs.add_file("/src/old.txt", 100);
        fs.add_file("/src/same.txt", 200);
        fs.add_file("/src/new.txt", 300);
        let reader = reader(&fs, ReadOptions::default().with_since(secs(200)));

        assert!(reader.normalize(candidate("/src/old.txt")).await.unwrap().is_none());
        assert!(reader.normalize(candidate("/src/same.txt")).await.unwrap().is_none());
        assert!(reader.normalize(candidate("/src/new.txt")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_since_uses_target_mtime() {
        let fs = MemoryFs::new();
        fs.add_file("/src/real.txt", 300);
        fs.add_symlink("/src/link.txt", "/src/real.txt");

        let file = reader(&fs, ReadOptions::default().with_since(200_000i64))
            .normalize(candidate("/src/link.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.path, PathBuf::from("/src/link.txt"));
    }

    #[tokio::test]
    async fn test_invalid_since_is_configuration_error() {
        let fs = MemoryFs::new();
        fs.add_file("/src/a.txt", 1);
        let err = reader(
            &fs,
            ReadOptions::default().with_since(Timestamp::Text("last tuesday".into())),
        )
        .normalize(candidate("/src/a.txt"))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_since_function_without_value_is_configuration_error() {
        let fs = MemoryFs::new();
        fs.add_file("/src/a.txt", 1);
        let options = ReadOptions::default()
            .with_since(Resolvable::<Timestamp>::computed(|_: &FileDescriptor| None));
        let matches = stream::iter(vec![Ok(candidate("/src/a.txt"))]);

        let items: Vec<_> = reader(&fs, options).normalize_stream(matches).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap_err().kind(),
            crate::error::ErrorKind::Configuration
        );
    }

    #[tokio::test]
    async fn test_stream_keeps_order_and_drops_skips() {
        let fs = MemoryFs::new();
        for (name, mtime) in [("a", 5), ("b", 1), ("c", 5), ("d", 5)] {
            fs.add_file(&format!("/src/{name}.txt"), mtime);
        }
        let reader = reader(
            &fs,
            ReadOptions::default().with_since(secs(2)).with_high_water_mark(3),
        );
        let matches = stream::iter(["a", "b", "c", "d"].map(|n| Ok(candidate(&format!("/src/{n}.txt")))));

        let paths: Vec<PathBuf> = reader
            .normalize_stream(matches)
            .map(|item| item.unwrap().path)
            .collect()
            .await;
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/src/a.txt"),
                PathBuf::from("/src/c.txt"),
                PathBuf::from("/src/d.txt")
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_halts_on_first_error() {
        let fs = MemoryFs::new();
        fs.add_file("/src/a.txt", 1);
        fs.add_file("/src/c.txt", 1);
        let matches = stream::iter(vec![
            Ok(candidate("/src/a.txt")),
            Ok(candidate("/src/missing.txt")),
            Ok(candidate("/src/c.txt")),
        ]);

        let items: Vec<_> = reader(&fs, ReadOptions::default().with_high_water_mark(1))
            .normalize_stream(matches)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_upstream_error_is_forwarded() {
        let fs = MemoryFs::new();
        let matches = stream::iter(vec![Err(Error::singular_glob_not_found("/src/x"))]);
        let items: Vec<_> = reader(&fs, ReadOptions::default())
            .normalize_stream(matches)
            .collect()
            .await;
        assert!(matches!(items.as_slice(), [Err(Error::SingularGlobNotFound { .. })]));
    }
}
