//! fsprep: streaming read normalization and write-target resolution for
//! glob-driven file pipelines
//!
//! The crate sits between a glob enumerator and whatever consumes files. On
//! the way in it stats every match, follows symlinks and drops files older
//! than a cutoff. On the way out it computes where each file should land,
//! with which mode and whether an existing destination may be replaced.
//! File contents are never read or written here.
//!
//! # Quick Start
//!
//! ## Reading
//!
//! ```rust,no_run
//! use fsprep::{read, ReadOptions, Result};
//! use futures::StreamExt;
//!
//! # async fn run() -> Result<()> {
//! let mut files = read("src/**/*.rs", ReadOptions::default())?;
//! while let Some(file) = files.next().await {
//!     let file = file?;
//!     println!("{} ({:?})", file.path.display(), file.stat.map(|s| s.size));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Planning writes
//!
//! ```rust,no_run
//! use fsprep::{read, write, ReadOptions, WriteOptions, Result};
//! use futures::TryStreamExt;
//!
//! # async fn run() -> Result<()> {
//! let files = read("assets/*.png", ReadOptions::default().with_since(1_700_000_000_000i64))?;
//! let targets: Vec<_> = write("dist", WriteOptions::default().with_mode(0o644u32))?
//!     .pipe(files)
//!     .try_collect()
//!     .await?;
//! for file in targets {
//!     println!("{} <- flag {:?}", file.path.display(), file.flag);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`core`]: descriptors, metadata, per-file option resolution, path helpers
//! - [`io`]: the glob enumerator, the read normalizer, the write resolver
//! - [`error`]: error type and classification
//!
//! Both stages are ordinary [`futures::Stream`]s. They are pulled by the
//! consumer, keep input order, and end right after the first error.

pub use error::{Error, ErrorKind, Result};

pub use crate::core::{
    FileDescriptor, FileKind, MatchDescriptor, Resolvable, Stat, Timestamp, WriteFlag,
};

pub use io::{
    FileReader, FileStream, FileSystem, GlobEnumerator, GlobOptions, GlobSpec, LocalFs, PathWriter,
    ReadOptions, ResolvedWriteOptions, WriteOptions,
};

pub mod core;
pub mod error;
pub mod io;

/// Stream normalized descriptors for every match of `globs`
///
/// Fails immediately with [`ErrorKind::Argument`] when the glob spec is
/// invalid. Errors met while streaming end the stream.
pub fn read(globs: impl Into<GlobSpec>, options: ReadOptions) -> Result<FileStream> {
    FileReader::new(options)?.read(globs)
}

/// Create a write resolver targeting `out_folder`
///
/// Fails immediately when `out_folder` is a literal empty path.
pub fn write(
    out_folder: impl Into<Resolvable<std::path::PathBuf>>,
    options: WriteOptions,
) -> Result<PathWriter> {
    PathWriter::new(out_folder, options)
}
