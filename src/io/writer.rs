//! Write target resolution
//!
//! Computes where and how each descriptor should be written: the absolute
//! destination path, the base directory it lives under, the file mode and the
//! open flag. Nothing is written to disk here; a downstream sink does that.

use crate::core::config::{self, Resolvable};
use crate::core::{path, FileDescriptor, Stat, WriteFlag};
use crate::error::{Error, Result};
use crate::io::stream::{halt_on_error, FileStream};
use futures::stream::{Stream, StreamExt};
use log::debug;
use std::path::PathBuf;

/// Per-call options for write resolution
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Directory relative output folders resolve against (default: process cwd)
    pub cwd: Option<Resolvable<PathBuf>>,
    /// File mode (default: the descriptor's current mode, if any)
    pub mode: Option<Resolvable<u32>>,
    /// Replace existing destinations (default `true`)
    pub overwrite: Option<Resolvable<bool>>,
}

impl WriteOptions {
    pub fn with_cwd(mut self, cwd: impl Into<Resolvable<PathBuf>>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_mode(mut self, mode: impl Into<Resolvable<u32>>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: impl Into<Resolvable<bool>>) -> Self {
        self.overwrite = Some(overwrite.into());
        self
    }
}

/// Options evaluated for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWriteOptions {
    pub cwd: PathBuf,
    pub mode: Option<u32>,
    pub overwrite: bool,
    pub flag: WriteFlag,
}

/// Resolves write targets for descriptors
#[derive(Debug, Clone)]
pub struct PathWriter {
    out_folder: Resolvable<PathBuf>,
    options: WriteOptions,
}

impl PathWriter {
    /// Create a writer targeting `out_folder`
    ///
    /// A literal empty folder is rejected immediately. A computed folder is
    /// checked per file.
    pub fn new(out_folder: impl Into<Resolvable<PathBuf>>, options: WriteOptions) -> Result<Self> {
        let out_folder = out_folder.into();
        if let Resolvable::Value(folder) = &out_folder {
            if folder.as_os_str().is_empty() {
                return Err(Error::MissingOutputFolder);
            }
        }
        Ok(Self {
            out_folder,
            options,
        })
    }

    /// Evaluate the per-call options against `file`
    pub fn resolve_options(&self, file: &FileDescriptor) -> Result<ResolvedWriteOptions> {
        let cwd = match config::resolve(self.options.cwd.as_ref(), file)? {
            Some(cwd) => cwd,
            None => std::env::current_dir()
                .map_err(|err| Error::io_path("current_dir", ".", err))?,
        };
        let default_mode = file.stat.as_ref().and_then(|stat| stat.mode);
        let mode = config::resolve(self.options.mode.as_ref(), file)?.or(default_mode);
        let overwrite = config::resolve_or(self.options.overwrite.as_ref(), file, true)?;

        Ok(ResolvedWriteOptions {
            cwd,
            mode,
            overwrite,
            flag: WriteFlag::from_overwrite(overwrite),
        })
    }

    /// Compute the write target of `file`
    pub fn resolve(&self, mut file: FileDescriptor) -> Result<FileDescriptor> {
        let resolved = self.resolve_options(&file)?;
        let cwd = path::absolute(&resolved.cwd)
            .map_err(|err| Error::io_path("current_dir", &resolved.cwd, err))?;

        let out_folder = config::resolve(Some(&self.out_folder), &file)?
            .filter(|folder| !folder.as_os_str().is_empty())
            .ok_or(Error::InvalidOutputFolder)?;

        let base = path::resolve(&cwd, &out_folder);
        let relative = file.relative()?;
        if relative.as_os_str().is_empty() {
            return Err(Error::path_outside_base(&file.path, &file.base));
        }
        let write_path = path::resolve(&base, &relative);

        let mut stat = file.stat.take().unwrap_or_else(Stat::default);
        stat.mode = resolved.mode;
        file.stat = Some(stat);
        file.flag = Some(resolved.flag);
        file.cwd = cwd;
        file.base = path::with_trailing_separator(base);
        file.path = write_path;

        debug!(
            "write target {} (flag {}, mode {:?})",
            file.path.display(),
            resolved.flag.as_str(),
            resolved.mode.map(|mode| format!("{mode:o}"))
        );
        Ok(file)
    }

    /// Resolve every descriptor of `files`
    ///
    /// The first error ends the stream.
    pub fn pipe<S>(self, files: S) -> FileStream
    where
        S: Stream<Item = Result<FileDescriptor>> + Send + 'static,
    {
        let resolved = files.map(move |item| item.and_then(|file| self.resolve(file)));
        halt_on_error(resolved).boxed()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::FileKind;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn source(relative: &str) -> FileDescriptor {
        FileDescriptor::new(format!("/src/{relative}"), "/src/", "/")
    }

    #[test]
    fn test_empty_literal_folder_rejected_up_front() {
        assert!(matches!(
            PathWriter::new("", WriteOptions::default()).unwrap_err(),
            Error::MissingOutputFolder
        ));
    }

    #[test]
    fn test_resolves_under_cwd() {
        let writer = PathWriter::new(
            "dist",
            WriteOptions::default().with_cwd("/work").with_mode(0o644u32),
        )
        .unwrap();
        let file = writer.resolve(source("a.txt")).unwrap();

        assert_eq!(file.path, PathBuf::from("/work/dist/a.txt"));
        assert_eq!(file.base.as_os_str(), "/work/dist/");
        assert_eq!(file.cwd, PathBuf::from("/work"));
        assert_eq!(file.stat.unwrap().mode, Some(0o644));
        assert_eq!(file.flag, Some(WriteFlag::Truncate));
    }

    #[test]
    fn test_default_cwd_is_process_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let writer = PathWriter::new("dist", WriteOptions::default()).unwrap();
        let file = writer.resolve(source("nested/a.txt")).unwrap();

        assert_eq!(file.path, cwd.join("dist/nested/a.txt"));
        assert_eq!(file.cwd, cwd);
        assert_eq!(file.relative().unwrap(), PathBuf::from("nested/a.txt"));
    }

    #[test]
    fn test_mode_defaults_to_existing_stat() {
        let writer = PathWriter::new("/out", WriteOptions::default()).unwrap();

        let with_stat = source("a.txt").with_stat(Stat::default().with_kind(FileKind::File).with_mode(0o100600));
        let file = writer.resolve(with_stat).unwrap();
        let stat = file.stat.unwrap();
        assert_eq!(stat.mode, Some(0o100600));
        assert_eq!(stat.kind, FileKind::File);

        let file = writer.resolve(source("b.txt")).unwrap();
        assert_eq!(file.stat, Some(Stat::default()));
    }

    #[test]
    fn test_overwrite_false_is_exclusive() {
        let writer = PathWriter::new("/out", WriteOptions::default().with_overwrite(false)).unwrap();
        let file = writer.resolve(source("a.txt")).unwrap();
        assert_eq!(file.flag, Some(WriteFlag::Exclusive));
    }

    #[test]
    fn test_absolute_out_folder_ignores_cwd() {
        let writer = PathWriter::new("/abs/out/", WriteOptions::default().with_cwd("/work")).unwrap();
        let file = writer.resolve(source("a.txt")).unwrap();
        assert_eq!(file.path, PathBuf::from("/abs/out/a.txt"));
        assert_eq!(file.base.as_os_str(), "/abs/out/");
    }

    #[test]
    fn test_computed_options() {
        let writer = PathWriter::new(
            Resolvable::computed(|file: &FileDescriptor| {
                let ext = file.path.extension()?.to_string_lossy().into_owned();
                Some(PathBuf::from(ext))
            }),
            WriteOptions::default()
                .with_cwd("/work")
                .with_mode(Resolvable::<u32>::computed(|file: &FileDescriptor| {
                    file.path.ends_with("run.sh").then_some(0o755)
                }))
                .with_overwrite(Resolvable::<bool>::computed(|file: &FileDescriptor| {
                    Some(file.path.extension().is_some_and(|ext| ext != "lock"))
                })),
        )
        .unwrap();

        let script = writer.resolve(source("run.sh")).unwrap();
        assert_eq!(script.path, PathBuf::from("/work/sh/run.sh"));
        assert_eq!(script.stat.unwrap().mode, Some(0o755));
        assert_eq!(script.flag, Some(WriteFlag::Truncate));

        let lock = writer.resolve(source("deps.lock")).unwrap();
        assert_eq!(lock.path, PathBuf::from("/work/lock/deps.lock"));
        assert_eq!(lock.stat.unwrap().mode, None);
        assert_eq!(lock.flag, Some(WriteFlag::Exclusive));
    }

    #[test]
    fn test_empty_computed_folder_is_error() {
        let writer = PathWriter::new(
            Resolvable::computed(|_: &FileDescriptor| Some(PathBuf::new())),
            WriteOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            writer.resolve(source("a.txt")).unwrap_err(),
            Error::InvalidOutputFolder
        ));

        let writer = PathWriter::new(
            Resolvable::<PathBuf>::computed(|_: &FileDescriptor| None),
            WriteOptions::default(),
        )
        .unwrap();
        assert!(writer.resolve(source("a.txt")).is_err());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let writer = PathWriter::new("dist", WriteOptions::default().with_cwd("/work")).unwrap();
        let once = writer.resolve(source("a/b.txt")).unwrap();
        let again = writer.resolve(source("a/b.txt")).unwrap();
        assert_eq!(once, again);

        let twice = writer.resolve(once.clone()).unwrap();
        assert_eq!(twice.path, once.path);
        assert_eq!(twice.base, once.base);
        assert_eq!(twice.flag, once.flag);
    }

    #[test]
    fn test_base_has_single_trailing_separator() {
        for folder in ["dist", "dist/", "dist//", "./dist/."] {
            let writer = PathWriter::new(folder, WriteOptions::default().with_cwd("/work")).unwrap();
            let file = writer.resolve(source("a.txt")).unwrap();
            assert_eq!(file.base.as_os_str(), "/work/dist/");
            assert!(file.path.starts_with(Path::new("/work/dist")));
        }
    }

    #[test]
    fn test_path_equal_to_base_is_rejected() {
        let writer = PathWriter::new("dist", WriteOptions::default().with_cwd("/work")).unwrap();
        let err = writer
            .resolve(FileDescriptor::new("/src", "/src/", "/"))
            .unwrap_err();
        assert!(matches!(err, Error::PathOutsideBase { .. }));
    }

    #[tokio::test]
    async fn test_pipe_halts_on_error() {
        let writer = PathWriter::new(
            Resolvable::computed(|file: &FileDescriptor| {
                (!file.path.ends_with("bad.txt")).then(|| PathBuf::from("out"))
            }),
            WriteOptions::default().with_cwd("/work"),
        )
        .unwrap();
        let files = stream::iter(vec![Ok(source("a.txt")), Ok(source("bad.txt")), Ok(source("c.txt"))]);

        let items: Vec<_> = writer.pipe(files).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().path, PathBuf::from("/work/out/a.txt"));
        assert!(matches!(items[1], Err(Error::InvalidOutputFolder)));
    }
}
