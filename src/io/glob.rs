//! Glob enumeration producing match descriptors
//!
//! Patterns are validated and compiled up front, so a bad argument fails
//! before any I/O. The walk itself runs on a blocking task and feeds a
//! bounded channel: when the consumer stops pulling, the walk stops too.
//!
//! Each pattern is split at its glob parent, the longest leading run of
//! segments without wildcards. The parent becomes the match `base` and the
//! remainder is matched against paths relative to it.

use crate::core::{path, MatchDescriptor};
use crate::error::{Error, Result};
use futures::stream::{self, BoxStream, StreamExt};
use globset::{GlobBuilder, GlobMatcher};
use log::{debug, trace};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// A stream of raw glob matches
pub type MatchStream = BoxStream<'static, Result<MatchDescriptor>>;

/// One or more glob patterns; a leading `!` negates a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobSpec(Vec<String>);

impl GlobSpec {
    pub fn patterns(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for GlobSpec {
    fn from(pattern: &str) -> Self {
        Self(vec![pattern.to_string()])
    }
}

impl From<String> for GlobSpec {
    fn from(pattern: String) -> Self {
        Self(vec![pattern])
    }
}

impl From<Vec<String>> for GlobSpec {
    fn from(patterns: Vec<String>) -> Self {
        Self(patterns)
    }
}

impl From<Vec<&str>> for GlobSpec {
    fn from(patterns: Vec<&str>) -> Self {
        Self(patterns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for GlobSpec {
    fn from(patterns: &[&str]) -> Self {
        Self(patterns.iter().map(|p| p.to_string()).collect())
    }
}

/// Options for the glob enumerator
#[derive(Debug, Clone, Default)]
pub struct GlobOptions {
    /// Directory relative patterns resolve against (default: process cwd)
    pub cwd: Option<PathBuf>,
    /// Override the `base` of every match
    pub base: Option<PathBuf>,
    /// Match entries whose names start with `.`
    pub dot: bool,
    /// Do not fail when a pattern without wildcards matches nothing
    pub allow_empty: bool,
}

impl GlobOptions {
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    /// Absolute glob parent
    parent: PathBuf,
    /// Remainder matched against paths relative to `parent`; `None` when the
    /// pattern has no wildcards
    matcher: Option<GlobMatcher>,
    /// Number of segments in the remainder, `None` when it contains `**`
    depth: Option<usize>,
    /// The remainder names dot entries explicitly
    wants_dot: bool,
    /// Full path for a pattern without wildcards
    literal: PathBuf,
}

impl CompiledPattern {
    fn compile(source: &str, cwd: &Path) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::invalid_glob("pattern must not be empty"));
        }

        let normalized = if cfg!(windows) {
            source.replace('\\', "/")
        } else {
            source.to_string()
        };
        let segments: Vec<&str> = normalized.split('/').collect();
        let split = segments
            .iter()
            .position(|segment| is_magic(segment))
            .unwrap_or(segments.len());
        let literal = path::resolve(cwd, Path::new(source));

        if split == segments.len() {
            let parent = literal.parent().map(Path::to_path_buf).unwrap_or_else(|| literal.clone());
            return Ok(Self {
                source: source.to_string(),
                parent,
                matcher: None,
                depth: Some(1),
                wants_dot: true,
                literal,
            });
        }

        let parent_text = segments[..split].join("/");
        let parent = if parent_text.is_empty() && normalized.starts_with('/') {
            PathBuf::from("/")
        } else {
            path::resolve(cwd, Path::new(&parent_text))
        };

        let rest: Vec<&str> = segments[split..]
            .iter()
            .copied()
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        let depth = if rest.iter().any(|segment| segment.contains("**")) {
            None
        } else {
            Some(rest.len())
        };
        let wants_dot = rest.iter().any(|segment| segment.starts_with('.'));

        let matcher = GlobBuilder::new(&rest.join("/"))
            .literal_separator(true)
            .build()
            .map_err(|err| Error::invalid_glob(format!("{source:?}: {err}")))?
            .compile_matcher();

        Ok(Self {
            source: source.to_string(),
            parent,
            matcher: Some(matcher),
            depth,
            wants_dot,
            literal,
        })
    }

    /// Whether `candidate` (absolute) matches this pattern
    fn is_match(&self, candidate: &Path) -> bool {
        match &self.matcher {
            Some(matcher) => match candidate.strip_prefix(&self.parent) {
                Ok(relative) => matcher.is_match(slash_path(relative)),
                Err(_) => false,
            },
            None => candidate == self.literal,
        }
    }
}

fn is_magic(segment: &str) -> bool {
    segment
        .chars()
        .any(|ch| matches!(ch, '*' | '?' | '[' | ']' | '{' | '}'))
}

/// `/`-joined components, independent of the platform separator
fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|comp| match comp {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|comp| match comp {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Enumerates the matches of a [`GlobSpec`]
#[derive(Debug, Clone)]
pub struct GlobEnumerator {
    positives: Vec<CompiledPattern>,
    negatives: Vec<CompiledPattern>,
    options: GlobOptions,
}

impl GlobEnumerator {
    /// Validate and compile `spec`
    ///
    /// Fails with an argument error when the spec is empty, a pattern is
    /// empty or malformed, or every pattern is negated.
    pub fn new(spec: impl Into<GlobSpec>, options: GlobOptions) -> Result<Self> {
        let spec = spec.into();
        if spec.patterns().is_empty() {
            return Err(Error::invalid_glob("at least one pattern is required"));
        }

        let cwd = match &options.cwd {
            Some(cwd) => path::absolute(cwd),
            None => std::env::current_dir(),
        }
        .map_err(|err| Error::io_path("current_dir", options.cwd.clone().unwrap_or_default(), err))?;

        let mut options = options;
        options.base = options.base.map(|base| path::resolve(&cwd, &base));

        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        for pattern in spec.patterns() {
            match pattern.strip_prefix('!') {
                Some(negated) => negatives.push(CompiledPattern::compile(negated, &cwd)?),
                None => positives.push(CompiledPattern::compile(pattern, &cwd)?),
            }
        }
        if positives.is_empty() {
            return Err(Error::invalid_glob("at least one non-negated pattern is required"));
        }

        Ok(Self {
            positives,
            negatives,
            options,
        })
    }

    /// Walk every pattern synchronously and collect the matches
    pub fn collect(&self) -> Result<Vec<MatchDescriptor>> {
        let mut matches = Vec::new();
        let mut failure = None;
        self.walk(|item| match item {
            Ok(found) => {
                matches.push(found);
                true
            }
            Err(err) => {
                failure = Some(err);
                false
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(matches),
        }
    }

    /// Stream matches from a blocking walk through a channel of `capacity`
    ///
    /// The walk starts on first poll, so this can be called outside a runtime.
    pub fn stream(self, capacity: usize) -> MatchStream {
        enum State {
            Pending(GlobEnumerator, usize),
            Running(mpsc::Receiver<Result<MatchDescriptor>>, JoinHandle<()>),
            Done,
        }

        stream::unfold(State::Pending(self, capacity), |state| async move {
            let (mut rx, handle) = match state {
                State::Pending(enumerator, capacity) => {
                    let (tx, rx) = mpsc::channel(capacity.max(1));
                    let handle = tokio::task::spawn_blocking(move || {
                        enumerator.walk(|item| tx.blocking_send(item).is_ok());
                    });
                    (rx, handle)
                }
                State::Running(rx, handle) => (rx, handle),
                State::Done => return None,
            };

            match rx.recv().await {
                Some(item) => Some((item, State::Running(rx, handle))),
                None => match handle.await {
                    Ok(()) => None,
                    Err(err) => Some((
                        Err(Error::EnumeratorStopped {
                            reason: err.to_string(),
                        }),
                        State::Done,
                    )),
                },
            }
        })
        .boxed()
    }

    /// Drive the walk, handing each result to `emit` until it returns false
    /// or an error has been emitted
    fn walk(&self, mut emit: impl FnMut(Result<MatchDescriptor>) -> bool) {
        let mut seen = HashSet::new();
        for pattern in &self.positives {
            if !self.walk_pattern(pattern, &mut seen, &mut emit) {
                return;
            }
        }
    }

    fn walk_pattern(
        &self,
        pattern: &CompiledPattern,
        seen: &mut HashSet<PathBuf>,
        emit: &mut impl FnMut(Result<MatchDescriptor>) -> bool,
    ) -> bool {
        let base = self.options.base.clone().unwrap_or_else(|| pattern.parent.clone());

        if pattern.matcher.is_none() {
            return match std::fs::symlink_metadata(&pattern.literal) {
                Ok(_) => self.offer(pattern.literal.clone(), &base, seen, emit),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    if self.options.allow_empty {
                        debug!("singular glob {:?} matched nothing", pattern.source);
                        true
                    } else {
                        emit(Err(Error::singular_glob_not_found(&pattern.literal)));
                        false
                    }
                }
                Err(err) => {
                    emit(Err(Error::io_path("lstat", &pattern.literal, err)));
                    false
                }
            };
        }

        match std::fs::symlink_metadata(&pattern.parent) {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                trace!("glob parent {} does not exist", pattern.parent.display());
                return true;
            }
            Err(err) => {
                emit(Err(Error::io_path("lstat", &pattern.parent, err)));
                return false;
            }
        }

        let skip_hidden = !self.options.dot && !pattern.wants_dot;
        let mut walker = WalkDir::new(&pattern.parent)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(depth) = pattern.depth {
            walker = walker.max_depth(depth);
        }
        let parent = pattern.parent.clone();
        let entries = walker.into_iter().filter_entry(move |entry| {
            !skip_hidden
                || entry
                    .path()
                    .strip_prefix(&parent)
                    .map(|relative| !is_hidden(relative))
                    .unwrap_or(true)
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    emit(Err(Error::Walk(err)));
                    return false;
                }
            };
            trace!("glob visit {}", entry.path().display());
            if pattern.is_match(entry.path())
                && !self.offer(entry.path().to_path_buf(), &base, seen, emit)
            {
                return false;
            }
        }
        true
    }

    fn offer(
        &self,
        candidate: PathBuf,
        base: &Path,
        seen: &mut HashSet<PathBuf>,
        emit: &mut impl FnMut(Result<MatchDescriptor>) -> bool,
    ) -> bool {
        if self.negatives.iter().any(|neg| neg.is_match(&candidate)) {
            trace!("glob excluded {}", candidate.display());
            return true;
        }
        if !seen.insert(candidate.clone()) {
            return true;
        }
        emit(Ok(MatchDescriptor::new(candidate, base)))
    }
}
