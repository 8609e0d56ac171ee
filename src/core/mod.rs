//! Core types shared by both pipelines
//!
//! - FileDescriptor: the unit moved between stages
//! - Stat: metadata snapshot attached to descriptors
//! - Resolvable: option values that may depend on the file
//! - path: lexical path helpers

pub mod config;
pub mod file;
pub mod path;
pub mod stat;

pub use config::{resolve, resolve_or, resolve_required, Coerce, Resolvable, Timestamp};
pub use file::{FileDescriptor, MatchDescriptor, WriteFlag};
pub use stat::{FileKind, Stat};
