//! Filesystem-facing pipeline stages
//!
//! - [`glob`]: glob enumeration producing match descriptors
//! - [`reader`]: read normalization (stat, symlink resolution, `since` filter)
//! - [`writer`]: write target resolution
//! - [`fs`]: the filesystem seam the reader runs on

pub mod fs;
pub mod glob;
pub mod reader;
pub mod stream;
pub mod writer;

pub use fs::{FileSystem, LocalFs};
pub use glob::{GlobEnumerator, GlobOptions, GlobSpec, MatchStream};
pub use reader::{FileReader, ReadOptions, MAX_SYMLINK_HOPS};
pub use stream::{halt_on_error, FileStream, DEFAULT_HIGH_WATER_MARK};
pub use writer::{PathWriter, ResolvedWriteOptions, WriteOptions};
