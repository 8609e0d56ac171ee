//! Stream plumbing shared by both pipelines

use crate::core::FileDescriptor;
use crate::error::Result;
use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt};

/// A fallible stream of descriptors
pub type FileStream = BoxStream<'static, Result<FileDescriptor>>;

/// Default number of in-flight items per stage
pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

/// End `stream` right after its first error
///
/// The error itself is still yielded. Nothing upstream is polled again, and
/// dropping the returned stream drops whatever was in flight.
pub fn halt_on_error<S, T, E>(stream: S) -> impl Stream<Item = std::result::Result<T, E>>
where
    S: Stream<Item = std::result::Result<T, E>>,
{
    stream.scan(false, |halted, item| {
        if *halted {
            return future::ready(None);
        }
        *halted = item.is_err();
        future::ready(Some(item))
    })
}
