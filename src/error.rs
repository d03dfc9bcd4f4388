//! Error types for MapChannel

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for MapChannel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or draining a channel
///
/// A polling miss is not an error: [`Channel::read`](crate::Channel::read)
/// returns `None` when no complete record is available yet.
#[derive(Debug, Error)]
pub enum Error {
    /// A rendezvous file was absent or unopenable, typically because the
    /// producer has not created it yet. Callers decide retry policy.
    #[error("channel rendezvous file '{}' is unavailable: {source}", .path.display())]
    ChannelUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to map an opened region into memory
    #[error("failed to map shared region: {0}")]
    Mmap(#[source] io::Error),

    /// A drained record did not decode as single-byte text
    #[error("record is not valid text: {0}")]
    Decode(#[from] std::str::Utf8Error),
}
