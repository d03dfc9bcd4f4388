//! MapChannel - shared-memory channel for asynchronous sample streams
//!
//! A producer running in a signal-handler-like context appends small
//! newline-delimited text records to a file-backed shared region; a
//! separate consumer process polls them out without pipes, sockets, or
//! heap allocation on the producer's hot path.
//!
//! # Architecture
//!
//! - **Rendezvous by name**: both sides derive identical temp-file paths
//!   from the channel name, the consumer's pid, and a per-user salt
//! - **Anonymous after open**: the consumer unlinks both files the
//!   moment they are open, so the storage lives exactly as long as its
//!   mappings and never goes stale on disk
//! - **Record-granular atomicity**: a sequence-validated reader copies
//!   out complete records only; a record caught mid-write reads as
//!   no-data, never as truncated bytes

pub mod channel;
pub mod cleanup;
pub mod decode;
pub mod error;
pub mod path;
pub mod reader;
#[cfg(unix)]
pub mod region;

pub use channel::{Channel, MAX_RECORD_BYTES};
pub use cleanup::{remove_stale, PID_SCAN_WINDOW};
pub use decode::decode;
pub use error::{Error, Result};
pub use path::Role;
pub use reader::{LockHeader, Outcome, RecordReader, SeqRecordReader};
