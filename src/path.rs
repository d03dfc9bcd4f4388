//! Rendezvous path derivation
//!
//! Producer and consumer are separate processes with no central registry;
//! they locate the same shared regions by deriving identical filesystem
//! paths from the channel name, the consumer's pid, and a per-user salt.
//! The template `{prefix}-{channel}-{role}{pid}-{salt}` is a bit-exact
//! contract with the producer side and must not change shape.

use std::fmt;
use std::path::PathBuf;

/// Leading component of every rendezvous file name. Must match the
/// producer's spelling exactly.
pub const PREFIX: &str = "mapchannel";

/// Which of the three rendezvous files a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The record stream, mapped read-only by the consumer
    Signal,
    /// Synchronization state shared with the producer, mapped read-write
    Lock,
    /// Startup handshake, consumed by the producer launcher
    Init,
}

impl Role {
    /// On-disk spelling of the role
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Signal => "signal",
            Role::Lock => "lock",
            Role::Init => "init",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the rendezvous path for one role of a channel.
///
/// Pure function: identical arguments always yield identical paths, on
/// both sides of the channel. `pid` is always the consumer's pid, even
/// when a forked producer runs the derivation.
pub fn derive(channel: &str, pid: u32, salt: &str, role: Role) -> PathBuf {
    std::env::temp_dir().join(format!("{PREFIX}-{channel}-{role}{pid}-{salt}"))
}

/// Per-user salt keeping concurrent users of one host from colliding.
///
/// Uniqueness on one host is the goal; this is not a security boundary.
#[cfg(unix)]
pub fn user_salt() -> String {
    rustix::process::getuid().as_raw().to_string()
}

#[cfg(not(unix))]
pub fn user_salt() -> String {
    "0".to_string()
}
