//! Channel lifecycle
//!
//! Opens the signal and lock regions at their derived rendezvous paths,
//! unlinks both directory entries immediately so the storage turns
//! anonymous, and drains records through the atomic reader until closed.

use crate::cleanup;
use crate::error::Result;
use log::debug;

#[cfg(unix)]
use crate::error::Error;
#[cfg(unix)]
use crate::path::{self, Role};
#[cfg(unix)]
use crate::reader::{LockHeader, Outcome, RecordReader, SeqRecordReader};
#[cfg(unix)]
use crate::region::{self, Access, MappedRegion};
#[cfg(unix)]
use std::io;

/// Scratch buffer capacity in bytes. Build-time contract: must equal the
/// producer's maximum record size, or reads truncate or stall.
pub const MAX_RECORD_BYTES: usize = 256;

#[cfg(unix)]
#[derive(Debug)]
struct Regions {
    reader: SeqRecordReader,
    // The reader points into these mappings; they drop together
    #[allow(dead_code)]
    signal: MappedRegion,
    #[allow(dead_code)]
    lock: MappedRegion,
}

/// Consumer end of one sample stream.
///
/// Owns its scratch buffer and cursor outright; two channels in one
/// process never share read state. Single consumer per channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    pid: u32,
    #[cfg(unix)]
    regions: Option<Regions>,
    scratch: [u8; MAX_RECORD_BYTES],
    cursor: u64,
}

impl Channel {
    /// Open the channel the producer published under `channel_name`.
    ///
    /// Both rendezvous paths are unlinked as soon as their files are
    /// open, before mapping: from then on the regions live exactly as
    /// long as some process holds them, and a crash leaves nothing
    /// behind. Fails with [`Error::ChannelUnavailable`] while the
    /// producer has not created the files yet.
    #[cfg(unix)]
    pub fn open(channel_name: &str) -> Result<Self> {
        let pid = std::process::id();
        let salt = path::user_salt();
        let signal_path = path::derive(channel_name, pid, &salt, Role::Signal);
        let lock_path = path::derive(channel_name, pid, &salt, Role::Lock);

        let signal_fd = region::open_region_file(&signal_path, Access::ReadOnly)?;
        let lock_fd = region::open_region_file(&lock_path, Access::ReadWrite)?;

        // Demote both files to anonymous shared memory before mapping
        region::remove_rendezvous_entry(&signal_path);
        region::remove_rendezvous_entry(&lock_path);

        let signal = MappedRegion::map(signal_fd, Access::ReadOnly)?;
        let lock = MappedRegion::map(lock_fd, Access::ReadWrite)?;
        if lock.len() < LockHeader::SIZE {
            return Err(Error::Mmap(io::Error::new(
                io::ErrorKind::InvalidData,
                "lock region too small for its header",
            )));
        }

        // SAFETY: the mappings outlive the reader inside Regions, the
        // producer lays the lock region out as a LockHeader, and this
        // channel is the only consumer of it.
        let reader = unsafe {
            let header = LockHeader::from_ptr(lock.as_ptr());
            SeqRecordReader::from_raw(header, signal.as_ptr(), signal.len())
        };

        debug!("channel '{}' established for pid {}", channel_name, pid);

        Ok(Self {
            name: channel_name.to_string(),
            pid,
            regions: Some(Regions {
                reader,
                signal,
                lock,
            }),
            scratch: [0; MAX_RECORD_BYTES],
            cursor: 0,
        })
    }

    /// Platforms without unlink-while-open mapped files get a disabled
    /// channel: construction succeeds, `read` never yields a record, and
    /// sample collection degrades to "no samples".
    #[cfg(not(unix))]
    pub fn open(channel_name: &str) -> Result<Self> {
        debug!("channel '{}' disabled on this platform", channel_name);
        Ok(Self {
            name: channel_name.to_string(),
            pid: std::process::id(),
            scratch: [0; MAX_RECORD_BYTES],
            cursor: 0,
        })
    }

    /// Pull the next complete record into the scratch buffer.
    ///
    /// `None` is the steady-state polling miss, covering an idle
    /// producer, a mid-write producer, and a closed or disabled channel
    /// alike. Pair with [`decode`](crate::decode::decode) on success.
    pub fn read(&mut self) -> Option<&[u8]> {
        #[cfg(unix)]
        {
            let regions = self.regions.as_ref()?;
            match regions
                .reader
                .try_read_record(&mut self.scratch, &mut self.cursor)
            {
                Outcome::Record => Some(&self.scratch[..]),
                Outcome::NoData => None,
            }
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    /// Release both mappings and descriptors. Idempotent; also runs on
    /// drop.
    pub fn close(&mut self) {
        #[cfg(unix)]
        if self.regions.take().is_some() {
            debug!("channel '{}' closed", self.name);
        }
    }

    /// Whether the channel can still deliver records
    pub fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.regions.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Remove leftover rendezvous files for this channel, scanning the
    /// pid window for forked producers that died without unlinking.
    pub fn cleanup(&self) {
        cleanup::remove_stale(&self.name, self.pid);
    }

    /// Name of the logical stream this channel drains
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::decode::decode;

    // Stand in for the producer: publish both rendezvous files with
    // `content` in the signal region and `write_pos` bytes committed.
    fn publish(channel: &str, content: &[u8], write_pos: u64) {
        let pid = std::process::id();
        let salt = path::user_salt();

        let signal_path = path::derive(channel, pid, &salt, Role::Signal);
        std::fs::write(&signal_path, content).unwrap();

        let mut lock_bytes = vec![0u8; LockHeader::SIZE];
        lock_bytes[8..16].copy_from_slice(&write_pos.to_ne_bytes());
        let lock_path = path::derive(channel, pid, &salt, Role::Lock);
        std::fs::write(&lock_path, &lock_bytes).unwrap();
    }

    #[test]
    fn test_open_without_producer_fails() {
        let err = Channel::open("chan-test-absent").unwrap_err();
        assert!(matches!(err, Error::ChannelUnavailable { .. }));
    }

    #[test]
    fn test_open_unlinks_rendezvous_paths() {
        let channel = "chan-test-unlink";
        publish(channel, &[0u8; 512], 0);

        let chan = Channel::open(channel).unwrap();
        assert!(chan.is_active());
        assert_eq!(chan.name(), channel);

        let pid = std::process::id();
        let salt = path::user_salt();
        assert!(!path::derive(channel, pid, &salt, Role::Signal).exists());
        assert!(!path::derive(channel, pid, &salt, Role::Lock).exists());
    }

    #[test]
    fn test_fresh_channel_reads_none() {
        let channel = "chan-test-idle";
        publish(channel, &[0u8; 512], 0);

        let mut chan = Channel::open(channel).unwrap();
        assert!(chan.read().is_none());
        assert!(chan.read().is_none());
    }

    #[test]
    fn test_drains_records_in_order() {
        let channel = "chan-test-order";
        let stream = b"a\nbb\nccc\n";
        publish(channel, stream, stream.len() as u64);

        let mut chan = Channel::open(channel).unwrap();
        for expected in ["a", "bb", "ccc"] {
            let record = chan.read().expect("record should be available");
            assert_eq!(decode(record).unwrap(), expected);
        }
        assert!(chan.read().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let channel = "chan-test-close";
        publish(channel, &[0u8; 64], 0);

        let mut chan = Channel::open(channel).unwrap();
        chan.close();
        chan.close();
        assert!(!chan.is_active());
        assert!(chan.read().is_none());
    }

    #[test]
    fn test_cleanup_after_close_is_quiet() {
        let channel = "chan-test-teardown";
        publish(channel, &[0u8; 64], 0);

        let mut chan = Channel::open(channel).unwrap();
        chan.close();
        chan.cleanup();
    }
}
