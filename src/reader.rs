//! Atomic record extraction
//!
//! The producer appends newline-terminated records to the signal region
//! from a signal-handler-like context; it cannot block, allocate, or do
//! unbounded work while writing. The consumer polls. The lock region
//! carries the sequence counter and positions both sides agree on, and a
//! read is valid only if the sequence was even and unchanged around the
//! copy. A record observed mid-write is reported as no-data, never as
//! truncated bytes: atomicity is record-granular.

use std::sync::atomic::{fence, AtomicU64, Ordering};

/// Result of one non-blocking read attempt.
///
/// Scratch contents and cursor are only meaningful after `Record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A complete record was copied into the scratch buffer
    Record,
    /// Nothing complete is available yet (idle producer, mid-write, or
    /// an unterminated record); poll again later
    NoData,
}

/// Synchronization state at the start of the lock region.
///
/// Layout is shared with the producer and must not change: sequence
/// counter first, then the published write position, then the consumer's
/// acknowledged read position.
#[repr(C)]
pub struct LockHeader {
    /// Odd while the producer is mid-write, even when stable
    sequence: AtomicU64,
    /// Bytes the producer has published into the signal region
    write_pos: AtomicU64,
    /// Bytes the consumer has drained; lets the producer reclaim space
    read_pos: AtomicU64,
}

impl LockHeader {
    /// Size of the header in bytes; the lock region must be at least
    /// this large.
    pub const SIZE: usize = std::mem::size_of::<LockHeader>();

    /// A fresh header with nothing published
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
            write_pos: AtomicU64::new(0),
            read_pos: AtomicU64::new(0),
        }
    }

    /// Reinterpret the start of a mapped lock region as a header.
    ///
    /// # Safety
    /// `ptr` must point to at least [`LockHeader::SIZE`] bytes of mapped
    /// memory laid out by a producer honoring this layout, valid for `'a`.
    pub unsafe fn from_ptr<'a>(ptr: *const u8) -> &'a LockHeader {
        &*(ptr as *const LockHeader)
    }

    /// Producer half: mark a write as in progress (sequence goes odd)
    pub fn begin_write(&self) {
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Producer half: publish bytes written so far and mark the write
    /// complete (sequence returns to even)
    pub fn commit_write(&self, write_pos: u64) {
        fence(Ordering::Release);
        self.write_pos.store(write_pos, Ordering::Release);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Position the consumer has acknowledged draining up to
    pub fn read_pos(&self) -> u64 {
        self.read_pos.load(Ordering::Acquire)
    }
}

impl Default for LockHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking extraction of the next complete record.
///
/// The channel is agnostic to the synchronization discipline behind this
/// trait; [`SeqRecordReader`] is the default.
pub trait RecordReader {
    /// Attempt to copy the next complete newline-terminated record at
    /// the cursor into `scratch` and advance the cursor past it.
    fn try_read_record(&self, scratch: &mut [u8], cursor: &mut u64) -> Outcome;
}

/// Sequence-validated reader over a mapped lock and signal region.
///
/// Positions are byte offsets into the signal region that only grow;
/// wrap handling, if any, is the producer's concern and shows up here as
/// a fresh channel.
#[derive(Debug)]
pub struct SeqRecordReader {
    lock: *const LockHeader,
    signal: *const u8,
    signal_len: usize,
}

// SAFETY: one consumer owns the reader; the regions it points into stay
// mapped for its lifetime and all shared fields are atomics.
unsafe impl Send for SeqRecordReader {}

impl SeqRecordReader {
    /// Create a reader from raw region pointers.
    ///
    /// # Safety
    /// - `lock` must point to a valid [`LockHeader`] that stays mapped
    ///   for the reader's lifetime
    /// - `signal` must point to `signal_len` readable bytes that stay
    ///   mapped for the reader's lifetime
    /// - at most one consumer may drive a given lock region
    pub unsafe fn from_raw(lock: *const LockHeader, signal: *const u8, signal_len: usize) -> Self {
        Self {
            lock,
            signal,
            signal_len,
        }
    }
}

impl RecordReader for SeqRecordReader {
    fn try_read_record(&self, scratch: &mut [u8], cursor: &mut u64) -> Outcome {
        let lock = unsafe { &*self.lock };

        // Sequence must be even: the producer is not mid-write
        let seq1 = lock.sequence.load(Ordering::Acquire);
        if seq1 & 1 == 1 {
            return Outcome::NoData;
        }

        let published = (lock.write_pos.load(Ordering::Acquire) as usize).min(self.signal_len);
        let start = *cursor as usize;
        if start >= published {
            return Outcome::NoData;
        }

        // Copy at most one scratch buffer's worth and validate afterwards
        let avail = (published - start).min(scratch.len());
        unsafe {
            std::ptr::copy_nonoverlapping(self.signal.add(start), scratch.as_mut_ptr(), avail);
        }
        scratch[avail..].fill(0);

        fence(Ordering::Acquire);

        // The producer moved underneath the copy: torn, retry later
        let seq2 = lock.sequence.load(Ordering::Acquire);
        if seq1 != seq2 {
            return Outcome::NoData;
        }

        // A record is only complete once its terminator is published
        let end = match scratch[..avail].iter().position(|&b| b == b'\n') {
            Some(i) => i,
            None => return Outcome::NoData,
        };

        *cursor += end as u64 + 1;
        lock.read_pos.store(*cursor, Ordering::Release);
        Outcome::Record
    }
}
