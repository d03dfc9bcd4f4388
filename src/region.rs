//! Low-level file-backed shared memory mappings
//!
//! The rendezvous files are ordinary temp files created by the producer.
//! The consumer opens them, unlinks the directory entries, and keeps the
//! storage alive through the mapping and the open descriptor alone.

use crate::error::{Error, Result};
use log::debug;
use rustix::fd::OwnedFd;
use rustix::fs::{fstat, open, unlink, Mode, OFlags};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::io;
use std::path::Path;
use std::ptr::NonNull;

/// Access mode for a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Open an existing rendezvous file.
///
/// Failure means the producer has not created the file (yet), which is
/// the caller's signal to retry or disable sampling.
pub fn open_region_file(path: &Path, access: Access) -> Result<OwnedFd> {
    let oflags = match access {
        Access::ReadOnly => OFlags::RDONLY,
        Access::ReadWrite => OFlags::RDWR,
    };
    open(path, oflags | OFlags::CLOEXEC, Mode::empty()).map_err(|e| Error::ChannelUnavailable {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Remove a rendezvous file's directory entry once it is held open.
///
/// From here on the storage is anonymous: it survives exactly as long as
/// some process holds a descriptor or mapping, and the kernel reclaims it
/// on the last close with no stale file left behind.
pub fn remove_rendezvous_entry(path: &Path) {
    if let Err(e) = unlink(path) {
        debug!("could not unlink rendezvous file {}: {}", path.display(), e);
    }
}

/// A shared memory region mapped from an open descriptor
#[derive(Debug)]
pub struct MappedRegion {
    // Keeping the descriptor open pins the unlinked storage
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is valid for the lifetime of the value; concurrent
// producer writes are mediated by the record reader protocol, not by this
// handle.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Map the whole of an open region file into the address space
    pub fn map(fd: OwnedFd, access: Access) -> Result<Self> {
        let stat = fstat(&fd).map_err(|e| Error::Mmap(e.into()))?;
        let len = stat.st_size as usize;
        if len == 0 {
            return Err(Error::Mmap(io::Error::new(
                io::ErrorKind::InvalidData,
                "region file is empty",
            )));
        }

        let prot = match access {
            Access::ReadOnly => ProtFlags::READ,
            Access::ReadWrite => ProtFlags::READ | ProtFlags::WRITE,
        };

        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                prot,
                MapFlags::SHARED,
                &fd,
                0,
            )
            .map_err(|e| Error::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).expect("mmap returned null");

        Ok(Self { fd, addr, len })
    }

    /// Get raw pointer to the mapped region
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr()
    }

    /// Get size of the mapped region
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.len);
        }
    }
}
