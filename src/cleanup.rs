//! Best-effort reclamation of leftover rendezvous files
//!
//! `open` unlinks the files it uses, but a producer forked from the
//! consumer gets a nearby pid and may die before unlinking its own, and
//! a crash before `open` leaves all three behind. Scanning a small pid
//! window catches both. Housekeeping only: nothing here may fail the
//! caller.

use crate::path::{self, Role};
use log::debug;
use std::io;

/// How many consecutive pids after the consumer's to scan. Covers forked
/// descendants without assuming a particular process model.
pub const PID_SCAN_WINDOW: u32 = 30;

/// Remove leftover `signal` and `init` files for `channel` around `pid`.
///
/// Missing files are the expected case and are ignored; any other
/// filesystem error is logged and swallowed.
pub fn remove_stale(channel: &str, pid: u32) {
    let salt = path::user_salt();
    for offset in 0..PID_SCAN_WINDOW {
        let candidate = pid.saturating_add(offset);
        for role in [Role::Init, Role::Signal] {
            let target = path::derive(channel, candidate, &salt, role);
            match std::fs::remove_file(&target) {
                Ok(()) => debug!("removed stale rendezvous file {}", target.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!("could not remove {}: {}", target.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_is_quiet() {
        // Nothing exists for this channel at any offset in the window
        remove_stale("cleanup-test-absent", 1);
    }

    #[test]
    fn test_removes_files_in_window() {
        let channel = "cleanup-test-window";
        let pid = std::process::id();
        let salt = path::user_salt();

        // A forked producer three pids along died without unlinking
        let init = path::derive(channel, pid + 3, &salt, Role::Init);
        let signal = path::derive(channel, pid + 3, &salt, Role::Signal);
        std::fs::write(&init, b"x").unwrap();
        std::fs::write(&signal, b"x").unwrap();

        remove_stale(channel, pid);

        assert!(!init.exists());
        assert!(!signal.exists());
    }

    #[test]
    fn test_leaves_files_outside_window() {
        let channel = "cleanup-test-outside";
        let pid = std::process::id();
        let salt = path::user_salt();

        let signal = path::derive(channel, pid + PID_SCAN_WINDOW, &salt, Role::Signal);
        std::fs::write(&signal, b"x").unwrap();

        remove_stale(channel, pid);

        assert!(signal.exists());
        std::fs::remove_file(&signal).unwrap();
    }
}
