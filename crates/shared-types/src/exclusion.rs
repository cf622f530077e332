//! # Exclusion Flag
//!
//! The single process-wide token guarding both mining and block-import
//! execution. Acquisition is a compare-and-swap, never a lock that could be
//! held across a suspension point; release happens on guard drop, so every
//! exit path (including timeouts and early returns) frees the token.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-holder exclusion token (0 = idle, 1 = busy).
///
/// At most one [`ExclusionGuard`] exists at any instant. `try_acquire` never
/// blocks: contenders observe `None` immediately and are expected to fail
/// fast rather than queue.
#[derive(Debug, Default)]
pub struct ExclusionFlag {
    busy: AtomicBool,
}

impl ExclusionFlag {
    /// Create an idle flag.
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Attempt to take the token. Returns `None` immediately when busy.
    pub fn try_acquire(&self) -> Option<ExclusionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExclusionGuard { flag: self })
    }

    /// Whether the token is currently held.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// RAII guard for [`ExclusionFlag`]; releases the token when dropped.
#[derive(Debug)]
pub struct ExclusionGuard<'a> {
    flag: &'a ExclusionFlag,
}

impl Drop for ExclusionGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}
