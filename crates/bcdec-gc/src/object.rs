//! GC object header

use std::sync::atomic::{AtomicU8, Ordering};

/// Liveness state of a heap object, as seen by a generational collector
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Reachable in the current cycle
    Live = 0,
    /// Scheduled for reclamation unless resurrected first
    Condemned = 1,
}

/// GC object header
#[repr(C)]
pub struct GcHeader {
    /// Liveness bits
    state: AtomicU8,
}

impl GcHeader {
    /// Create a header for a freshly allocated (live) object
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Liveness::Live as u8),
        }
    }

    /// Current liveness
    pub fn liveness(&self) -> Liveness {
        match self.state.load(Ordering::Acquire) {
            0 => Liveness::Live,
            _ => Liveness::Condemned,
        }
    }

    /// Whether the object is condemned
    #[inline]
    pub fn is_condemned(&self) -> bool {
        self.liveness() == Liveness::Condemned
    }

    /// Mark the object as condemned
    pub fn condemn(&self) {
        self.state.store(Liveness::Condemned as u8, Ordering::Release);
    }

    /// Flip a condemned object back to live.
    ///
    /// Returns `true` if the object was condemned.
    pub fn resurrect(&self) -> bool {
        self.state
            .compare_exchange(
                Liveness::Condemned as u8,
                Liveness::Live as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for GcHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GcHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcHeader")
            .field("liveness", &self.liveness())
            .finish()
    }
}
