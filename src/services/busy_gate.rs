//! Process-wide ingestion gate
//!
//! At most one batch job may run per process. The gate is an atomic flag
//! handed out as an RAII guard: dropping the guard releases the gate, and
//! drops also run during panic unwinding, so the flag cannot stay stuck on
//! after a failed job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared single-job gate
#[derive(Debug, Clone, Default)]
pub struct BusyGate {
    held: Arc<AtomicBool>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the gate
    ///
    /// Returns None when a batch is already in flight. The compare-exchange
    /// makes acquisition atomic, so two racing callers can never both win.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                held: Arc::clone(&self.held),
            })
    }

    /// Whether a batch is currently in flight
    pub fn is_busy(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Held for the lifetime of one batch job
///
/// Moves into the job with the rest of its inputs; releasing is the drop.
#[derive(Debug)]
pub struct BusyGuard {
    held: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
