//! Per-context storage for the single pending error.
//!
//! The slot itself is reached through a [`SlotAccess`] implementation, which
//! decides what an execution context is. The default, [`ThreadLocalSlots`],
//! gives every thread its own slot per bridge instance, so the common
//! no-error path never takes a lock. Only the [`PendingLedger`] counter is
//! shared, because diagnostics read it from other threads.
//!
//! A parked error holds a weak handle to its ledger and gives its count back
//! when dropped, whether the host took it or its thread exited with it.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::fatal::{fatal, ProtocolViolation};
use crate::pending::PendingError;

/// A pending error sitting in a context's slot, counted in a [`PendingLedger`].
#[derive(Debug)]
pub struct ParkedError {
    error: Option<PendingError>,
    ledger: Weak<PendingLedger>,
}

impl ParkedError {
    fn new(error: PendingError, ledger: &Arc<PendingLedger>) -> Self {
        ledger.increment();
        Self {
            error: Some(error),
            ledger: Arc::downgrade(ledger),
        }
    }

    /// Release the error; the ledger count goes with the drop of `self`.
    pub fn into_error(mut self) -> Option<PendingError> {
        self.error.take()
    }
}

impl Drop for ParkedError {
    fn drop(&mut self) {
        if let Some(ledger) = self.ledger.upgrade() {
            ledger.decrement();
        }
    }
}

/// Access to the calling context's slot.
///
/// Implementations must keep at most one [`ParkedError`] per context and
/// must not hold anything for an empty slot.
pub trait SlotAccess: Send + Sync {
    /// Put `parked` into the calling context's slot, which the caller has emptied.
    fn park(&self, parked: ParkedError);

    /// Remove the calling context's parked error.
    fn unpark(&self) -> Option<ParkedError>;

    /// Whether the calling context's slot is occupied.
    fn is_parked(&self) -> bool;
}

static NEXT_SLOTS_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_SLOTS: RefCell<HashMap<u64, ParkedError>> = RefCell::new(HashMap::new());
}

/// One slot per thread, keyed by this instance so independent bridges never collide.
///
/// Only occupied slots have an entry. A thread that exits with an error still
/// parked drops it along with its thread-local map.
#[derive(Debug)]
pub struct ThreadLocalSlots {
    id: u64,
}

impl ThreadLocalSlots {
    pub fn new() -> Self {
        Self {
            id: NEXT_SLOTS_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for ThreadLocalSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotAccess for ThreadLocalSlots {
    fn park(&self, parked: ParkedError) {
        let displaced = THREAD_SLOTS.with(|slots| match slots.borrow_mut().entry(self.id) {
            Entry::Occupied(mut entry) => Some(entry.insert(parked)),
            Entry::Vacant(entry) => {
                entry.insert(parked);
                None
            }
        });
        // Dropped outside the borrow; its count is released.
        drop(displaced);
    }

    fn unpark(&self) -> Option<ParkedError> {
        THREAD_SLOTS.with(|slots| slots.borrow_mut().remove(&self.id))
    }

    fn is_parked(&self) -> bool {
        THREAD_SLOTS.with(|slots| slots.borrow().contains_key(&self.id))
    }
}

impl Drop for ThreadLocalSlots {
    fn drop(&mut self) {
        let _ = THREAD_SLOTS.try_with(|slots| slots.borrow_mut().remove(&self.id));
    }
}

#[cfg(test)]
fn thread_slot_entries() -> usize {
    THREAD_SLOTS.with(|slots| slots.borrow().len())
}

/// Count of errors set but not yet taken, across all contexts of one bridge.
#[derive(Debug, Default)]
pub struct PendingLedger {
    count: Mutex<usize>,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding errors. Safe to call from any thread.
    pub fn outstanding(&self) -> usize {
        *self.count.lock()
    }

    fn increment(&self) {
        *self.count.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
    }
}

/// Holder for at most one pending error per execution context.
#[derive(Debug, Default)]
pub struct ErrorSlot<A: SlotAccess = ThreadLocalSlots> {
    access: A,
    ledger: Arc<PendingLedger>,
}

impl ErrorSlot<ThreadLocalSlots> {
    pub fn new() -> Self {
        Self::with_access(ThreadLocalSlots::new())
    }
}

impl<A: SlotAccess> ErrorSlot<A> {
    pub fn with_access(access: A) -> Self {
        Self {
            access,
            ledger: Arc::new(PendingLedger::new()),
        }
    }

    /// Store `error` in the calling context's slot.
    ///
    /// The slot must be empty. An occupied slot is a fatal
    /// [`ProtocolViolation::MissedPendingError`]; the error that occupied it
    /// is removed and travels inside the violation, as in
    /// [`ErrorBridge::raise`](crate::ErrorBridge::raise).
    pub fn set(&self, error: PendingError) {
        if let Some(pending) = self.access.unpark().and_then(ParkedError::into_error) {
            fatal(ProtocolViolation::MissedPendingError {
                pending,
                raised: error,
            });
        }
        self.access.park(ParkedError::new(error, &self.ledger));
    }

    /// Remove and return the calling context's pending error, if any.
    pub fn take(&self) -> Option<PendingError> {
        if self.ledger.outstanding() == 0 {
            return None;
        }
        self.access.unpark().and_then(ParkedError::into_error)
    }

    /// Whether the calling context holds a pending error.
    pub fn is_pending(&self) -> bool {
        self.ledger.outstanding() > 0 && self.access.is_parked()
    }

    /// Pending errors across every context of this slot.
    pub fn outstanding(&self) -> usize {
        self.ledger.outstanding()
    }
}
