//! Testing utilities for callgate.
//!
//! Ready-made [`Notify`] implementations for exercising registries and
//! facades in tests. Each is cheap to clone and clones share state, so keep
//! one clone for assertions and register the other.
//!
//! - [`RecordingNotify`]: records every `(source, payload)` it receives
//! - [`CountingNotify`]: counts invocations
//! - [`LatchNotify`]: parks inside `notify` until released, for ordering tests

use callgate_core::Notify;
use parking_lot::{Condvar, Mutex};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Recording Notify
// ============================================================================

/// A handler that records all messages it receives.
///
/// # Example
///
/// ```rust
/// use callgate_std::{registry::HandlerRegistry, testing::RecordingNotify};
///
/// let registry = HandlerRegistry::new();
/// let recorder = RecordingNotify::new();
/// registry.register("D", recorder.clone()).unwrap();
///
/// registry.dispatch("D", "S", b"hi");
/// assert_eq!(recorder.records(), vec![("S".to_string(), b"hi".to_vec())]);
/// ```
#[derive(Clone, Default)]
pub struct RecordingNotify {
    records: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingNotify {
    /// Create a new recording handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the recorded `(source, payload)` pairs.
    pub fn records(&self) -> Vec<(String, Vec<u8>)> {
        self.records.lock().clone()
    }

    /// Get the recorded payloads only.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.records.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Get the number of recorded messages.
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    /// Clear all recorded messages.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Notify for RecordingNotify {
    fn notify(&self, source: &str, payload: &[u8]) {
        self.records
            .lock()
            .push((source.to_string(), payload.to_vec()));
    }
}

// ============================================================================
// Counting Notify
// ============================================================================

/// A handler that counts invocations.
#[derive(Clone, Default)]
pub struct CountingNotify {
    count: Arc<AtomicUsize>,
}

impl CountingNotify {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Notify for CountingNotify {
    fn notify(&self, _source: &str, _payload: &[u8]) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Latch Notify
// ============================================================================

#[derive(Default)]
struct LatchState {
    entered: usize,
    released: bool,
}

#[derive(Default)]
struct LatchShared {
    state: Mutex<LatchState>,
    changed: Condvar,
}

/// A handler that blocks inside `notify` until [`release`](Self::release)
/// is called.
///
/// Lets a test hold an invocation in flight while it cancels, shuts down or
/// dispatches from another thread. Once released, later invocations pass
/// straight through.
#[derive(Clone, Default)]
pub struct LatchNotify {
    shared: Arc<LatchShared>,
}

impl LatchNotify {
    /// Create a closed latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until at least `n` invocations have entered `notify`.
    pub fn wait_entered(&self, n: usize) {
        let mut state = self.shared.state.lock();
        while state.entered < n {
            self.shared.changed.wait(&mut state);
        }
    }

    /// Let every parked and future invocation return.
    pub fn release(&self) {
        self.shared.state.lock().released = true;
        self.shared.changed.notify_all();
    }

    /// Number of invocations that have entered `notify`.
    pub fn calls(&self) -> usize {
        self.shared.state.lock().entered
    }
}

impl Notify for LatchNotify {
    fn notify(&self, _source: &str, _payload: &[u8]) {
        let mut state = self.shared.state.lock();
        state.entered += 1;
        self.shared.changed.notify_all();
        while !state.released {
            self.shared.changed.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn recording_shares_state_between_clones() {
        let recorder = RecordingNotify::new();
        let clone = recorder.clone();
        clone.notify("S", b"x");
        assert_eq!(recorder.count(), 1);
        recorder.clear();
        assert_eq!(clone.count(), 0);
    }

    #[test]
    fn counting_resets() {
        let counter = CountingNotify::new();
        counter.notify("S", b"");
        counter.notify("S", b"");
        assert_eq!(counter.count(), 2);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn latch_parks_until_released() {
        let latch = LatchNotify::new();
        let parked = {
            let latch = latch.clone();
            thread::spawn(move || latch.notify("S", b""))
        };

        latch.wait_entered(1);
        assert!(!parked.is_finished());
        latch.release();
        parked.join().unwrap();

        // Released latches no longer block.
        latch.notify("S", b"");
        assert_eq!(latch.calls(), 2);
    }
}
