//! Per-entry liveness gate.
//!
//! Every registered handler sits behind a [`Gate`]. Dispatch must obtain a
//! [`Pass`] before invoking the handler, and a pass is only granted while the
//! gate is open. Closing is a single flip under the gate's own lock, so once
//! `close` returns no new pass can be granted. Passes already granted stay
//! valid until dropped; [`Gate::wait_idle`] blocks until they are.

use callgate_core::RegistrationToken;
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;

thread_local! {
    // Tokens whose handler is currently running on this thread, innermost last.
    static ACTIVE: RefCell<Vec<RegistrationToken>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug)]
struct GateState {
    open: bool,
    in_flight: usize,
}

/// Open/closed flag plus a count of invocations in progress.
#[derive(Debug)]
pub(crate) struct Gate {
    token: RegistrationToken,
    state: Mutex<GateState>,
    idle: Condvar,
}

impl Gate {
    pub(crate) fn new(token: RegistrationToken) -> Self {
        Self {
            token,
            state: Mutex::new(GateState {
                open: true,
                in_flight: 0,
            }),
            idle: Condvar::new(),
        }
    }

    /// Admit one invocation, or `None` if the gate has been closed.
    pub(crate) fn enter(&self) -> Option<Pass<'_>> {
        {
            let mut state = self.state.lock();
            if !state.open {
                return None;
            }
            state.in_flight += 1;
        }
        let _ = ACTIVE.try_with(|active| active.borrow_mut().push(self.token));
        Some(Pass { gate: self })
    }

    /// Close the gate. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        std::mem::replace(&mut state.open, false)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Block until every pass granted on other threads has been dropped.
    ///
    /// Passes held further up the calling thread's own stack are not waited
    /// for: a handler cancelling its own registration would otherwise wait on
    /// itself forever.
    pub(crate) fn wait_idle(&self) {
        let own = ACTIVE
            .try_with(|active| active.borrow().iter().filter(|t| **t == self.token).count())
            .unwrap_or(0);

        let mut state = self.state.lock();
        while state.in_flight > own {
            self.idle.wait(&mut state);
        }
    }
}

/// Proof that an invocation was admitted. Dropping it ends the invocation.
pub(crate) struct Pass<'a> {
    gate: &'a Gate,
}

impl Drop for Pass<'_> {
    fn drop(&mut self) {
        let token = self.gate.token;
        let _ = ACTIVE.try_with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|t| *t == token) {
                active.remove(pos);
            }
        });

        let mut state = self.gate.state.lock();
        state.in_flight -= 1;
        // Waiters may be waiting for a non-zero floor, so wake them on every exit.
        self.gate.idle.notify_all();
    }
}
