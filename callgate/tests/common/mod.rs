#![allow(dead_code)]

use callgate::{HandlerRegistry, Notify, RegistrationToken};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Test Handlers
// ============================================================================

/// Pushes its id into a shared log on every invocation.
pub struct OrderRecordingNotify {
    pub id: usize,
    pub order: Arc<Mutex<Vec<usize>>>,
}

impl Notify for OrderRecordingNotify {
    fn notify(&self, _source: &str, _payload: &[u8]) {
        self.order.lock().unwrap().push(self.id);
    }
}

/// Cancels a token (usually its own) from inside the callback.
pub struct CancellingNotify {
    pub registry: Arc<HandlerRegistry>,
    pub target: Arc<Mutex<Option<RegistrationToken>>>,
    pub calls: Arc<AtomicUsize>,
}

impl Notify for CancellingNotify {
    fn notify(&self, _source: &str, _payload: &[u8]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = *self.target.lock().unwrap() {
            let _ = self.registry.cancel_and_drain(token);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn shared_registry() -> Arc<HandlerRegistry> {
    Arc::new(HandlerRegistry::builder().name("test").build())
}

pub fn order_log() -> Arc<Mutex<Vec<usize>>> {
    Arc::new(Mutex::new(Vec::new()))
}
