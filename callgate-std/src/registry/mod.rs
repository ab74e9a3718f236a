//! Runtime handler registry.
//!
//! [`HandlerRegistry`] is the sole owner of every registration. It hands out
//! [`RegistrationToken`]s, fans dispatches out to the live handlers of a
//! destination, and retires handlers on cancellation.
//!
//! # Locking
//!
//! One `RwLock` guards the lookup tables. Dispatch holds the read lock only
//! long enough to clone out the live entries for a destination; handlers run
//! with no registry lock held, so a handler may register, cancel or dispatch
//! from inside its own callback.
//!
//! # Cancellation ordering
//!
//! Each entry has a gate that dispatch must pass before invoking the handler.
//! `cancel` closes the gate before it returns, so no invocation starts after
//! `cancel` returns. An invocation that had already started may still be
//! running; use [`HandlerRegistry::cancel_and_drain`] to also wait for it,
//! which is what a caller that frees the handler's resources needs.

mod gate;
mod table;

use callgate_core::{
    CancelError, Destination, Envelope, Notify, RegisterError, RegistrationToken, RegistryId,
};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use table::{HandlerEntry, Table};

const DEFAULT_NAME: &str = "callgate";

/// Builder for constructing a [`HandlerRegistry`].
///
/// # Example
///
/// ```rust
/// use callgate_std::registry::RegistryBuilder;
///
/// let registry = RegistryBuilder::new()
///     .name("telemetry")
///     .with_capacity(16)
///     .build();
/// assert_eq!(registry.name(), "telemetry");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    name: Option<String>,
    capacity: usize,
}

impl RegistryBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in log output and worker thread names.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pre-size the lookup tables for this many registrations.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the registry.
    pub fn build(self) -> HandlerRegistry {
        let name: Arc<str> = Arc::from(self.name.as_deref().unwrap_or(DEFAULT_NAME));
        let id = RegistryId::next();
        tracing::debug!(registry = %id, name = %name, "registry created");
        HandlerRegistry {
            id,
            name,
            table: RwLock::new(Table::with_capacity(self.capacity)),
        }
    }
}

/// Owner of all handler registrations for one context.
///
/// Share it across threads with `Arc`. Independent registries do not interact:
/// each has its own [`RegistryId`] and a token from one is unknown to another.
pub struct HandlerRegistry {
    id: RegistryId,
    name: Arc<str>,
    table: RwLock<Table>,
}

impl HandlerRegistry {
    /// Create a registry with default settings.
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Process-unique identity of this registry.
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `handler` for `destination`.
    ///
    /// The handler becomes visible to dispatch before this returns. Fails
    /// with [`RegisterError::Closed`] after [`shutdown_all`](Self::shutdown_all)
    /// and with [`RegisterError::InvalidInput`] for an empty destination.
    /// Once every serial has been issued it fails with
    /// [`RegisterError::TokensExhausted`] instead of reusing one.
    pub fn register<N: Notify>(
        &self,
        destination: impl AsRef<str>,
        handler: N,
    ) -> Result<RegistrationToken, RegisterError> {
        self.register_shared(destination, Arc::new(handler))
    }

    /// Register an already shared handler.
    ///
    /// The same handler may be registered several times, under the same or
    /// different destinations; each registration gets its own token.
    pub fn register_shared(
        &self,
        destination: impl AsRef<str>,
        handler: Arc<dyn Notify>,
    ) -> Result<RegistrationToken, RegisterError> {
        let destination = Destination::new(destination)?;
        let result = self
            .table
            .write()
            .insert(self.id, destination.clone(), handler);

        match &result {
            Ok(token) => {
                tracing::debug!(registry = %self.id, %destination, %token, "handler registered");
            }
            Err(err) => {
                tracing::debug!(
                    registry = %self.id,
                    %destination,
                    error = %err,
                    "registration refused"
                );
            }
        }
        result
    }

    /// Retire the registration named by `token`.
    ///
    /// After this returns `Ok`, no new invocation of the handler will start.
    /// An invocation that was already running when `cancel` was called may
    /// still complete.
    pub fn cancel(&self, token: RegistrationToken) -> Result<(), CancelError> {
        self.retire(token).map(|_| ())
    }

    /// Like [`cancel`](Self::cancel), then wait until every invocation of the
    /// handler that is still running on another thread has returned.
    ///
    /// After this returns `Ok` the registry holds no reference to the handler
    /// that it could still act on, so the caller may free whatever the handler
    /// points at. Called from inside the handler's own callback, it does not
    /// wait for that callback.
    pub fn cancel_and_drain(&self, token: RegistrationToken) -> Result<(), CancelError> {
        let entry = self.retire(token)?;
        entry.gate.wait_idle();
        Ok(())
    }

    fn retire(&self, token: RegistrationToken) -> Result<Arc<HandlerEntry>, CancelError> {
        if token.registry() != self.id {
            tracing::debug!(registry = %self.id, %token, "cancel with foreign token");
            return Err(CancelError::UnknownToken(token));
        }

        let result = self.table.write().remove(token);
        match &result {
            Ok(entry) => {
                tracing::debug!(
                    registry = %self.id,
                    destination = %entry.destination,
                    %token,
                    "handler cancelled"
                );
            }
            Err(err) => {
                tracing::debug!(registry = %self.id, error = %err, "cancel rejected");
            }
        }
        result
    }

    /// Deliver a message to every live handler registered for `destination`.
    ///
    /// Returns the number of handlers invoked. A handler that panics is
    /// counted as invoked; the panic is logged and the fan-out continues.
    pub fn dispatch(&self, destination: &str, source: &str, payload: &[u8]) -> usize {
        let snapshot = self.table.read().snapshot(destination);
        if snapshot.is_empty() {
            tracing::trace!(registry = %self.id, destination, "no handlers");
            return 0;
        }

        let mut delivered = 0;
        for entry in &snapshot {
            let Some(_pass) = entry.gate.enter() else {
                tracing::trace!(
                    registry = %self.id,
                    token = %entry.token,
                    "skipping cancelled handler"
                );
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.handler.notify(source, payload)
            }));
            if let Err(cause) = outcome {
                tracing::warn!(
                    registry = %self.id,
                    destination,
                    token = %entry.token,
                    panic = panic_message(cause.as_ref()),
                    "handler panicked"
                );
            }
            delivered += 1;
        }

        tracing::trace!(
            registry = %self.id,
            destination,
            source,
            len = payload.len(),
            delivered,
            "dispatched"
        );
        delivered
    }

    /// Dispatch an owned [`Envelope`].
    pub fn dispatch_envelope(&self, envelope: &Envelope) -> usize {
        self.dispatch(envelope.destination(), envelope.source(), envelope.payload())
    }

    /// Cancel every remaining registration and refuse new ones.
    ///
    /// Tokens issued before shutdown report
    /// [`CancelError::AlreadyCancelled`] afterwards. Calling this again is a
    /// no-op.
    pub fn shutdown_all(&self) {
        self.close_all();
    }

    /// Like [`shutdown_all`](Self::shutdown_all), then wait for every
    /// invocation still running on other threads to return.
    pub fn shutdown_and_drain(&self) {
        for entry in self.close_all() {
            entry.gate.wait_idle();
        }
    }

    fn close_all(&self) -> Vec<Arc<HandlerEntry>> {
        let mut table = self.table.write();
        let first = !table.is_closed();
        let entries = table.close_all();
        drop(table);

        if first {
            tracing::debug!(registry = %self.id, cancelled = entries.len(), "registry shut down");
        }
        entries
    }

    /// Whether [`shutdown_all`](Self::shutdown_all) has been called.
    pub fn is_closed(&self) -> bool {
        self.table.read().is_closed()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether there are no live registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live registrations for `destination`.
    pub fn handlers_for(&self, destination: &str) -> usize {
        self.table.read().count_for(destination)
    }

    /// Destinations that currently have at least one live registration.
    pub fn destinations(&self) -> Vec<Destination> {
        self.table.read().destinations()
    }

    /// Whether `token` names a live registration of this registry.
    pub fn contains(&self, token: RegistrationToken) -> bool {
        token.registry() == self.id && self.table.read().contains(token.serial())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        f.debug_struct("HandlerRegistry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("live", &table.len())
            .field("closed", &table.is_closed())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingNotify, RecordingNotify};

    #[test]
    fn register_dispatch_cancel_scenario() {
        let registry = HandlerRegistry::new();
        let recorder = RecordingNotify::new();
        let token = registry.register("D", recorder.clone()).unwrap();

        assert_eq!(registry.dispatch("D", "S", b"payload"), 1);
        assert_eq!(recorder.records(), vec![("S".to_string(), b"payload".to_vec())]);

        registry.cancel(token).unwrap();
        assert_eq!(registry.dispatch("D", "S", b"payload2"), 0);
        assert_eq!(recorder.count(), 1);

        assert_eq!(registry.cancel(token), Err(CancelError::AlreadyCancelled(token)));
    }

    #[test]
    fn empty_destination_is_invalid() {
        let registry = HandlerRegistry::new();
        let err = registry.register("", CountingNotify::new()).unwrap_err();
        assert!(matches!(err, RegisterError::InvalidInput(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn foreign_tokens_are_unknown() {
        let a = HandlerRegistry::new();
        let b = HandlerRegistry::new();
        let token = a.register("D", CountingNotify::new()).unwrap();

        assert_eq!(b.cancel(token), Err(CancelError::UnknownToken(token)));
        assert!(a.contains(token));
        assert!(!b.contains(token));
    }

    #[test]
    fn never_issued_token_is_unknown() {
        let registry = HandlerRegistry::new();
        let token = RegistrationToken::from_raw(registry.id(), 42).unwrap();
        assert_eq!(registry.cancel(token), Err(CancelError::UnknownToken(token)));
    }

    #[test]
    fn panicking_handler_does_not_stop_fanout() {
        struct Explode;

        impl Notify for Explode {
            fn notify(&self, _source: &str, _payload: &[u8]) {
                panic!("boom");
            }
        }

        let registry = HandlerRegistry::new();
        let counter = CountingNotify::new();
        registry.register("D", Explode).unwrap();
        registry.register("D", counter.clone()).unwrap();

        assert_eq!(registry.dispatch("D", "S", b""), 2);
        assert_eq!(counter.count(), 1);
        // The registry is still usable after the panic.
        assert_eq!(registry.dispatch("D", "S", b""), 2);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let registry = HandlerRegistry::builder().name("shutdown").build();
        let token = registry.register("D", CountingNotify::new()).unwrap();

        registry.shutdown_all();
        registry.shutdown_all();
        assert!(registry.is_closed());
        assert!(registry.is_empty());
        assert_eq!(registry.cancel(token), Err(CancelError::AlreadyCancelled(token)));
        assert_eq!(
            registry.register("D", CountingNotify::new()),
            Err(RegisterError::Closed)
        );
    }

    #[test]
    fn handler_can_cancel_itself() {
        let registry = Arc::new(HandlerRegistry::new());
        let slot = Arc::new(parking_lot::Mutex::new(None::<RegistrationToken>));
        let counter = CountingNotify::new();

        let inner = registry.clone();
        let inner_slot = slot.clone();
        let inner_counter = counter.clone();
        let token = registry
            .register("D", move |source: &str, payload: &[u8]| {
                inner_counter.notify(source, payload);
                if let Some(token) = *inner_slot.lock() {
                    // Draining from inside the callback must not wait on itself.
                    inner.cancel_and_drain(token).unwrap();
                }
            })
            .unwrap();
        *slot.lock() = Some(token);

        assert_eq!(registry.dispatch("D", "S", b""), 1);
        assert_eq!(registry.dispatch("D", "S", b""), 0);
        assert_eq!(counter.count(), 1);
        assert!(!registry.contains(token));
    }

    #[test]
    fn debug_output_names_registry() {
        let registry = HandlerRegistry::builder().name("dbg").build();
        let out = format!("{registry:?}");
        assert!(out.contains("dbg"));
        assert!(out.contains("closed: false"));
    }
}
