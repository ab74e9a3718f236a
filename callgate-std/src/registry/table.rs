//! Storage behind the registry lock.

use super::gate::Gate;
use callgate_core::{
    CancelError, Destination, Notify, RegisterError, RegistrationToken, RegistryId,
};
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

/// One registration: the caller's handler plus the gate that retires it.
pub(crate) struct HandlerEntry {
    pub(crate) token: RegistrationToken,
    pub(crate) destination: Destination,
    pub(crate) handler: Arc<dyn Notify>,
    pub(crate) gate: Gate,
}

impl Drop for HandlerEntry {
    fn drop(&mut self) {
        tracing::trace!(
            token = %self.token,
            destination = %self.destination,
            "handler entry released"
        );
    }
}

/// Live entries indexed by destination (for dispatch) and by serial (for cancel).
pub(crate) struct Table {
    /// `None` once `u64::MAX` has been issued.
    next_serial: Option<NonZeroU64>,
    closed: bool,
    routes: HashMap<Destination, Vec<Arc<HandlerEntry>>>,
    tokens: HashMap<NonZeroU64, Destination>,
}

impl Table {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            next_serial: Some(NonZeroU64::MIN),
            closed: false,
            routes: HashMap::with_capacity(capacity),
            tokens: HashMap::with_capacity(capacity),
        }
    }

    #[cfg(test)]
    fn starting_at(serial: NonZeroU64) -> Self {
        Self {
            next_serial: Some(serial),
            ..Self::with_capacity(0)
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn contains(&self, serial: NonZeroU64) -> bool {
        self.tokens.contains_key(&serial)
    }

    pub(crate) fn count_for(&self, destination: &str) -> usize {
        self.routes.get(destination).map_or(0, Vec::len)
    }

    pub(crate) fn destinations(&self) -> Vec<Destination> {
        self.routes.keys().cloned().collect()
    }

    /// Store a new live entry and mint its token.
    pub(crate) fn insert(
        &mut self,
        registry: RegistryId,
        destination: Destination,
        handler: Arc<dyn Notify>,
    ) -> Result<RegistrationToken, RegisterError> {
        if self.closed {
            return Err(RegisterError::Closed);
        }

        let Some(serial) = self.next_serial else {
            return Err(RegisterError::TokensExhausted);
        };
        self.next_serial = serial.checked_add(1);
        let token = RegistrationToken::new(registry, serial);

        let entry = Arc::new(HandlerEntry {
            token,
            destination: destination.clone(),
            handler,
            gate: Gate::new(token),
        });
        self.tokens.insert(serial, destination.clone());
        self.routes.entry(destination).or_default().push(entry);
        Ok(token)
    }

    /// Detach a live entry from both indexes and close its gate.
    ///
    /// The gate is closed before the table lock is released, so a concurrent
    /// cancel of the same token that observes `AlreadyCancelled` can rely on
    /// the handler already being retired.
    pub(crate) fn remove(
        &mut self,
        token: RegistrationToken,
    ) -> Result<Arc<HandlerEntry>, CancelError> {
        let serial = token.serial();
        let Some(destination) = self.tokens.remove(&serial) else {
            return Err(if self.next_serial.is_none_or(|next| serial < next) {
                CancelError::AlreadyCancelled(token)
            } else {
                CancelError::UnknownToken(token)
            });
        };

        let Some(entries) = self.routes.get_mut(&destination) else {
            return Err(CancelError::AlreadyCancelled(token));
        };
        let Some(pos) = entries.iter().position(|e| e.token == token) else {
            return Err(CancelError::AlreadyCancelled(token));
        };
        // `remove` keeps the remaining entries in registration order.
        let entry = entries.remove(pos);
        if entries.is_empty() {
            self.routes.remove(&destination);
        }

        entry.gate.close();
        Ok(entry)
    }

    /// Clone out the live entries for a destination, in registration order.
    pub(crate) fn snapshot(&self, destination: &str) -> Vec<Arc<HandlerEntry>> {
        self.routes.get(destination).cloned().unwrap_or_default()
    }

    /// Mark the table closed and detach every entry, closing each gate.
    pub(crate) fn close_all(&mut self) -> Vec<Arc<HandlerEntry>> {
        self.closed = true;
        self.tokens.clear();
        let entries: Vec<_> = self.routes.drain().flat_map(|(_, entries)| entries).collect();
        for entry in &entries {
            entry.gate.close();
        }
        entries
    }
}
