//! Asynchronous delivery.
//!
//! A [`Courier`] owns one worker thread that drains a queue of [`Envelope`]s
//! into [`HandlerRegistry::dispatch`]. Posting never waits for a handler to
//! run. Envelopes are delivered in the order they were posted, and every
//! delivery goes through the registry, so cancellation rules apply unchanged:
//! an envelope still queued when its destination's handler is cancelled
//! reaches nobody.

use crate::registry::HandlerRegistry;
use callgate_core::{Envelope, PostError};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Builder for a [`Courier`].
#[derive(Debug, Clone, Default)]
pub struct CourierBuilder {
    capacity: Option<usize>,
    thread_name: Option<String>,
}

impl CourierBuilder {
    /// Create a builder for an unbounded courier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the queue. `post` fails with [`PostError::QueueFull`] when the
    /// queue holds this many envelopes. `None` means unbounded.
    pub fn capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Name of the worker thread. Defaults to `<registry name>-courier`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Start the worker thread.
    pub fn spawn(self, registry: Arc<HandlerRegistry>) -> io::Result<Courier> {
        let (sender, receiver) = match self.capacity {
            Some(cap) => crossbeam_channel::bounded(cap),
            None => crossbeam_channel::unbounded(),
        };
        let name = self
            .thread_name
            .unwrap_or_else(|| format!("{}-courier", registry.name()));

        let worker = thread::Builder::new()
            .name(name)
            .spawn(move || run(registry, receiver))?;

        Ok(Courier {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

fn run(registry: Arc<HandlerRegistry>, receiver: Receiver<Envelope>) {
    tracing::debug!(registry = %registry.id(), "courier started");
    // Ends once every sender is gone and the queue is empty.
    for envelope in receiver.iter() {
        registry.dispatch_envelope(&envelope);
    }
    tracing::debug!(registry = %registry.id(), "courier stopped");
}

/// Queue plus worker thread delivering envelopes to a registry.
///
/// Dropping the courier shuts it down.
#[derive(Debug)]
pub struct Courier {
    sender: Option<Sender<Envelope>>,
    worker: Option<JoinHandle<()>>,
}

impl Courier {
    /// Start a courier with default settings.
    pub fn spawn(registry: Arc<HandlerRegistry>) -> io::Result<Self> {
        CourierBuilder::new().spawn(registry)
    }

    /// Start building a courier.
    pub fn builder() -> CourierBuilder {
        CourierBuilder::new()
    }

    /// Queue an envelope for delivery. Never blocks.
    pub fn post(&self, envelope: Envelope) -> Result<(), PostError> {
        let Some(sender) = &self.sender else {
            return Err(PostError::Closed);
        };
        sender.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => PostError::QueueFull,
            TrySendError::Disconnected(_) => PostError::Closed,
        })
    }

    /// Envelopes waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    /// Whether the courier still accepts envelopes.
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Stop accepting envelopes, let the worker drain what is queued, and
    /// join it.
    ///
    /// When called from the worker thread itself (a handler shutting down
    /// its own context) the worker is detached instead of joined; it exits
    /// after the current delivery and the remaining queue.
    pub fn shutdown(&mut self) {
        self.sender.take();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            tracing::warn!("courier worker exited by panic");
        }
    }
}

impl Drop for Courier {
    fn drop(&mut self) {
        self.shutdown();
    }
}
