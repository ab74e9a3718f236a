//! The boundary-facing surface.
//!
//! [`DispatchFacade`] is what a transport or binding layer talks to. It
//! validates external input, delegates every operation to one
//! [`HandlerRegistry`], and reports outcomes as [`Status`] codes so that no
//! registry-internal type leaks across the boundary.

use crate::config::FacadeConfig;
use crate::status::Status;
use bytes::Bytes;
use callgate_core::{Destination, Envelope, InputError, Notify, RegistrationToken};
use callgate_std::{Courier, HandlerRegistry};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Builder for a [`DispatchFacade`].
///
/// # Example
///
/// ```rust
/// use callgate::DispatchFacade;
///
/// let facade = DispatchFacade::builder()
///     .name("bridge")
///     .synchronous()
///     .max_payload_len(4096)
///     .build()
///     .unwrap();
/// assert_eq!(facade.registry().name(), "bridge");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FacadeBuilder {
    config: FacadeConfig,
}

impl FacadeBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: FacadeConfig) -> Self {
        Self { config }
    }

    /// Registry name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Deliver `send` on a background worker (the default).
    pub fn asynchronous(mut self) -> Self {
        self.config.asynchronous = true;
        self
    }

    /// Deliver `send` inline on the calling thread.
    pub fn synchronous(mut self) -> Self {
        self.config.asynchronous = false;
        self
    }

    /// Bound the delivery queue; `None` for unbounded.
    pub fn queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Largest payload accepted by `dispatch` and `send`.
    pub fn max_payload_len(mut self, limit: usize) -> Self {
        self.config.max_payload_len = limit;
        self
    }

    /// Build the facade, starting the delivery worker if asynchronous.
    pub fn build(self) -> io::Result<DispatchFacade> {
        let config = self.config;
        let registry = Arc::new(HandlerRegistry::builder().name(config.name.as_str()).build());
        let courier = if config.asynchronous {
            Some(
                Courier::builder()
                    .capacity(config.queue_capacity)
                    .spawn(registry.clone())?,
            )
        } else {
            None
        };

        Ok(DispatchFacade {
            registry,
            courier: Mutex::new(courier),
            max_payload_len: config.max_payload_len,
        })
    }
}

/// Validating, status-reporting wrapper around a [`HandlerRegistry`].
///
/// The facade keeps no registration state of its own. Dropping it shuts the
/// registry down.
#[derive(Debug)]
pub struct DispatchFacade {
    registry: Arc<HandlerRegistry>,
    courier: Mutex<Option<Courier>>,
    max_payload_len: usize,
}

impl DispatchFacade {
    /// Build a facade with default settings.
    pub fn new() -> io::Result<Self> {
        FacadeBuilder::new().build()
    }

    /// Start building a facade.
    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::new()
    }

    /// Build a facade from a configuration snapshot.
    pub fn from_config(config: FacadeConfig) -> io::Result<Self> {
        FacadeBuilder::from_config(config).build()
    }

    /// The registry behind this facade.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Register `handler` for `destination`.
    pub fn register<N: Notify>(
        &self,
        destination: &str,
        handler: N,
    ) -> Result<RegistrationToken, Status> {
        self.register_shared(destination, Arc::new(handler))
    }

    /// Register an already shared handler.
    pub fn register_shared(
        &self,
        destination: &str,
        handler: Arc<dyn Notify>,
    ) -> Result<RegistrationToken, Status> {
        let destination = self.destination(destination)?;
        self.registry
            .register_shared(destination, handler)
            .map_err(|err| Status::from(&err))
    }

    /// Cancel a registration. No invocation starts after this returns.
    pub fn cancel(&self, token: RegistrationToken) -> Status {
        match self.registry.cancel(token) {
            Ok(()) => Status::Ok,
            Err(err) => Status::from(&err),
        }
    }

    /// Cancel a registration and wait for invocations still running on other
    /// threads. After [`Status::Ok`] the handler's resources may be freed.
    pub fn cancel_and_drain(&self, token: RegistrationToken) -> Status {
        match self.registry.cancel_and_drain(token) {
            Ok(()) => Status::Ok,
            Err(err) => Status::from(&err),
        }
    }

    /// [`cancel_and_drain`](Self::cancel_and_drain) for a token carried as a
    /// raw integer. `0` is never issued and reports [`Status::UnknownToken`].
    pub fn cancel_raw(&self, raw: u64) -> Status {
        match self.token_from_raw(raw) {
            Some(token) => self.cancel_and_drain(token),
            None => Status::UnknownToken,
        }
    }

    /// Pair a raw token value with this facade's registry.
    pub fn token_from_raw(&self, raw: u64) -> Option<RegistrationToken> {
        RegistrationToken::from_raw(self.registry.id(), raw)
    }

    /// Deliver a message synchronously to every live handler of
    /// `destination`, returning how many were invoked.
    pub fn dispatch(
        &self,
        destination: &str,
        source: &str,
        payload: &[u8],
    ) -> Result<usize, Status> {
        self.destination(destination)?;
        self.check_len(payload.len())?;
        Ok(self.registry.dispatch(destination, source, payload))
    }

    /// [`dispatch`](Self::dispatch) for callers that pass a buffer together
    /// with a separately declared, signed length. Only the first
    /// `declared_len` bytes of `buffer` are delivered.
    pub fn dispatch_declared(
        &self,
        destination: &str,
        source: &str,
        buffer: &[u8],
        declared_len: i64,
    ) -> Result<usize, Status> {
        let payload = declared_payload(buffer, declared_len).map_err(|err| self.reject(err))?;
        self.dispatch(destination, source, payload)
    }

    /// Queue a message for asynchronous delivery.
    ///
    /// Returns once the message is queued; handlers run later on the
    /// delivery worker. A synchronously configured facade delivers inline.
    pub fn send(&self, destination: &str, source: &str, payload: impl Into<Bytes>) -> Status {
        let payload = payload.into();
        let destination = match self.destination(destination) {
            Ok(destination) => destination,
            Err(status) => return status,
        };
        if let Err(status) = self.check_len(payload.len()) {
            return status;
        }
        if self.registry.is_closed() {
            return Status::Closed;
        }

        let courier = self.courier.lock();
        match courier.as_ref() {
            Some(courier) => match courier.post(Envelope::new(destination, source, payload)) {
                Ok(()) => Status::Ok,
                Err(err) => {
                    tracing::debug!(registry = %self.registry.id(), error = %err, "send refused");
                    Status::from(&err)
                }
            },
            None => {
                drop(courier);
                self.registry.dispatch(&destination, source, &payload);
                Status::Ok
            }
        }
    }

    /// Cancel every registration, refuse new ones, and stop the delivery
    /// worker once it has drained its queue. Idempotent.
    pub fn shutdown_all(&self) {
        self.registry.shutdown_all();
        self.stop_courier();
    }

    /// [`shutdown_all`](Self::shutdown_all), then wait for invocations still
    /// running on other threads.
    pub fn shutdown_and_drain(&self) {
        self.registry.shutdown_and_drain();
        self.stop_courier();
    }

    /// Largest payload accepted by `dispatch` and `send`.
    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// Whether the facade has been shut down.
    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }

    fn stop_courier(&self) {
        // Take it out first: joining while holding the lock would block a
        // handler on the worker that calls `send`.
        let courier = self.courier.lock().take();
        if let Some(mut courier) = courier {
            courier.shutdown();
        }
    }

    fn destination(&self, destination: &str) -> Result<Destination, Status> {
        Destination::new(destination).map_err(|err| self.reject(err))
    }

    fn check_len(&self, len: usize) -> Result<(), Status> {
        if len > self.max_payload_len {
            return Err(self.reject(InputError::PayloadTooLarge {
                len,
                limit: self.max_payload_len,
            }));
        }
        Ok(())
    }

    fn reject(&self, err: InputError) -> Status {
        tracing::warn!(registry = %self.registry.id(), error = %err, "input rejected");
        Status::from(&err)
    }
}

impl Drop for DispatchFacade {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// Trim `buffer` to a declared length, rejecting negative or overlong values.
pub fn declared_payload(buffer: &[u8], declared_len: i64) -> Result<&[u8], InputError> {
    let Ok(len) = u64::try_from(declared_len) else {
        return Err(InputError::NegativeLength(declared_len));
    };
    match usize::try_from(len) {
        Ok(len) if len <= buffer.len() => Ok(&buffer[..len]),
        _ => Err(InputError::LengthExceedsBuffer {
            declared: len,
            available: buffer.len(),
        }),
    }
}
