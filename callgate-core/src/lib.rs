//! # callgate-core
//!
//! Core traits and value types for the callgate callback registration protocol.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! bindings and transports that only need to name the protocol's types
//! without pulling in the registry implementation from `callgate-std`.
//!
//! # The Protocol
//!
//! A caller registers a [`Notify`] capability under a [`Destination`] and
//! receives a [`RegistrationToken`]. The library later invokes the capability
//! with a source and a payload whenever a message is dispatched to that
//! destination. Cancelling the token retires the registration for good:
//! once cancellation returns, the capability is never invoked again and the
//! caller may release whatever it references.
//!
//! - [`Notify`] - the callback capability, implemented for plain closures
//! - [`RegistrationToken`] - opaque, copyable, never reused within a registry
//! - [`Destination`] - validated, cheaply cloneable destination key
//! - [`Envelope`] - an owned message queued for later delivery
//!
//! # Error Types
//!
//! - [`CallgateError`] - Top-level error type
//! - [`CancelError`] - Cancellation outcomes other than success
//! - [`RegisterError`] - Registration failures
//! - [`InputError`] - Rejected boundary input
//! - [`PostError`] - Queued delivery failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod destination;
mod envelope;
mod error;
mod notify;
mod token;

// Re-exports
pub use destination::Destination;
pub use envelope::Envelope;
pub use error::{CallgateError, CancelError, InputError, PostError, RegisterError};
pub use notify::Notify;
pub use token::{RegistrationToken, RegistryId};
