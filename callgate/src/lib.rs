//! # callgate - Revocable Callback Registration
//!
//! `callgate` lets a caller register a destination-addressed handler, have the
//! library invoke it with message payloads, and later revoke the
//! registration. Once [`HandlerRegistry::cancel`] returns the handler is
//! never invoked again; the `*_and_drain` variants additionally wait for
//! invocations already running, after which the handler's resources may be
//! released.
//!
//! ## Quick Start
//!
//! ```rust
//! use callgate::prelude::*;
//! use callgate::testing::RecordingNotify;
//!
//! let registry = HandlerRegistry::new();
//! let recorder = RecordingNotify::new();
//! let token = registry.register("D", recorder.clone()).unwrap();
//!
//! assert_eq!(registry.dispatch("D", "S", b"hello"), 1);
//! registry.cancel(token).unwrap();
//! assert_eq!(registry.dispatch("D", "S", b"again"), 0);
//! assert_eq!(recorder.payloads(), vec![b"hello".to_vec()]);
//! ```
//!
//! Boundary callers go through [`DispatchFacade`], which validates input and
//! reports [`Status`] codes, or through the C functions in [`ffi`].

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod facade;
pub mod ffi;
pub mod logging;
pub mod status;

pub use callgate_core::{
    CallgateError, CancelError, Destination, Envelope, InputError, Notify, PostError,
    RegisterError, RegistrationToken, RegistryId,
};
pub use callgate_std::{Courier, CourierBuilder, HandlerRegistry, RegistryBuilder};

pub use config::FacadeConfig;
pub use facade::{DispatchFacade, FacadeBuilder};
pub use status::Status;

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use callgate_std::testing::*;
}

/// Prelude module - common imports for callgate.
///
/// # Usage
///
/// ```rust
/// use callgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CancelError, DispatchFacade, HandlerRegistry, Notify, RegisterError, RegistrationToken,
        Status,
    };
}
