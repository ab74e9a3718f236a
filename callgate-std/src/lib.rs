//! # callgate-std
//!
//! Standard implementations for the callgate callback registration protocol.
//!
//! This crate provides:
//! - **Registry**: [`HandlerRegistry`], the owner of all registrations
//! - **Asynchronous delivery**: [`Courier`], a queue plus worker thread
//! - **Testing doubles**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use callgate_core;

// Modules
pub mod courier;
pub mod registry;
pub mod testing;

pub use courier::{Courier, CourierBuilder};
pub use registry::{HandlerRegistry, RegistryBuilder};
