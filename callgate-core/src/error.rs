//! Error types for callgate.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`CallgateError`] - Top-level error type for all callgate operations
//! - [`CancelError`] - Why a cancellation did not retire a live entry
//! - [`RegisterError`] - Why a registration was refused
//! - [`InputError`] - Malformed input from the caller
//! - [`PostError`] - Why a message could not be queued
//!
//! Every variant is recoverable. None of them leaves the registry in a
//! partially updated state.

use crate::token::RegistrationToken;
use thiserror::Error;

/// Top-level error type for all callgate operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallgateError {
    /// A cancellation was rejected.
    #[error("cancel error: {0}")]
    Cancel(#[from] CancelError),

    /// A registration was rejected.
    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    /// Caller input failed validation.
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    /// A message could not be queued.
    #[error("post error: {0}")]
    Post(#[from] PostError),
}

/// Outcomes of `cancel` other than success.
///
/// Both are safe to retry or ignore. Neither means the handler may still be
/// invoked: an unknown token never had a handler in this registry, and an
/// already-cancelled token's handler is already retired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelError {
    /// The token was never issued by this registry.
    #[error("token {0} was never issued by this registry")]
    UnknownToken(RegistrationToken),

    /// The token's registration was already cancelled (directly or by shutdown).
    #[error("token {0} was already cancelled")]
    AlreadyCancelled(RegistrationToken),
}

impl CancelError {
    /// The token the failed cancellation referred to.
    pub fn token(&self) -> RegistrationToken {
        match self {
            CancelError::UnknownToken(token) | CancelError::AlreadyCancelled(token) => *token,
        }
    }
}

/// Errors that can occur during registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The registry has been shut down.
    #[error("registry has been shut down")]
    Closed,

    /// The registration input was malformed.
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    /// Every token serial has been issued; serials are never reused.
    #[error("registration tokens exhausted")]
    TokensExhausted,
}

/// Malformed input rejected at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The destination string was empty.
    #[error("destination must not be empty")]
    EmptyDestination,

    /// A required pointer argument was null.
    #[error("required argument `{0}` was null")]
    NullPointer(&'static str),

    /// A string argument was not valid UTF-8.
    #[error("argument `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A declared payload length was negative.
    #[error("payload length {0} is negative")]
    NegativeLength(i64),

    /// A declared payload length exceeds the bytes actually supplied.
    #[error("payload length {declared} exceeds the {available} bytes supplied")]
    LengthExceedsBuffer {
        /// Length the caller declared.
        declared: u64,
        /// Bytes actually available.
        available: usize,
    },

    /// The payload is larger than the configured maximum.
    #[error("payload of {len} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Payload size.
        len: usize,
        /// Configured maximum.
        limit: usize,
    },
}

/// Errors that can occur when queueing a message for delivery.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    /// The delivery queue has been shut down.
    #[error("delivery queue has been shut down")]
    Closed,

    /// The bounded delivery queue is full.
    #[error("delivery queue is full")]
    QueueFull,
}
