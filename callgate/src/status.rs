//! Status codes that cross the boundary.
//!
//! Every failure the registry or the facade can report maps onto one of
//! these codes. The numeric values are part of the C ABI and must not change.

use callgate_core::{CallgateError, CancelError, InputError, PostError, RegisterError};
use std::ffi::CStr;
use std::fmt;

/// Stable status codes for boundary callers.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// The operation succeeded.
    Ok = 0,
    /// Cancel referenced a token this context never issued.
    UnknownToken = 1,
    /// Cancel referenced a registration that is already retired.
    AlreadyCancelled = 2,
    /// The context has been shut down.
    Closed = 3,
    /// Input failed validation.
    InvalidInput = 4,
    /// The delivery queue is full; retry later.
    QueueFull = 5,
    /// Catch-all for failures outside the protocol (thread spawn, etc.).
    Internal = 6,
}

impl Status {
    /// The numeric code.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Map a numeric code back, if it is one of ours.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Status::Ok,
            1 => Status::UnknownToken,
            2 => Status::AlreadyCancelled,
            3 => Status::Closed,
            4 => Status::InvalidInput,
            5 => Status::QueueFull,
            6 => Status::Internal,
            _ => return None,
        })
    }

    /// Whether this is [`Status::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Human readable description, NUL-terminated for C callers.
    pub const fn message(self) -> &'static CStr {
        match self {
            Status::Ok => c"ok",
            Status::UnknownToken => c"unknown registration token",
            Status::AlreadyCancelled => c"registration already cancelled",
            Status::Closed => c"context has been shut down",
            Status::InvalidInput => c"invalid input",
            Status::QueueFull => c"delivery queue is full",
            Status::Internal => c"internal error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message().to_string_lossy())
    }
}

impl From<&CancelError> for Status {
    fn from(err: &CancelError) -> Self {
        match err {
            CancelError::UnknownToken(_) => Status::UnknownToken,
            CancelError::AlreadyCancelled(_) => Status::AlreadyCancelled,
        }
    }
}

impl From<&RegisterError> for Status {
    fn from(err: &RegisterError) -> Self {
        match err {
            RegisterError::Closed => Status::Closed,
            RegisterError::InvalidInput(_) => Status::InvalidInput,
            RegisterError::TokensExhausted => Status::Internal,
        }
    }
}

impl From<&InputError> for Status {
    fn from(_: &InputError) -> Self {
        Status::InvalidInput
    }
}

impl From<&PostError> for Status {
    fn from(err: &PostError) -> Self {
        match err {
            PostError::Closed => Status::Closed,
            PostError::QueueFull => Status::QueueFull,
        }
    }
}

impl From<&CallgateError> for Status {
    fn from(err: &CallgateError) -> Self {
        match err {
            CallgateError::Cancel(e) => e.into(),
            CallgateError::Register(e) => e.into(),
            CallgateError::Input(e) => e.into(),
            CallgateError::Post(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callgate_core::{RegistrationToken, RegistryId};

    #[test]
    fn codes_are_stable() {
        assert_eq!(Status::Ok as i32, 0);
        assert_eq!(Status::UnknownToken as i32, 1);
        assert_eq!(Status::AlreadyCancelled as i32, 2);
        assert_eq!(Status::Closed as i32, 3);
        assert_eq!(Status::InvalidInput as i32, 4);
        assert_eq!(Status::QueueFull as i32, 5);
        assert_eq!(Status::Internal as i32, 6);
    }

    #[test]
    fn codes_round_trip() {
        for code in 0..=6 {
            assert_eq!(Status::from_code(code).map(Status::code), Some(code));
        }
        assert_eq!(Status::from_code(-1), None);
        assert_eq!(Status::from_code(7), None);
    }

    #[test]
    fn errors_map_to_codes() {
        let token = RegistrationToken::from_raw(RegistryId::next(), 1).unwrap();
        assert_eq!(Status::from(&CancelError::UnknownToken(token)), Status::UnknownToken);
        assert_eq!(
            Status::from(&CallgateError::Cancel(CancelError::AlreadyCancelled(token))),
            Status::AlreadyCancelled
        );
        assert_eq!(Status::from(&RegisterError::Closed), Status::Closed);
        assert_eq!(
            Status::from(&RegisterError::InvalidInput(InputError::EmptyDestination)),
            Status::InvalidInput
        );
        assert_eq!(Status::from(&RegisterError::TokensExhausted), Status::Internal);
        assert_eq!(Status::from(&PostError::QueueFull), Status::QueueFull);
    }

    #[test]
    fn messages_are_nul_terminated() {
        assert_eq!(Status::Closed.message().to_bytes(), b"context has been shut down");
        assert_eq!(Status::Ok.to_string(), "ok");
    }
}
