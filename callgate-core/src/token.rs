//! # Registration Tokens
//!
//! A [`RegistrationToken`] is the caller's only handle on its own
//! registration. It pairs the issuing registry's [`RegistryId`] with a serial
//! drawn from that registry's monotonically increasing counter, so a token can
//! never alias a newer registration and a token handed to the wrong registry
//! is recognised as foreign instead of cancelling an unrelated entry.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(NonZeroU64);

impl RegistryId {
    /// Allocate a fresh identifier. Never returns the same value twice.
    pub fn next() -> Self {
        let raw = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 registries to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MAX))
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Opaque capability referencing exactly one handler registration.
///
/// Tokens are `Copy`; holding or copying one grants nothing beyond the ability
/// to cancel the registration it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationToken {
    registry: RegistryId,
    serial: NonZeroU64,
}

impl RegistrationToken {
    /// Build a token. Only registries mint serials; everyone else goes
    /// through [`RegistrationToken::from_raw`].
    pub const fn new(registry: RegistryId, serial: NonZeroU64) -> Self {
        Self { registry, serial }
    }

    /// Rebuild a token from the raw value handed across a boundary.
    ///
    /// Returns `None` for `0`, which is never issued.
    pub fn from_raw(registry: RegistryId, raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(|serial| Self { registry, serial })
    }

    /// The registry that issued this token.
    pub const fn registry(&self) -> RegistryId {
        self.registry
    }

    /// The per-registry serial.
    pub const fn serial(&self) -> NonZeroU64 {
        self.serial
    }

    /// The serial as a plain integer, for boundaries that cannot carry the
    /// registry id. The receiving side pairs it with its own registry id.
    pub const fn to_raw(&self) -> u64 {
        self.serial.get()
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.registry, self.serial)
    }
}
