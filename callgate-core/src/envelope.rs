//! Owned messages for deferred delivery.

use crate::destination::Destination;
use bytes::Bytes;
use std::sync::Arc;

/// A message addressed to a destination, owned so it can be queued and
/// delivered later from another thread.
///
/// Cloning is O(1): the source is an `Arc<str>` and the payload a [`Bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    destination: Destination,
    source: Arc<str>,
    payload: Bytes,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(
        destination: Destination,
        source: impl Into<Arc<str>>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            destination,
            source: source.into(),
            payload: payload.into(),
        }
    }

    /// Where the message goes.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Who sent it.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The opaque message bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}
