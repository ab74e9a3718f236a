//! Facade configuration.
//!
//! Values come from code through [`FacadeBuilder`](crate::FacadeBuilder) or
//! from the process environment through [`FacadeConfig::from_env`], which is
//! what the C boundary uses. Missing or unparsable variables fall back to the
//! defaults.
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `CALLGATE_NAME` | registry name used in logs and thread names | `callgate` |
//! | `CALLGATE_ASYNC` | deliver `send` on a worker thread (`1`/`true`) | `true` |
//! | `CALLGATE_QUEUE_CAPACITY` | bound of the delivery queue, `0` for unbounded | `0` |
//! | `CALLGATE_MAX_PAYLOAD` | largest accepted payload in bytes | 16 MiB |

use std::env;

/// Default payload limit: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Snapshot of the settings a [`DispatchFacade`](crate::DispatchFacade) is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacadeConfig {
    /// Registry name.
    pub name: String,
    /// Whether `send` goes through a background delivery queue.
    pub asynchronous: bool,
    /// Queue bound; `None` for unbounded.
    pub queue_capacity: Option<usize>,
    /// Largest accepted payload in bytes.
    pub max_payload_len: usize,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            name: "callgate".to_string(),
            asynchronous: true,
            queue_capacity: None,
            max_payload_len: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl FacadeConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let name = lookup("CALLGATE_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.name);
        let asynchronous = lookup("CALLGATE_ASYNC")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.asynchronous);
        let queue_capacity = lookup("CALLGATE_QUEUE_CAPACITY").and_then(|v| v.trim().parse().ok());
        let queue_capacity = match queue_capacity {
            Some(0) => None,
            Some(cap) => Some(cap),
            None => defaults.queue_capacity,
        };
        let max_payload_len = lookup("CALLGATE_MAX_PAYLOAD")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.max_payload_len);

        Self {
            name,
            asynchronous,
            queue_capacity,
            max_payload_len,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
