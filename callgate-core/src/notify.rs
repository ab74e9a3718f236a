//! # Notify Capability
//!
//! The caller-supplied callback invoked on dispatch. It is the only piece of
//! caller code the registry ever runs.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|source: &str, payload: &[u8]| { ... }`
//! 2. **Struct implementation**: `impl Notify for MyHandler`
//! 3. **Foreign callback**: a function pointer plus user data, wrapped by the
//!    C boundary in the `callgate` crate

/// A callback invoked with the source of a message and its payload.
///
/// Implementations must be `Send + Sync` because dispatch may run on any
/// thread, including several at once. `notify` runs without any registry lock
/// held, so it may call back into the registry (register, cancel, dispatch).
///
/// # Example
///
/// ```rust
/// use callgate_core::Notify;
///
/// struct Printer;
///
/// impl Notify for Printer {
///     fn notify(&self, source: &str, payload: &[u8]) {
///         println!("{source}: {} bytes", payload.len());
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be registered as a notify handler",
    label = "missing `Notify` implementation",
    note = "Implement `Notify` or pass a closure of type `Fn(&str, &[u8]) + Send + Sync + 'static`."
)]
pub trait Notify: Send + Sync + 'static {
    /// Deliver one message.
    fn notify(&self, source: &str, payload: &[u8]);
}

// Blanket impl for closures
impl<F> Notify for F
where
    F: Fn(&str, &[u8]) + Send + Sync + 'static,
{
    fn notify(&self, source: &str, payload: &[u8]) {
        (self)(source, payload)
    }
}
