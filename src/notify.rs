//! User-facing notification surface.
//!
//! The access layer occasionally needs to tell the end user something —
//! today only the one-shot "issuing excessive requests" warning from the
//! concurrency gate. Hosts inject their own [`Notifier`] (a status bar, a
//! toast, a log sink); library code never talks to a UI directly.

use std::sync::Arc;

/// A surface capable of showing a warning string to the user.
///
/// Implementations must be cheap and non-blocking; the gate calls
/// [`warn`](Notifier::warn) from the hot request path. One-shotness is the
/// caller's responsibility, not the notifier's.
pub trait Notifier: Send + Sync {
    /// Show a warning to the user.
    fn warn(&self, message: &str);
}

/// A notifier that drops every message.
///
/// The default when a host has no user-visible surface to offer.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn warn(&self, _message: &str) {}
}

/// Convenience: a shared no-op notifier.
pub fn null_notifier() -> Arc<dyn Notifier> {
    Arc::new(NullNotifier)
}
