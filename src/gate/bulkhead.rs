//! Fixed-capacity admission control for outbound calls.
//!
//! The [`Bulkhead`] caps simultaneous in-flight remote calls so a burst of
//! UI-triggered fetches cannot exhaust the provider's abuse limits. Slots
//! are semaphore permits: acquisition is a non-blocking `try_acquire`, and
//! release rides the permit's `Drop`, so a slot is returned exactly once on
//! every exit path — success, error, or a caller abandoning the future.
//!
//! When no slot is free the gate is in overload. What happens then is the
//! call site's choice via [`OverloadPolicy`]: low-risk paths run anyway and
//! only record the event; strict paths are refused outright and the user
//! sees a one-time warning that the layer is issuing excessive requests.
//! The gate never retries — a refused caller decides for itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::notify::Notifier;
use crate::telemetry;
use crate::{HeimdallError, Result};

/// Default number of concurrent in-flight calls the gate admits.
pub const DEFAULT_CAPACITY: usize = 140;

/// Below this many free slots, slot logging switches from `debug` to `info`.
pub const LOW_SLOT_WATERMARK: usize = 5;

/// What the gate does with a call when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverloadPolicy {
    /// Run the task anyway; only record the overload event.
    #[default]
    Proceed,
    /// Refuse immediately with [`HeimdallError::ExceededRateLimit`] and
    /// warn the user once. The task is never started.
    Refuse,
}

impl OverloadPolicy {
    fn as_str(self) -> &'static str {
        match self {
            OverloadPolicy::Proceed => "proceed",
            OverloadPolicy::Refuse => "refuse",
        }
    }
}

/// A fixed-capacity admission controller for remote calls.
///
/// Invariant: `0 <= available_slots() <= capacity()` at all times.
pub struct Bulkhead {
    capacity: usize,
    slots: Semaphore,
    notifier: Arc<dyn Notifier>,
    refusal_warned: AtomicBool,
}

impl Bulkhead {
    /// Create a gate with [`DEFAULT_CAPACITY`] slots.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, notifier)
    }

    /// Create a gate with an explicit capacity.
    pub fn with_capacity(capacity: usize, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            capacity,
            slots: Semaphore::new(capacity),
            notifier,
            refusal_warned: AtomicBool::new(false),
        }
    }

    /// The configured slot count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many slots are currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run `task` under a gate slot.
    ///
    /// `info` is a short description of the call (endpoint or GraphQL
    /// operation name) used for logging. If no slot is free, `policy`
    /// decides between running anyway and refusing with
    /// [`HeimdallError::ExceededRateLimit`].
    pub async fn execute<T, F, Fut>(
        &self,
        info: &str,
        policy: OverloadPolicy,
        task: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.slots.try_acquire() {
            Ok(_permit) => {
                let available = self.slots.available_permits();
                if available < LOW_SLOT_WATERMARK {
                    info!(slots = available, info, "executing gated call");
                } else {
                    debug!(slots = available, info, "executing gated call");
                }
                // Permit is held across the await and dropped on every exit
                // path, including cancellation.
                task().await
            }
            Err(_) => self.handle_overload(info, policy, task).await,
        }
    }

    async fn handle_overload<T, F, Fut>(
        &self,
        info: &str,
        policy: OverloadPolicy,
        task: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        metrics::counter!(telemetry::GATE_OVERLOADS_TOTAL, "policy" => policy.as_str())
            .increment(1);
        error!(info, policy = policy.as_str(), "request gate at capacity");

        match policy {
            OverloadPolicy::Proceed => task().await,
            OverloadPolicy::Refuse => {
                if !self.refusal_warned.swap(true, Ordering::Relaxed) {
                    self.notifier.warn(
                        "The GitHub access layer is issuing an excessive number of \
                         requests and some have been dropped. If this persists, \
                         please report it.",
                    );
                }
                Err(HeimdallError::ExceededRateLimit)
            }
        }
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("capacity", &self.capacity)
            .field("available", &self.slots.available_permits())
            .finish()
    }
}
