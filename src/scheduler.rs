//! Scheduler toggle for synchronous vs deferred callback invocation.
//!
//! Every resolver body and continuation callback in this crate is dispatched
//! through a [`Scheduler`]. In synchronous mode (the default) the callback
//! runs inline, in the same call stack as the triggering operation, which
//! makes chains fully deterministic for tests. In deferred mode the callback
//! is queued onto the current tokio runtime and runs on a later turn of the
//! task queue.
//!
//! The scheduler is an explicit context object rather than a process-wide
//! flag, so independent promise runtimes with different policies can coexist
//! in the same process. It is a cheap `Arc` handle; clone it freely.
//!
//! # Example
//!
//! ```
//! use promise_chain::{Promise, Scheduler};
//!
//! let scheduler = Scheduler::new();
//! assert!(!scheduler.is_async());
//!
//! // Synchronous mode: the resolver has already run by the time `new` returns.
//! let p = Promise::new(&scheduler, |s| {
//!     s.resolve(42);
//!     Ok(())
//! });
//! assert!(p.try_result().is_some());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Selects how resolver and continuation callbacks are invoked.
///
/// Synchronous by default. [`set_async(true)`](Scheduler::set_async) defers
/// all subsequently-scheduled callbacks to the tokio task queue; it does not
/// retroactively affect work that has already been queued.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    deferred: Arc<AtomicBool>,
}

impl Scheduler {
    /// Creates a scheduler in synchronous mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches between synchronous (`false`) and deferred (`true`) mode
    /// for all callbacks scheduled after this call.
    pub fn set_async(&self, enabled: bool) {
        self.deferred.store(enabled, Ordering::Release);
    }

    /// True if callbacks are currently being deferred.
    pub fn is_async(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    /// Dispatches a callback according to the current mode.
    ///
    /// Deferred mode queues onto the tokio runtime on the current thread;
    /// without one the callback is still taken off the calling stack, on a
    /// fallback thread, so deferred mode never exposes reentrancy into the
    /// caller's own frame.
    pub(crate) fn run(&self, callback: impl FnOnce() + Send + 'static) {
        if !self.is_async() {
            return callback();
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { callback() });
            }
            Err(_) => {
                tracing::warn!("deferred scheduling outside a tokio runtime, using a fallback thread");
                std::thread::spawn(callback);
            }
        }
    }
}
