//! Cancellation-aware promise chains with cooperative abort propagation.
//!
//! This crate provides [`Promise`], a single-settlement asynchronous value
//! whose chains support cooperative abort: cancelling any node forces its
//! settlement to a distinguishable cancellation error and cascades the same
//! cause up the chain toward the root dependency.
//!
//! # Components
//!
//! - **[`Scheduler`]**: per-runtime toggle between synchronous (inline,
//!   deterministic) and deferred (tokio task queue) callback invocation
//! - **[`Promise`]**: construction, `then`/`catch`/`finally` chaining,
//!   `abort()`, and the `all`/`race` aggregate combinators
//! - **[`Rejection`]**: closed two-kind error taxonomy separating
//!   cancellation from opaque application errors
//!
//! Abort is advisory, not preemptive: it cannot stop work already running
//! inside a resolver or continuation body, it only changes how that branch
//! of the chain reports settlement from then on.
//!
//! # Example
//!
//! ```
//! use promise_chain::{Chained, Promise, Scheduler};
//!
//! let scheduler = Scheduler::new();
//!
//! let chain = Promise::resolve(&scheduler, 2)
//!     .then(|n| Ok(Chained::Immediate(n * 2)))
//!     .then(|n| Ok(Chained::Immediate(n + 1)));
//!
//! // Synchronous mode: the whole chain has already settled.
//! assert!(matches!(chain.try_result(), Some(Ok(5))));
//! ```

mod abort;
mod aggregate;
mod cell;

pub mod error;
pub mod promise;
pub mod scheduler;

#[cfg(test)]
mod aggregate_tests;

// Re-export commonly used types at crate root
pub use error::{CancelError, Rejection};
pub use promise::{ChainResult, Chained, Promise, Settler};
pub use scheduler::Scheduler;
