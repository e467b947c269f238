//! Error taxonomy for promise rejections.
//!
//! A rejection is one of exactly two kinds: a distinguished cancellation
//! produced by [`abort()`](crate::Promise::abort), or an opaque payload
//! supplied by the caller. The core never inspects or wraps a propagated
//! payload; it only overrides it with the cancellation cause once a chain
//! has been aborted.

use std::sync::Arc;
use thiserror::Error;

/// The cancellation cause for an aborted promise chain.
///
/// Created exactly once per abort event at the chain node where `abort()`
/// was called, then shared (`Arc`) by every ancestor that adopts it via the
/// cascade. Callers can therefore tell "one abort event" apart from two by
/// pointer identity, and "I cancelled this" apart from "the operation
/// failed" by matching [`Rejection::Cancelled`].
#[derive(Debug, Error)]
#[error("{}", .message.as_deref().unwrap_or("promise aborted"))]
pub struct CancelError {
    message: Option<String>,
}

impl CancelError {
    /// A cancellation cause with the default message.
    pub fn new() -> Self {
        Self { message: None }
    }

    /// A cancellation cause carrying a caller-supplied message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The caller-supplied message, if one was given.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Default for CancelError {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a promise rejected.
///
/// Cloneable so that every continuation registered on the same promise can
/// observe the same rejection; both variants share their payload behind an
/// `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Rejection {
    /// The chain was aborted; carries the shared cancellation cause.
    #[error("{0}")]
    Cancelled(Arc<CancelError>),

    /// An application error passed to `reject` or returned from a resolver
    /// or continuation body. Passed through opaquely.
    #[error("{0}")]
    Propagated(Arc<dyn std::error::Error + Send + Sync>),
}

impl Rejection {
    /// Wraps an application error as an opaque propagated rejection.
    pub fn propagated(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Propagated(Arc::from(error.into()))
    }

    /// True if this rejection was caused by `abort()`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
