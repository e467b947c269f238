//! Abort state and upward cascade along the chain linkage.
//!
//! Each promise owns one [`AbortCell`]. A derived promise's cell holds a
//! `Weak` back-reference to the cell of the promise it was derived from;
//! aborting walks that linkage toward the chain root, installing the same
//! shared cancellation cause in every ancestor. The link is non-owning and
//! is traversed for nothing except the cascade.

use crate::error::CancelError;
use std::sync::{Arc, Weak};

pub(crate) struct AbortCell {
    /// Set exactly once, at the moment the abort flag flips.
    cause: spin::Mutex<Option<Arc<CancelError>>>,
    /// The promise this one was derived from, if any. Never keeps an
    /// ancestor alive.
    parent: Option<Weak<AbortCell>>,
}

impl AbortCell {
    pub(crate) fn new(parent: Option<&Arc<AbortCell>>) -> Self {
        Self {
            cause: spin::Mutex::new(None),
            parent: parent.map(Arc::downgrade),
        }
    }

    /// Marks this cell and every reachable ancestor as aborted with the
    /// given cause. Idempotent: a cell that is already aborted keeps its
    /// original cause and the cascade stops there.
    pub(crate) fn abort(&self, cause: Arc<CancelError>) {
        {
            let mut slot = self.cause.lock();
            if slot.is_some() {
                return;
            }
            *slot = Some(cause.clone());
        }
        tracing::trace!("promise aborted");

        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent.abort(cause);
        }
    }

    /// The cancellation cause, once aborted.
    pub(crate) fn cause(&self) -> Option<Arc<CancelError>> {
        self.cause.lock().clone()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.cause.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_reaches_the_root() {
        let root = Arc::new(AbortCell::new(None));
        let mid = Arc::new(AbortCell::new(Some(&root)));
        let leaf = Arc::new(AbortCell::new(Some(&mid)));

        let cause = Arc::new(CancelError::new());
        leaf.abort(cause.clone());

        for cell in [&root, &mid, &leaf] {
            assert!(cell.is_aborted());
            assert!(Arc::ptr_eq(&cell.cause().unwrap(), &cause));
        }
    }

    #[test]
    fn abort_is_idempotent() {
        let cell = AbortCell::new(None);
        let first = Arc::new(CancelError::new());
        let second = Arc::new(CancelError::with_message("late"));

        cell.abort(first.clone());
        cell.abort(second);

        assert!(Arc::ptr_eq(&cell.cause().unwrap(), &first));
    }

    #[test]
    fn cascade_skips_dropped_ancestors() {
        let root = Arc::new(AbortCell::new(None));
        let leaf = {
            let mid = Arc::new(AbortCell::new(Some(&root)));
            AbortCell::new(Some(&mid))
        };

        // `mid` is gone; aborting the leaf must not panic and cannot reach
        // the root through the broken link.
        leaf.abort(Arc::new(CancelError::new()));
        assert!(leaf.is_aborted());
        assert!(!root.is_aborted());
    }
}
