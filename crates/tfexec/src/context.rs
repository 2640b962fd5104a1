//! Cancellation context passed to every invocation.
//!
//! A [`Context`] carries a cancel flag and an optional deadline. Derived
//! contexts observe their parent: cancelling a parent cancels every child,
//! and a child's deadline never extends past its parent's.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

/// Cheaply clonable cancellation handle.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never done unless cancelled.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }

    /// A child that can be cancelled on its own.
    pub fn child(&self) -> Self {
        self.derive(self.deadline())
    }

    /// A child that is done after `timeout`, or when this context is.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = self.deadline().map_or(deadline, |parent| parent.min(deadline));
        self.derive(Some(deadline))
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether this context or any ancestor was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self.inner.parent.as_ref().is_some_and(Self::is_cancelled)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the context is done.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.remaining().is_some_and(|r| r.is_zero()) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_never_done() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.child();
        let grandchild = child.with_timeout(Duration::from_secs(60));

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.is_cancelled());
        assert!(matches!(grandchild.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_child_deadline_capped_by_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
