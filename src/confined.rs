//! Values that carry their own creation context.
//!
//! The alternative to the guard's association table: the owning context is stored
//! next to the value, so no shared lookup is needed. Handler, tracking flag and
//! counters still come from the guard.

use crate::context::ContextId;
use crate::error::GuardError;
use crate::guard::ContextGuard;
use std::fmt;
use std::sync::Arc;

/// A value that may only be accessed from the context it was created on
pub struct Confined<T> {
    value: T,
    origin: Option<ContextId>,
    guard: Arc<ContextGuard>,
}

impl<T> Confined<T> {
    /// Wrap `value`, stamping the calling context. Values created while tracking
    /// is off are never checked.
    pub fn new(guard: Arc<ContextGuard>, value: T) -> Self {
        let origin = guard.stamp();
        Self {
            value,
            origin,
            guard,
        }
    }

    /// Context the value belongs to, if it was stamped
    pub fn origin(&self) -> Option<ContextId> {
        self.origin
    }

    /// Checked shared access. On a violation the handler runs and `f` does not.
    pub fn with<R>(&self, operation: &str, f: impl FnOnce(&T) -> R) -> Result<R, GuardError> {
        self.guard.verify_origin::<T>(self.origin, operation)?;
        Ok(f(&self.value))
    }

    /// Checked exclusive access
    pub fn with_mut<R>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, GuardError> {
        self.guard.verify_origin::<T>(self.origin, operation)?;
        Ok(f(&mut self.value))
    }

    /// Checked borrow
    pub fn try_get(&self, operation: &str) -> Result<&T, GuardError> {
        self.guard.verify_origin::<T>(self.origin, operation)?;
        Ok(&self.value)
    }

    /// Unwrap without a check
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Confined<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Confined")
            .field("value", &self.value)
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(all(
    test,
    any(feature = "release-tracking", all(feature = "tracking", debug_assertions))
))]
mod tests {
    use super::*;
    use crate::context::SerialQueue;
    use crate::handler::RecordingHandler;

    #[test]
    fn test_access_from_origin_passes() {
        let guard = Arc::new(ContextGuard::new());
        let mut counter = Confined::new(guard, 0u32);
        assert_eq!(counter.origin(), Some(ContextId::current()));
        counter.with_mut("increment", |c| *c += 1).unwrap();
        assert_eq!(*counter.try_get("read").unwrap(), 1);
        assert_eq!(counter.into_inner(), 1);
    }

    #[test]
    fn test_access_from_other_queue_is_rejected() {
        let recorder = RecordingHandler::new();
        let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
        let queue = SerialQueue::private("writer");
        let cell = queue.run(|| Confined::new(guard.clone(), vec![1, 2]));

        let mut ran = false;
        let err = cell.with("len", |v| {
            ran = true;
            v.len()
        });
        assert!(err.is_err());
        assert!(!ran);
        assert_eq!(recorder.operations(), vec!["len"]);

        assert_eq!(queue.run(|| cell.with("len", |v| v.len())).unwrap(), 2);
    }

    #[test]
    fn test_unstamped_when_created_with_tracking_off() {
        let recorder = RecordingHandler::new();
        let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
        guard.end_tracking();
        let queue = SerialQueue::private("late");
        let cell = queue.run(|| Confined::new(guard.clone(), "x"));
        guard.begin_tracking();

        assert_eq!(cell.origin(), None);
        assert!(cell.try_get("read").is_ok());
        assert!(recorder.is_empty());
    }
}
