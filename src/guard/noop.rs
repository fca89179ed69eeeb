//! Compiled-out guard: every operation is an inlined no-op.

use super::{GuardStats, ObjectKey};
use crate::config::GuardConfig;
use crate::context::ContextId;
use crate::error::GuardError;
use crate::handler::ViolationHandler;
use crate::registry::ConfinedTypeRegistry;
use std::sync::Arc;

/// Zero-sized stand-in for the instrumented guard. Checks always pass and no
/// handler is ever invoked.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextGuard {
    _private: (),
}

impl ContextGuard {
    #[inline(always)]
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[inline(always)]
    pub fn with_handler(_handler: impl ViolationHandler + 'static) -> Self {
        Self::new()
    }

    #[inline(always)]
    pub fn from_config(_config: &GuardConfig) -> Self {
        Self::new()
    }

    #[inline(always)]
    pub fn with_registry(self, _registry: ConfinedTypeRegistry) -> Self {
        self
    }

    #[inline(always)]
    pub fn register_context<T: ?Sized>(&self, _object: &T, _context: ContextId) {}

    #[inline(always)]
    pub fn register_current<T: ?Sized>(&self, _object: &T) {}

    #[inline(always)]
    pub fn register_scoped<T: ?Sized>(self: &Arc<Self>, object: &T) -> Registration {
        Registration {
            key: ObjectKey::of(object),
        }
    }

    #[inline(always)]
    pub fn track<T: 'static>(&self, _object: &T) -> bool {
        false
    }

    #[inline(always)]
    pub fn forget<T: ?Sized>(&self, _object: &T) -> bool {
        false
    }

    #[inline(always)]
    pub fn is_tracked<T: ?Sized>(&self, _object: &T) -> bool {
        false
    }

    #[inline(always)]
    pub fn context_of<T: ?Sized>(&self, _object: &T) -> Option<ContextId> {
        None
    }

    #[inline(always)]
    pub fn tracked_count(&self) -> usize {
        0
    }

    #[inline(always)]
    pub fn check_context<T: ?Sized>(&self, _object: &T, _operation: &str) -> bool {
        true
    }

    #[inline(always)]
    pub fn check_context_from<T: ?Sized>(
        &self,
        _object: &T,
        _operation: &str,
        _calling: ContextId,
    ) -> bool {
        true
    }

    #[inline(always)]
    pub fn ensure_context<T: ?Sized>(
        &self,
        _object: &T,
        _operation: &str,
    ) -> Result<(), GuardError> {
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn stamp(&self) -> Option<ContextId> {
        None
    }

    #[inline(always)]
    pub(crate) fn verify_origin<T: ?Sized>(
        &self,
        _origin: Option<ContextId>,
        _operation: &str,
    ) -> Result<(), GuardError> {
        Ok(())
    }

    #[inline(always)]
    pub fn set_violation_handler(&self, _handler: impl ViolationHandler + 'static) {}

    #[inline(always)]
    pub fn set_violation_handler_arc(&self, _handler: Arc<dyn ViolationHandler>) {}

    #[inline(always)]
    pub fn begin_tracking(&self) {}

    #[inline(always)]
    pub fn end_tracking(&self) {}

    #[inline(always)]
    pub fn is_tracking(&self) -> bool {
        false
    }

    #[inline(always)]
    pub fn stats(&self) -> GuardStats {
        GuardStats::default()
    }
}

/// Inert registration; nothing was recorded.
#[must_use = "the object is untracked again as soon as the registration is dropped"]
#[derive(Debug)]
pub struct Registration {
    key: ObjectKey,
}

impl Registration {
    #[inline(always)]
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        false
    }
}
