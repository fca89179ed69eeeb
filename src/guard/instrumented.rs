//! Instrumented guard: association table, tracking flag and handler.

use super::{GuardStats, ObjectKey};
use crate::config::GuardConfig;
use crate::context::ContextId;
use crate::error::GuardError;
use crate::handler::{NoopHandler, Violation, ViolationHandler};
use crate::registry::ConfinedTypeRegistry;
use parking_lot::RwLock;
use std::any::type_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Detects access to objects from a context other than the one they were created on.
///
/// Shared by `Arc` between every call site. Registration happens once per object,
/// at construction; checks may come from any thread afterwards.
pub struct ContextGuard {
    tracking: AtomicBool,
    handler: RwLock<Arc<dyn ViolationHandler>>,
    contexts: RwLock<HashMap<ObjectKey, Record>>,
    registry: ConfinedTypeRegistry,
    next_generation: AtomicU64,
    checks: AtomicU64,
    violations: AtomicU64,
    registrations: AtomicU64,
}

/// Table entry. The generation tells a scoped registration whether the entry
/// is still its own when it drops.
#[derive(Debug, Clone, Copy)]
struct Record {
    context: ContextId,
    generation: u64,
}

impl Default for ContextGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextGuard {
    /// Guard with tracking on and a no-op handler
    pub fn new() -> Self {
        Self {
            tracking: AtomicBool::new(true),
            handler: RwLock::new(Arc::new(NoopHandler)),
            contexts: RwLock::new(HashMap::new()),
            registry: ConfinedTypeRegistry::default(),
            next_generation: AtomicU64::new(0),
            checks: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
        }
    }

    pub fn with_handler(handler: impl ViolationHandler + 'static) -> Self {
        let guard = Self::new();
        guard.set_violation_handler(handler);
        guard
    }

    /// Guard configured from the `[tracking]` section: initial state and policy
    pub fn from_config(config: &GuardConfig) -> Self {
        let guard = Self::new();
        guard.set_violation_handler_arc(config.tracking.policy.handler());
        if !config.tracking.enabled_at_start {
            guard.end_tracking();
        }
        guard
    }

    /// Attach the confined type registry consulted by [`ContextGuard::track`]
    pub fn with_registry(mut self, registry: ConfinedTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Record that `object` belongs to `context`. Overwrites any previous record.
    /// No-op while tracking is off.
    pub fn register_context<T: ?Sized>(&self, object: &T, context: ContextId) {
        self.insert(ObjectKey::of(object), context);
    }

    /// Record that `object` belongs to the calling context
    pub fn register_current<T: ?Sized>(&self, object: &T) {
        if let Some(context) = ContextId::try_current() {
            self.register_context(object, context);
        }
    }

    /// Record that `object` belongs to the calling context until the returned
    /// registration is dropped.
    ///
    /// Hosts keep the registration inside the object, so the record goes away with
    /// it and a later object at the same address starts out untracked. Dropping the
    /// registration leaves a newer record for the same object in place.
    pub fn register_scoped<T: ?Sized>(self: &Arc<Self>, object: &T) -> Registration {
        let key = ObjectKey::of(object);
        let generation = ContextId::try_current().and_then(|context| self.insert(key, context));
        Registration {
            guard: Arc::clone(self),
            key,
            generation,
        }
    }

    fn insert(&self, key: ObjectKey, context: ContextId) -> Option<u64> {
        if !self.is_tracking() {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.contexts
            .write()
            .insert(key, Record { context, generation });
        self.registrations.fetch_add(1, Ordering::Relaxed);
        trace!(object = ?key, context = %context, "Registered object context");
        Some(generation)
    }

    fn release(&self, key: &ObjectKey, generation: u64) {
        let mut contexts = self.contexts.write();
        if contexts.get(key).map(|record| record.generation) == Some(generation) {
            contexts.remove(key);
        }
    }

    /// Register `object` if its type is in the confined type registry.
    ///
    /// Returns whether an association was recorded.
    pub fn track<T: 'static>(&self, object: &T) -> bool {
        if !self.is_tracking() {
            return false;
        }
        match (self.registry.lookup::<T>(), ContextId::try_current()) {
            (Some(entry), Some(creating)) => {
                self.register_context(object, entry.expected_context(creating));
                true
            }
            _ => false,
        }
    }

    /// Drop the association for `object`. Returns whether one existed.
    pub fn forget<T: ?Sized>(&self, object: &T) -> bool {
        self.contexts.write().remove(&ObjectKey::of(object)).is_some()
    }

    pub fn is_tracked<T: ?Sized>(&self, object: &T) -> bool {
        self.contexts.read().contains_key(&ObjectKey::of(object))
    }

    /// Context recorded for `object`, if any
    pub fn context_of<T: ?Sized>(&self, object: &T) -> Option<ContextId> {
        self.contexts
            .read()
            .get(&ObjectKey::of(object))
            .map(|record| record.context)
    }

    pub fn tracked_count(&self) -> usize {
        self.contexts.read().len()
    }

    /// Check that the calling context owns `object`.
    ///
    /// Untracked objects always pass. On a mismatch the handler is invoked once
    /// and `false` is returned. During thread-local teardown the calling context
    /// cannot be resolved and the check passes.
    pub fn check_context<T: ?Sized>(&self, object: &T, operation: &str) -> bool {
        match ContextId::try_current() {
            Some(calling) => self.check_context_from(object, operation, calling),
            None => {
                trace!(operation, "Calling context unavailable, check skipped");
                true
            }
        }
    }

    /// [`ContextGuard::check_context`] with an explicit calling context
    pub fn check_context_from<T: ?Sized>(
        &self,
        object: &T,
        operation: &str,
        calling: ContextId,
    ) -> bool {
        if !self.is_tracking() {
            return true;
        }
        let expected = self.context_of(object);
        self.evaluate(expected, operation, calling, type_name::<T>())
            .is_ok()
    }

    /// Check, then turn a violation into an error for `?` propagation.
    ///
    /// The handler still runs first.
    pub fn ensure_context<T: ?Sized>(&self, object: &T, operation: &str) -> Result<(), GuardError> {
        let calling = match ContextId::try_current() {
            Some(calling) if self.is_tracking() => calling,
            _ => return Ok(()),
        };
        let expected = self.context_of(object);
        self.evaluate(expected, operation, calling, type_name::<T>())
            .map_err(GuardError::from)
    }

    /// Context to stamp on a value created now; `None` while tracking is off
    pub(crate) fn stamp(&self) -> Option<ContextId> {
        if self.is_tracking() {
            ContextId::try_current()
        } else {
            None
        }
    }

    /// Check a context stored alongside a value rather than in the table
    pub(crate) fn verify_origin<T: ?Sized>(
        &self,
        origin: Option<ContextId>,
        operation: &str,
    ) -> Result<(), GuardError> {
        let calling = match ContextId::try_current() {
            Some(calling) if self.is_tracking() => calling,
            _ => return Ok(()),
        };
        self.evaluate(origin, operation, calling, type_name::<T>())
            .map_err(GuardError::from)
    }

    fn evaluate(
        &self,
        expected: Option<ContextId>,
        operation: &str,
        calling: ContextId,
        type_name: &'static str,
    ) -> Result<(), Violation> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let expected = match expected {
            Some(expected) if expected != calling => expected,
            _ => return Ok(()),
        };

        self.violations.fetch_add(1, Ordering::Relaxed);
        let violation = Violation::new(operation, expected, calling).with_type_name(type_name);
        debug!(
            operation,
            expected = %expected,
            actual = %calling,
            type_name,
            "Context check failed"
        );

        // The handler may panic or take its time; no lock is held while it runs.
        let handler = self.handler.read().clone();
        handler.on_violation(&violation);
        Err(violation)
    }

    /// Replace the handler. Checks issued after this returns use the new one.
    pub fn set_violation_handler(&self, handler: impl ViolationHandler + 'static) {
        self.set_violation_handler_arc(Arc::new(handler));
    }

    pub fn set_violation_handler_arc(&self, handler: Arc<dyn ViolationHandler>) {
        *self.handler.write() = handler;
    }

    /// Turn tracking on. Idempotent; calls do not nest.
    pub fn begin_tracking(&self) {
        if !self.tracking.swap(true, Ordering::SeqCst) {
            debug!("Context tracking enabled");
        }
    }

    /// Turn tracking off. Idempotent; calls do not nest.
    pub fn end_tracking(&self) {
        if self.tracking.swap(false, Ordering::SeqCst) {
            debug!("Context tracking disabled");
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GuardStats {
        GuardStats {
            checks: self.checks.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
        }
    }
}

/// Scoped association created by [`ContextGuard::register_scoped`].
///
/// Dropping it removes the record, unless the object was registered again since.
#[must_use = "the object is untracked again as soon as the registration is dropped"]
pub struct Registration {
    guard: Arc<ContextGuard>,
    key: ObjectKey,
    generation: Option<u64>,
}

impl Registration {
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Whether a record was made; false when tracking was off at registration
    pub fn is_active(&self) -> bool {
        self.generation.is_some()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(generation) = self.generation {
            self.guard.release(&self.key, generation);
        }
    }
}
