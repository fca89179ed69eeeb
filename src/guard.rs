//! Context guard
//!
//! Associates tracked objects with the context they were created on and checks
//! that context on method entry. Two builds of [`ContextGuard`] share one API:
//! the instrumented guard, and a zero-sized no-op used when tracking is compiled
//! out (see the `tracking` and `release-tracking` features).

use serde::{Deserialize, Serialize};

#[cfg(any(feature = "release-tracking", all(feature = "tracking", debug_assertions)))]
mod instrumented;
#[cfg(not(any(feature = "release-tracking", all(feature = "tracking", debug_assertions))))]
mod noop;

#[cfg(any(feature = "release-tracking", all(feature = "tracking", debug_assertions)))]
pub use instrumented::{ContextGuard, Registration};
#[cfg(not(any(feature = "release-tracking", all(feature = "tracking", debug_assertions))))]
pub use noop::{ContextGuard, Registration};

/// Whether the instrumented guard was compiled into this build
pub const TRACKING_COMPILED: bool = cfg!(any(
    feature = "release-tracking",
    all(feature = "tracking", debug_assertions)
));

/// Identity of a tracked object: its address and its type.
///
/// Holds no reference, so it never extends the object's lifetime. The type keeps
/// a struct apart from its first field, which shares the address. An address can
/// still be reused by a later object of the same type once the first is gone;
/// [`ContextGuard::register_scoped`] drops the record together with the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    addr: usize,
    type_name: &'static str,
}

impl ObjectKey {
    pub fn of<T: ?Sized>(object: &T) -> Self {
        ObjectKey {
            addr: object as *const T as *const () as usize,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Snapshot of guard activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardStats {
    /// Checks evaluated while tracking was on
    pub checks: u64,
    /// Checks that found a cross-context access
    pub violations: u64,
    /// Associations recorded
    pub registrations: u64,
}
