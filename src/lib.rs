//! Context Guard: Execution-Context Assertions
//!
//! Tags objects with the thread or serial queue they were created on and reports
//! a violation through a pluggable handler when they are touched from anywhere else.
//! Detection lives in [`ContextGuard`]; policy lives in the [`ViolationHandler`].

pub mod config;
pub mod confined;
pub mod context;
pub mod error;
pub mod guard;
pub mod handler;
pub mod logging;
pub mod registry;

pub use confined::Confined;
pub use context::{ConcurrencyType, ContextId, QueueScope, SerialQueue};
pub use error::GuardError;
pub use guard::{ContextGuard, GuardStats, ObjectKey, Registration, TRACKING_COMPILED};
pub use handler::{
    AbortHandler, LogHandler, NoopHandler, PanicHandler, RecordingHandler, Violation,
    ViolationHandler, ViolationPolicy,
};
pub use registry::{ConfinedType, ConfinedTypeRegistry};
