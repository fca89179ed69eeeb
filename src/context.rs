//! Execution contexts
//!
//! A context is either an OS thread or a serial queue the thread has entered.
//! The calling context is resolved from thread-local state: the innermost entered
//! queue wins, otherwise the thread itself.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread ids start at 1.
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// Queue id 0 is reserved for the main queue.
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXT: ContextId =
        ContextId::Thread(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
    static QUEUE_STACK: RefCell<Vec<ContextId>> = const { RefCell::new(Vec::new()) };
}

/// Identity of a thread or serial queue. Comparable for equality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextId {
    Thread(u64),
    Queue(u64),
}

impl ContextId {
    /// The process main queue
    pub const MAIN_QUEUE: ContextId = ContextId::Queue(0);

    /// Stand-in for a thread whose locals are already destroyed. Never handed
    /// out to a live thread.
    pub const DETACHED: ContextId = ContextId::Thread(0);

    /// Context the calling code runs on.
    ///
    /// Code running while the thread's locals are being torn down has no
    /// resolvable context and gets [`ContextId::DETACHED`].
    pub fn current() -> ContextId {
        Self::try_current().unwrap_or(Self::DETACHED)
    }

    /// Context the calling code runs on, or `None` during thread-local teardown
    pub fn try_current() -> Option<ContextId> {
        let queued = QUEUE_STACK
            .try_with(|stack| stack.borrow().last().copied())
            .ok()?;
        queued.or_else(|| THREAD_CONTEXT.try_with(|id| *id).ok())
    }

    /// Context of the calling thread, ignoring any entered queue
    pub fn current_thread() -> ContextId {
        THREAD_CONTEXT.try_with(|id| *id).unwrap_or(Self::DETACHED)
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, ContextId::Queue(_))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Thread(0) => write!(f, "thread#detached"),
            ContextId::Thread(id) => write!(f, "thread#{}", id),
            ContextId::Queue(0) => write!(f, "queue#main"),
            ContextId::Queue(id) => write!(f, "queue#{}", id),
        }
    }
}

/// How an object's owning context is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyType {
    /// Bound to the thread that created it
    Confinement,
    /// Bound to a private serial queue
    PrivateQueue,
    /// Bound to the main queue
    MainQueue,
    /// Bound to a serial operation queue
    OperationQueue,
}

impl ConcurrencyType {
    pub const ALL: [ConcurrencyType; 4] = [
        ConcurrencyType::Confinement,
        ConcurrencyType::PrivateQueue,
        ConcurrencyType::MainQueue,
        ConcurrencyType::OperationQueue,
    ];

    /// Stable raw value for FFI and persisted settings
    pub fn as_raw(self) -> u32 {
        match self {
            ConcurrencyType::Confinement => 0,
            ConcurrencyType::PrivateQueue => 1,
            ConcurrencyType::MainQueue => 2,
            ConcurrencyType::OperationQueue => 3,
        }
    }

    pub fn from_raw(raw: u32) -> Option<ConcurrencyType> {
        Self::ALL.into_iter().find(|kind| kind.as_raw() == raw)
    }

    /// Whether objects of this type are bound to a queue rather than a thread
    pub fn is_queue_based(self) -> bool {
        !matches!(self, ConcurrencyType::Confinement)
    }
}

/// A serial queue identity.
///
/// Code running "on" the queue does so by entering it; the queue does not
/// schedule or run anything on its own.
#[derive(Debug, Clone)]
pub struct SerialQueue {
    id: ContextId,
    kind: ConcurrencyType,
    label: String,
}

impl SerialQueue {
    /// The process main queue. Every call yields the same identity.
    pub fn main() -> Self {
        Self {
            id: ContextId::MAIN_QUEUE,
            kind: ConcurrencyType::MainQueue,
            label: "main".to_string(),
        }
    }

    /// A new private queue with a fresh identity
    pub fn private(label: impl Into<String>) -> Self {
        Self::with_kind(ConcurrencyType::PrivateQueue, label)
    }

    /// A new operation queue with a fresh identity
    pub fn operation(label: impl Into<String>) -> Self {
        Self::with_kind(ConcurrencyType::OperationQueue, label)
    }

    fn with_kind(kind: ConcurrencyType, label: impl Into<String>) -> Self {
        Self {
            id: ContextId::Queue(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            label: label.into(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn kind(&self) -> ConcurrencyType {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Make this queue the current context of the calling thread until the
    /// returned scope is dropped
    pub fn enter(&self) -> QueueScope {
        // During teardown there is no stack left to push onto.
        let _ = QUEUE_STACK.try_with(|stack| stack.borrow_mut().push(self.id));
        QueueScope {
            id: self.id,
            _not_send: PhantomData,
        }
    }

    /// Run `f` synchronously with this queue as the current context
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter();
        f()
    }
}

/// Scope during which a queue is the current context.
///
/// Pinned to the thread that entered the queue.
#[must_use = "the queue is left as soon as the scope is dropped"]
pub struct QueueScope {
    id: ContextId,
    _not_send: PhantomData<*const ()>,
}

impl QueueScope {
    pub fn id(&self) -> ContextId {
        self.id
    }
}

impl Drop for QueueScope {
    fn drop(&mut self) {
        let _ = QUEUE_STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            // Scopes may be dropped out of order; remove the innermost entry for this queue.
            if let Some(pos) = stack.iter().rposition(|id| *id == self.id) {
                stack.remove(pos);
            }
        });
    }
}
