//! End-to-end guard scenarios on explicit contexts and serial queues

use context_guard::{
    ConcurrencyType, ConfinedTypeRegistry, ContextGuard, ContextId, GuardError, RecordingHandler,
    SerialQueue, Violation,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn guard_with_recorder() -> (ContextGuard, RecordingHandler) {
    let recorder = RecordingHandler::new();
    (ContextGuard::with_handler(recorder.clone()), recorder)
}

#[test]
fn test_register_on_one_context_check_from_another() {
    let (guard, recorder) = guard_with_recorder();
    let a = String::from("A");
    let one = ContextId::Thread(1);
    let two = ContextId::Thread(2);

    guard.register_context(&a, one);

    assert!(guard.check_context_from(&a, "fetch", one));
    assert!(recorder.is_empty());

    assert!(!guard.check_context_from(&a, "fetch", two));
    assert_eq!(recorder.operations(), vec!["fetch"]);
}

#[test]
fn test_registration_while_disabled_never_takes_effect() {
    let (guard, recorder) = guard_with_recorder();
    let b = String::from("B");

    guard.end_tracking();
    guard.register_context(&b, ContextId::Thread(1));
    assert!(guard.check_context_from(&b, "save", ContextId::Thread(2)));

    // Still untracked once tracking comes back.
    guard.begin_tracking();
    assert!(guard.check_context_from(&b, "save", ContextId::Thread(2)));
    assert!(recorder.is_empty());
    assert!(!guard.is_tracked(&b));
}

#[test]
fn test_end_tracking_suppresses_known_violations_until_begin() {
    let (guard, recorder) = guard_with_recorder();
    let object = 10u64;
    guard.register_context(&object, ContextId::Queue(1));

    guard.end_tracking();
    for _ in 0..3 {
        assert!(guard.check_context_from(&object, "merge", ContextId::Queue(2)));
    }
    assert!(recorder.is_empty());

    guard.begin_tracking();
    assert!(!guard.check_context_from(&object, "merge", ContextId::Queue(2)));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_handler_replacement_takes_effect_immediately() {
    let first = RecordingHandler::new();
    let guard = ContextGuard::with_handler(first.clone());
    let object = 1i32;
    guard.register_context(&object, ContextId::Thread(1));

    assert!(!guard.check_context_from(&object, "before", ContextId::Thread(2)));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    guard.set_violation_handler(move |v: &Violation| sink.lock().push(v.operation.clone()));

    assert!(!guard.check_context_from(&object, "after", ContextId::Thread(2)));
    assert_eq!(first.operations(), vec!["before"]);
    assert_eq!(*calls.lock(), vec!["after".to_string()]);
}

#[test]
fn test_queue_owned_object_checked_from_queue_and_thread() {
    let (guard, recorder) = guard_with_recorder();
    let queue = SerialQueue::operation("import");
    let record = vec![0u8; 16];

    queue.run(|| guard.register_current(&record));
    assert_eq!(guard.context_of(&record), Some(queue.id()));

    assert!(queue.run(|| guard.check_context(&record, "read")));
    assert!(!guard.check_context(&record, "read"));

    let other = SerialQueue::operation("export");
    assert!(!other.run(|| guard.check_context(&record, "read")));

    let violations = recorder.violations();
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].actual, ContextId::current_thread());
    assert_eq!(violations[1].actual, other.id());
}

#[test]
fn test_ensure_context_propagates_with_question_mark() {
    struct Store<'g> {
        guard: &'g ContextGuard,
        rows: Vec<u32>,
    }

    impl Store<'_> {
        fn insert(&mut self, row: u32) -> Result<usize, GuardError> {
            self.guard.ensure_context(&*self, "insert")?;
            self.rows.push(row);
            Ok(self.rows.len())
        }
    }

    let (guard, recorder) = guard_with_recorder();
    let queue = SerialQueue::private("store");
    let mut store = Store {
        guard: &guard,
        rows: Vec::new(),
    };
    queue.run(|| guard.register_current(&store));

    assert_eq!(queue.run(|| store.insert(1)).unwrap(), 1);
    let err = store.insert(2).unwrap_err();
    assert!(matches!(err, GuardError::CrossContextAccess { .. }));
    assert_eq!(store.rows, vec![1]);
    assert_eq!(recorder.operations(), vec!["insert"]);
}

#[test]
fn test_registry_drives_tracking_by_type() {
    struct ManagedObject {
        _id: u64,
    }
    struct MainQueueObject {
        _id: u64,
    }

    let mut registry = ConfinedTypeRegistry::new();
    registry
        .register::<ManagedObject>(ConcurrencyType::PrivateQueue)
        .register::<MainQueueObject>(ConcurrencyType::MainQueue);

    let (guard, recorder) = guard_with_recorder();
    let guard = guard.with_registry(registry);
    let queue = SerialQueue::private("background");

    let managed = ManagedObject { _id: 1 };
    let on_main = MainQueueObject { _id: 2 };
    let plain = 3u8;

    queue.run(|| {
        assert!(guard.track(&managed));
        assert!(guard.track(&on_main));
        assert!(!guard.track(&plain));
    });

    assert_eq!(guard.context_of(&managed), Some(queue.id()));
    assert_eq!(guard.context_of(&on_main), Some(ContextId::MAIN_QUEUE));

    assert!(SerialQueue::main().run(|| guard.check_context(&on_main, "refresh")));
    assert!(!queue.run(|| guard.check_context(&on_main, "refresh")));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_scoped_registration_frees_reused_addresses() {
    let (guard, recorder) = guard_with_recorder();
    let guard = Arc::new(guard);

    for n in 0..100u64 {
        let value = Box::new(n);
        let registration = guard.register_scoped(&*value);
        assert_eq!(guard.context_of(&*value), Some(ContextId::current()));
        drop(registration);
        drop(value);

        let fresh = Box::new(n);
        assert!(guard.check_context_from(&*fresh, "read", ContextId::Thread(u64::MAX)));
    }

    assert!(recorder.is_empty());
    assert_eq!(guard.tracked_count(), 0);
}

#[test]
fn test_registered_struct_does_not_track_its_fields() {
    #[repr(C)]
    struct Row {
        id: u64,
        name: String,
    }

    let (guard, recorder) = guard_with_recorder();
    let row = Row {
        id: 7,
        name: "seven".to_string(),
    };
    guard.register_context(&row, ContextId::Thread(1));

    assert!(guard.check_context_from(&row.id, "read_id", ContextId::Thread(2)));
    assert!(!guard.is_tracked(&row.id));
    assert!(!guard.check_context_from(&row, "read", ContextId::Thread(2)));
    assert_eq!(recorder.operations(), vec!["read"]);
    assert_eq!(row.name, "seven");
}
