//! Guard behavior across real OS threads

use context_guard::{Confined, ContextGuard, ContextId, RecordingHandler, SerialQueue};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_object_created_on_one_thread_checked_from_others() {
    let recorder = RecordingHandler::new();
    let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
    let object = Arc::new(String::from("shared"));

    guard.register_current(&*object);
    assert!(guard.check_context(&*object, "read"));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let guard = guard.clone();
            let object = object.clone();
            thread::spawn(move || guard.check_context(&*object, "read"))
        })
        .collect();

    for worker in workers {
        assert!(!worker.join().unwrap());
    }
    assert_eq!(recorder.len(), 4);
    for violation in recorder.violations() {
        assert_eq!(violation.expected, ContextId::current_thread());
        assert_ne!(violation.actual, violation.expected);
    }
}

#[test]
fn test_concurrent_checks_and_registrations() {
    let recorder = RecordingHandler::new();
    let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let guard = guard.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let owned: Vec<Box<u64>> = (0..64).map(Box::new).collect();
                for value in &owned {
                    guard.register_current(&**value);
                }
                barrier.wait();
                let passed = owned
                    .iter()
                    .filter(|value| guard.check_context(&***value, "get"))
                    .count();
                for value in &owned {
                    guard.forget(&**value);
                }
                passed
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), 64);
    }
    assert!(recorder.is_empty());
    assert_eq!(guard.tracked_count(), 0);
    assert_eq!(guard.stats().registrations, 8 * 64);
}

#[test]
fn test_confined_value_moved_to_another_thread() {
    let recorder = RecordingHandler::new();
    let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
    let cell = Confined::new(guard.clone(), 41u32);

    let result = thread::spawn(move || cell.with("read", |v| *v + 1))
        .join()
        .unwrap();

    assert!(result.is_err());
    assert_eq!(recorder.operations(), vec!["read"]);
}

/// Runs a context check from its destructor, as a host object stored in a
/// thread-local would.
struct CheckOnDrop {
    guard: Arc<ContextGuard>,
    object: Box<u64>,
    passed: Arc<AtomicBool>,
}

impl Drop for CheckOnDrop {
    fn drop(&mut self) {
        let passed = self.guard.check_context(&*self.object, "drop")
            && self.guard.ensure_context(&*self.object, "drop").is_ok();
        SerialQueue::private("teardown").run(|| ());
        self.passed.store(passed, Ordering::SeqCst);
    }
}

thread_local! {
    static CHECK_ON_DROP: RefCell<Option<CheckOnDrop>> = const { RefCell::new(None) };
}

#[test]
fn test_check_during_thread_local_teardown_does_not_abort() {
    let recorder = RecordingHandler::new();
    let guard = Arc::new(ContextGuard::with_handler(recorder.clone()));
    let passed = Arc::new(AtomicBool::new(false));

    let worker = {
        let guard = guard.clone();
        let passed = passed.clone();
        thread::spawn(move || {
            // Touch our slot before the guard's own thread-locals so it is torn
            // down after them.
            CHECK_ON_DROP.with(|slot| slot.borrow().is_none());
            let object = Box::new(5u64);
            guard.register_current(&*object);
            CHECK_ON_DROP.with(|slot| {
                *slot.borrow_mut() = Some(CheckOnDrop {
                    guard,
                    object,
                    passed,
                })
            });
        })
    };

    assert!(worker.join().is_ok());
    assert!(passed.load(Ordering::SeqCst));
    assert!(recorder.is_empty());
}
