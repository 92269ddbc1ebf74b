//! Job handle combination/wait semantics and runtime dependency ordering.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use chunk_jobs::{JobHandle, JobRuntime};

mod common;
use common::InlineExecutor;

#[test]
fn ready_handle_is_complete_and_wait_returns() {
    let handle = JobHandle::ready();
    assert!(handle.is_complete());
    // Must not block, no matter how often it is waited on.
    handle.wait();
    handle.wait();
}

#[test]
fn deferred_handle_completes_on_set() {
    let (handle, signal) = JobHandle::deferred();
    assert!(!handle.is_complete());

    signal.set();
    assert!(handle.is_complete());
    handle.wait();

    // Setting again is a no-op.
    signal.set();
    assert!(handle.is_complete());
}

#[test]
fn dropping_signal_completes_the_handle() {
    let (handle, signal) = JobHandle::deferred();
    drop(signal);
    assert!(handle.is_complete());
}

#[test]
fn waiting_from_many_threads_is_safe() {
    let (handle, signal) = JobHandle::deferred();
    let woken = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            let woken = Arc::clone(&woken);
            thread::spawn(move || {
                handle.wait();
                woken.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    signal.set();
    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(woken.load(Ordering::SeqCst), 4);
}

#[test]
fn combined_handle_requires_both_inputs() {
    let (first, first_signal) = JobHandle::deferred();
    let (second, second_signal) = JobHandle::deferred();

    let combined = first.combine(&second);
    assert!(!combined.is_complete());

    first_signal.set();
    assert!(!combined.is_complete());

    second_signal.set();
    assert!(combined.is_complete());

    // Inputs remain independently waitable.
    first.wait();
    second.wait();
}

#[test]
fn ready_is_the_identity_of_combine() {
    let (pending, signal) = JobHandle::deferred();

    let left = JobHandle::ready().combine(&pending);
    let right = pending.combine(&JobHandle::ready());
    assert!(!left.is_complete());
    assert!(!right.is_complete());

    signal.set();
    assert!(left.is_complete());
    assert!(right.is_complete());
}

#[test]
fn combine_prunes_completed_states() {
    let (done, signal) = JobHandle::deferred();
    signal.set();

    let combined = done.combine(&JobHandle::ready());
    assert!(combined.is_complete());
    combined.wait();
}

#[test]
fn spawned_work_does_not_run_before_flush() {
    let runtime = JobRuntime::with_executor(Arc::new(InlineExecutor));
    let ran = Arc::new(AtomicBool::new(false));

    let ran_in_job = Arc::clone(&ran);
    let handle = runtime.spawn(&JobHandle::ready(), move || {
        ran_in_job.store(true, Ordering::SeqCst);
    });

    assert!(!ran.load(Ordering::SeqCst));
    assert!(!handle.is_complete());

    runtime.flush();
    assert!(ran.load(Ordering::SeqCst));
    assert!(handle.is_complete());
}

#[test]
fn spawned_work_waits_for_its_dependency() {
    let runtime = JobRuntime::with_executor(Arc::new(InlineExecutor));
    let (dependency, signal) = JobHandle::deferred();
    let ran = Arc::new(AtomicBool::new(false));

    let ran_in_job = Arc::clone(&ran);
    let handle = runtime.spawn(&dependency, move || {
        ran_in_job.store(true, Ordering::SeqCst);
    });

    runtime.flush();
    assert!(
        !ran.load(Ordering::SeqCst),
        "work must not start before its dependency completes"
    );

    signal.set();
    assert!(ran.load(Ordering::SeqCst));
    assert!(handle.is_complete());
}

#[test]
fn dependency_chains_run_in_order() {
    let runtime = JobRuntime::with_executor(Arc::new(InlineExecutor));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let first_order = Arc::clone(&order);
    let first = runtime.spawn(&JobHandle::ready(), move || {
        first_order.lock().unwrap().push(1);
    });

    let second_order = Arc::clone(&order);
    let second = runtime.spawn(&first, move || {
        second_order.lock().unwrap().push(2);
    });

    runtime.flush();
    second.wait();
    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
}

#[test]
fn already_complete_dependency_runs_at_flush() {
    let runtime = JobRuntime::with_executor(Arc::new(InlineExecutor));
    let (dependency, signal) = JobHandle::deferred();
    signal.set();

    let ran = Arc::new(AtomicBool::new(false));
    let ran_in_job = Arc::clone(&ran);
    runtime.spawn(&dependency, move || {
        ran_in_job.store(true, Ordering::SeqCst);
    });

    runtime.flush();
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn rayon_runtime_executes_spawned_work() {
    let runtime = JobRuntime::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = Arc::clone(&counter);
            runtime.spawn(&JobHandle::ready(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    runtime.flush();
    for handle in &handles {
        handle.wait();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 8);
}
