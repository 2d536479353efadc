#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

use dispatch_queue::{
    ConcurrentQueue, DispatchError, DispatchQueue, PoolConfig, RayonDispatcher, Task,
};
use std::{
    sync::{Arc, Barrier, mpsc},
    time::{Duration, Instant},
};

fn concurrent_queue(num_threads: usize) -> ConcurrentQueue<RayonDispatcher> {
    let pool = RayonDispatcher::with_config(&PoolConfig::default().with_num_threads(num_threads))
        .expect("pool must build");
    ConcurrentQueue::new(pool)
}

#[test]
fn every_task_runs() {
    let queue = concurrent_queue(4);
    assert_eq!(queue.label(), "concurrent");
    let (tx, rx) = mpsc::channel();
    for value in 0..100 {
        let tx = tx.clone();
        queue.submit(Task::new(move || tx.send(value).unwrap())).unwrap();
    }
    let mut seen: Vec<_> = (0..100)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..100).collect::<Vec<_>>());
}

#[test]
fn tasks_may_overlap() {
    // Both tasks wait for each other; only parallel execution lets them pass.
    let queue = concurrent_queue(2);
    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();
    for _ in 0..2 {
        let barrier = barrier.clone();
        let tx = tx.clone();
        queue
            .submit(Task::new(move || {
                barrier.wait();
                tx.send(()).unwrap();
            }))
            .unwrap();
    }
    for _ in 0..2 {
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
    }
}

#[test]
fn deferred_tasks_are_released_in_deadline_order() {
    // A single worker keeps release order observable.
    let queue = concurrent_queue(1);
    let (tx, rx) = mpsc::channel();
    let base = Instant::now();
    for (value, millis) in [(2, 45), (0, 15), (1, 30)] {
        let tx = tx.clone();
        queue
            .submit_at(
                base + Duration::from_millis(millis),
                Task::new(move || tx.send(value).unwrap()),
            )
            .unwrap();
    }
    let fired: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
        .collect();
    assert_eq!(fired, [0, 1, 2]);
}

#[test]
fn blocking_submission_returns_result() {
    let queue = concurrent_queue(2);
    assert_eq!(queue.submit_blocking(|| 6 * 7), Ok(42));
}

#[test]
fn empty_task_is_rejected() {
    let queue = concurrent_queue(1);
    assert_eq!(queue.submit(Task::empty()), Err(DispatchError::InvalidArgument));
    assert_eq!(
        queue.submit_after(Duration::ZERO, Task::empty()),
        Err(DispatchError::InvalidArgument)
    );
}
