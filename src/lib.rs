//! Dispatch queues over a pluggable worker pool.
//!
//! This crate lets callers submit units of work ("tasks") to queues that
//! share a worker pool, under one of two ordering disciplines:
//! - **Serial**: at most one task of the queue in flight at a time, FIFO.
//!   Guarded by a single atomic flag flipped with compare-and-swap, so the
//!   submission path takes no lock.
//! - **Concurrent**: tasks go straight to the pool and run as soon as a
//!   worker is free, in no particular order.
//!
//! Every queue also accepts deferred submissions, released into the queue
//! once a delay or deadline has passed. All pending deferred tasks of a
//! queue share one alarm, rearmed only when the earliest deadline changes.
//!
//! Key modules:
//! - `queue`: the `DispatchQueue` trait and the `SerialQueue`,
//!   `ConcurrentQueue` and `MainQueue` flavors, plus the blocking
//!   submission wrapper.
//! - `dispatcher`: the `Dispatcher` capability the queues run their work
//!   on, with a rayon-backed and an inline implementation.
//! - `types`: the `Task` entry submitted to queues.
//! - `config` and `error`: queue and pool settings, submission errors.
//!
//! Quick start:
//! 1. Pick a dispatcher, e.g. `RayonDispatcher::global()`.
//! 2. Build a queue over it, e.g. `SerialQueue::new(dispatcher)`.
//! 3. Submit `Task::new(|| ...)` via `submit`, `submit_after` or
//!    `submit_blocking`.
//!
//! A `MainQueue` needs no dispatcher: its tasks run when a host loop calls
//! `MainQueue::pump`.

/// Queue and worker-pool settings.
pub mod config;
/// The worker-pool capability queues dispatch their work to.
///
/// Exposes the `Dispatcher` trait plus `RayonDispatcher` for real worker
/// threads and `InlineDispatcher` for deterministic tests.
pub mod dispatcher;
mod engine;
/// Errors reported by submissions and queue setup.
pub mod error;
/// The public queue surface.
///
/// Defines the `DispatchQueue` trait implemented by every queue flavor and
/// the generic `submit_blocking` adapter.
pub mod queue;
mod sync;
mod timer;
/// Task entries and the type-erased job handed to dispatchers.
pub mod types;
mod utils;

pub use crate::{
    config::{PoolConfig, QueueConfig},
    dispatcher::{Dispatcher, InlineDispatcher, RayonDispatcher},
    error::DispatchError,
    queue::{ConcurrentQueue, DispatchQueue, MainQueue, SerialQueue, submit_blocking},
    types::{Job, Task},
};
