mod blocking;
mod concurrent;
mod main_queue;
mod serial;

pub use blocking::submit_blocking;
pub use concurrent::ConcurrentQueue;
pub use main_queue::MainQueue;
pub use serial::SerialQueue;

use crate::{error::DispatchError, types::Task, utils::WallClockToInstant};
use std::time::{Duration, Instant, SystemTime};

/// Submission surface shared by every queue flavor.
///
/// All operations return immediately except [`submit_blocking`], and all
/// reject an empty [`Task`] with [`DispatchError::InvalidArgument`] without
/// enqueuing anything. Submitted work runs exactly once; there is no
/// cancellation.
///
/// [`submit_blocking`]: DispatchQueue::submit_blocking
pub trait DispatchQueue: Send + Sync {
    /// Submit `task` for execution as soon as the queue's discipline allows.
    ///
    /// # Errors
    /// [`DispatchError::InvalidArgument`] for an empty task.
    fn submit(&self, task: Task) -> Result<(), DispatchError>;

    /// Submit `task` to this queue once `deadline` has passed. A deadline in
    /// the past is due immediately.
    ///
    /// Deferred tasks reach the queue in deadline order and from then on
    /// follow the queue's own discipline.
    ///
    /// # Errors
    /// [`DispatchError::InvalidArgument`] for an empty task,
    /// [`DispatchError::AlarmSpawn`] if the timer cannot be started.
    fn submit_at(&self, deadline: Instant, task: Task) -> Result<(), DispatchError>;

    /// Submit `task` to this queue once `delay` has elapsed.
    ///
    /// # Errors
    /// As [`DispatchQueue::submit_at`], plus
    /// [`DispatchError::DeadlineOutOfRange`] if `now + delay` overflows.
    fn submit_after(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        if task.is_empty() {
            return Err(DispatchError::InvalidArgument);
        }
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or(DispatchError::DeadlineOutOfRange)?;
        self.submit_at(deadline, task)
    }

    /// Submit `task` to this queue once the wall clock has passed `when`.
    ///
    /// The wall-clock time is converted to a monotonic deadline at
    /// submission; later clock adjustments do not move it.
    ///
    /// # Errors
    /// As [`DispatchQueue::submit_after`].
    fn submit_at_wall_clock(&self, when: SystemTime, task: Task) -> Result<(), DispatchError> {
        if task.is_empty() {
            return Err(DispatchError::InvalidArgument);
        }
        let deadline = when.to_instant().ok_or(DispatchError::DeadlineOutOfRange)?;
        self.submit_at(deadline, task)
    }

    /// Submit `work` and block until it has run, returning its result.
    ///
    /// Calling this from work running on the same serial queue (or from the
    /// thread pumping a [`MainQueue`]) deadlocks.
    ///
    /// # Errors
    /// [`DispatchError::Abandoned`] if `work` panics.
    fn submit_blocking<R, F>(&self, work: F) -> Result<R, DispatchError>
    where
        Self: Sized,
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        submit_blocking(|task| self.submit(task), work)
    }
}
