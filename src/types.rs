use crate::{error::DispatchError, sync::UnsafeCell};
use core::fmt::{self, Debug, Formatter};
use derive_more::{Deref, DerefMut};

/// A minimal `UnsafeCell` wrapper that is `Sync` when `T: Send`.
///
/// Used by the serial engine for its current-work slot: the slot is written
/// only by the thread that won the `running` flag and read only by the worker
/// that thread handed the slot to, so no two threads ever touch it at once.
#[derive(Debug, Deref, DerefMut)]
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

unsafe impl<T: Send> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }
}

/// Type-erased unit of work accepted by a [`Dispatcher`](crate::dispatcher::Dispatcher).
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A task entry: work plus the context it runs with.
///
/// The context is either captured by the closure ([`Task::new`]) or bound
/// explicitly ([`Task::with_context`]). An empty task carries no work and is
/// rejected by every submission operation with
/// [`DispatchError::InvalidArgument`].
#[must_use]
#[derive(Default)]
pub struct Task {
    job: Option<Job>,
}

impl Debug for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Task running `work`, with whatever context it captures.
    pub fn new(work: impl FnOnce() + Send + 'static) -> Self {
        Self {
            job: Some(Box::new(work)),
        }
    }

    /// Task running `work(context)`.
    pub fn with_context<T: Send + 'static>(
        work: impl FnOnce(T) + Send + 'static,
        context: T,
    ) -> Self {
        Self::new(move || work(context))
    }

    /// Task without work.
    pub fn empty() -> Self {
        Self { job: None }
    }

    /// Whether this task carries no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.job.is_none()
    }

    pub(crate) fn into_job(self) -> Result<Job, DispatchError> {
        self.job.ok_or(DispatchError::InvalidArgument)
    }
}

impl From<Option<Job>> for Task {
    fn from(job: Option<Job>) -> Self {
        Self { job }
    }
}
