use crate::{
    config::QueueConfig,
    dispatcher::Dispatcher,
    engine::ImmediateSink,
    error::DispatchError,
    queue::DispatchQueue,
    timer::Timer,
    types::{Job, Task},
};
use std::{sync::Arc, time::Instant};
use tracing::trace;

/// Queue handing every task straight to its [`Dispatcher`].
///
/// Tasks may run in parallel and complete in any order. Deferred tasks are
/// released in deadline order, then run as freely as immediate ones.
#[must_use]
#[derive(Debug)]
pub struct ConcurrentQueue<D: Dispatcher> {
    inner: Arc<ConcurrentShared<D>>,
}

#[derive(Debug)]
struct ConcurrentShared<D: Dispatcher> {
    sink: Arc<PassThrough<D>>,
    timer: Timer,
}

#[derive(Debug)]
struct PassThrough<D> {
    label: Arc<str>,
    dispatcher: D,
}

impl<D: Dispatcher> ImmediateSink for PassThrough<D> {
    fn submit_job(self: Arc<Self>, job: Job) {
        trace!(queue = %self.label, "dispatching work item");
        self.dispatcher.dispatch(job);
    }
}

impl<D: Dispatcher> Clone for ConcurrentQueue<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dispatcher> ConcurrentQueue<D> {
    /// Concurrent queue over `dispatcher` with the default config.
    pub fn new(dispatcher: D) -> Self {
        Self::with_config(dispatcher, QueueConfig::labeled(QueueConfig::CONCURRENT))
    }

    /// Concurrent queue over `dispatcher`, labeled by `config` in logs and in
    /// the alarm thread's name.
    pub fn with_config(dispatcher: D, config: QueueConfig) -> Self {
        let QueueConfig { label } = config;
        let label: Arc<str> = Arc::from(label);
        Self {
            inner: Arc::new(ConcurrentShared {
                sink: Arc::new(PassThrough {
                    label: label.clone(),
                    dispatcher,
                }),
                timer: Timer::new(label),
            }),
        }
    }

    /// Label this queue was configured with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.sink.label
    }
}

impl<D: Dispatcher> DispatchQueue for ConcurrentQueue<D> {
    fn submit(&self, task: Task) -> Result<(), DispatchError> {
        let job = task.into_job()?;
        self.inner.sink.clone().submit_job(job);
        Ok(())
    }

    fn submit_at(&self, deadline: Instant, task: Task) -> Result<(), DispatchError> {
        let job = task.into_job()?;
        let ConcurrentShared { sink, timer } = &*self.inner;
        timer.dispatch_at(deadline, job, sink.clone())
    }
}
