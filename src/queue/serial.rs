use crate::{
    config::QueueConfig,
    dispatcher::Dispatcher,
    engine::SerialEngine,
    error::DispatchError,
    queue::DispatchQueue,
    timer::Timer,
    types::Task,
};
use std::{sync::Arc, time::Instant};

/// Queue running its tasks one at a time, in submission order, on the
/// workers of a [`Dispatcher`].
///
/// Tasks submitted from one thread run in the order they were submitted.
/// No two tasks of the same queue ever overlap, although consecutive tasks
/// may run on different worker threads. Clones share the same queue.
#[must_use]
#[derive(Debug)]
pub struct SerialQueue<D: Dispatcher> {
    inner: Arc<SerialShared<D>>,
}

#[derive(Debug)]
struct SerialShared<D: Dispatcher> {
    engine: Arc<SerialEngine<D>>,
    timer: Timer,
}

impl<D: Dispatcher> Clone for SerialQueue<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dispatcher> SerialQueue<D> {
    /// Serial queue over `dispatcher` with the default config.
    pub fn new(dispatcher: D) -> Self {
        Self::with_config(dispatcher, QueueConfig::default())
    }

    /// Serial queue over `dispatcher`, labeled by `config` in logs and in the
    /// alarm thread's name.
    pub fn with_config(dispatcher: D, config: QueueConfig) -> Self {
        let QueueConfig { label } = config;
        let label: Arc<str> = Arc::from(label);
        Self {
            inner: Arc::new(SerialShared {
                engine: SerialEngine::new(dispatcher, label.clone()),
                timer: Timer::new(label),
            }),
        }
    }

    /// Label this queue was configured with.
    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.engine.label()
    }
}

impl<D: Dispatcher> DispatchQueue for SerialQueue<D> {
    fn submit(&self, task: Task) -> Result<(), DispatchError> {
        self.inner.engine.submit(task)
    }

    fn submit_at(&self, deadline: Instant, task: Task) -> Result<(), DispatchError> {
        let job = task.into_job()?;
        let SerialShared { engine, timer } = &*self.inner;
        timer.dispatch_at(deadline, job, engine.clone())
    }
}
