use crate::{
    config::QueueConfig,
    dispatcher::Dispatcher,
    error::DispatchError,
    queue::{DispatchQueue, SerialQueue},
    types::{Job, Task},
};
use derive_more::Debug;
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};

/// Serial queue whose tasks run only when a host loop calls [`pump`].
///
/// Meant for single-threaded hosts: all work runs on the thread that pumps,
/// one task per call, in the serial queue's order. Submission is allowed
/// from any thread; pumping must happen from one designated thread only.
///
/// [`pump`]: MainQueue::pump
#[must_use]
#[derive(Debug, Clone)]
pub struct MainQueue {
    queue: SerialQueue<Arc<HoldingCell>>,
    cell: Arc<HoldingCell>,
}

/// Dispatcher that parks the single job the serial engine hands it until
/// it is pumped.
#[derive(Debug, Default)]
struct HoldingCell {
    #[debug(skip)]
    slot: Mutex<Option<Job>>,
}

impl Dispatcher for HoldingCell {
    fn dispatch(&self, job: Job) {
        let mut slot = self.slot.lock();
        // The serial engine keeps at most one job in flight, so a second
        // dispatch before the first was pumped means its bookkeeping is broken.
        assert!(
            slot.is_none(),
            "HoldingCell::dispatch: previous work item is still unclaimed"
        );
        *slot = Some(job);
    }
}

impl HoldingCell {
    fn run_held(&self) -> bool {
        // Running the job dispatches the next one into the slot, so the lock
        // must be released first.
        let job = self.slot.lock().take();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MainQueue {
    /// Main queue labeled `"main"`. Nothing runs until some thread calls
    /// [`MainQueue::pump`].
    pub fn new() -> Self {
        Self::with_config(QueueConfig::labeled(QueueConfig::MAIN))
    }

    /// Main queue labeled by `config`.
    pub fn with_config(config: QueueConfig) -> Self {
        let cell = Arc::new(HoldingCell::default());
        Self {
            queue: SerialQueue::with_config(cell.clone(), config),
            cell,
        }
    }

    /// Label this queue was configured with.
    #[must_use]
    pub fn label(&self) -> &str {
        self.queue.label()
    }

    /// Run the next pending task on the calling thread.
    ///
    /// Returns `false` without doing anything when no task is pending.
    pub fn pump(&self) -> bool {
        self.cell.run_held()
    }
}

impl DispatchQueue for MainQueue {
    fn submit(&self, task: Task) -> Result<(), DispatchError> {
        self.queue.submit(task)
    }

    fn submit_at(&self, deadline: Instant, task: Task) -> Result<(), DispatchError> {
        self.queue.submit_at(deadline, task)
    }
}
