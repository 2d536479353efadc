use crate::{
    dispatcher::Dispatcher,
    error::DispatchError,
    sync::*,
    types::{Job, SyncUnsafeCell, Task},
};
use derive_more::Debug;
use std::sync::Arc;
use tracing::trace;

/// Immediate-submission path of a queue, as seen by the timer.
pub(crate) trait ImmediateSink: Send + Sync {
    fn submit_job(self: Arc<Self>, job: Job);
}

/// Serial scheduling engine: FIFO order, at most one job in flight.
///
/// The `running` flag is the only coordination on the submission path.
/// Whoever flips it from `false` to `true` owns the current-work slot until
/// the dispatched job finishes and clears the flag again.
#[derive(Debug)]
pub(crate) struct SerialEngine<D> {
    label: Arc<str>,
    running: AtomicBool,
    #[debug(skip)]
    fifo: Fifo<Job>,
    /// Written by the thread that won `running`, taken by the worker it
    /// dispatched to.
    #[debug(skip)]
    current: SyncUnsafeCell<Option<Job>>,
    dispatcher: D,
}

impl<D: Dispatcher> SerialEngine<D> {
    pub(crate) fn new(dispatcher: D, label: Arc<str>) -> Arc<Self> {
        Arc::new(Self {
            label,
            running: AtomicBool::new(false),
            fifo: Fifo::new(),
            current: SyncUnsafeCell::new(None),
            dispatcher,
        })
    }

    pub(crate) fn label(&self) -> &Arc<str> {
        &self.label
    }

    /// Append `task` to the FIFO and try to start it.
    ///
    /// # Errors
    /// [`DispatchError::InvalidArgument`] for an empty task; nothing is
    /// enqueued then.
    pub(crate) fn submit(self: &Arc<Self>, task: Task) -> Result<(), DispatchError> {
        let job = task.into_job()?;
        self.enqueue(job);
        Ok(())
    }

    fn enqueue(self: &Arc<Self>, job: Job) {
        self.fifo.push(job);
        self.attempt_dequeue();
    }

    /// Hand the FIFO head to the dispatcher unless a job is already in flight.
    ///
    /// Losing the CAS is fine: the job in flight drains the FIFO when it
    /// finishes. Winning it with an empty FIFO happens when a concurrent
    /// drain got there first; the flag is released and the check repeated so
    /// that an entry pushed in between is not stranded.
    fn attempt_dequeue(self: &Arc<Self>) {
        loop {
            store_load_fence();
            if self.fifo.is_empty() {
                return;
            }
            if self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            let Some(job) = self.fifo.pop() else {
                self.running.store(false, Ordering::SeqCst);
                continue;
            };
            // SAFETY: `running` was just flipped to `true` by this thread, and the
            // previous owner emptied the slot before releasing it. No other thread
            // touches the slot until the dispatched job takes it.
            unsafe {
                self.current.get_mut().with(|ptr| {
                    let slot = ptr.as_mut().expect("SerialEngine::attempt_dequeue: [1]");
                    assert!(slot.is_none(), "SerialEngine::attempt_dequeue: [2]");
                    *slot = Some(job);
                });
            }
            trace!(queue = %self.label, "dispatching work item");
            let engine = Arc::clone(self);
            self.dispatcher.dispatch(Box::new(move || engine.run_current()));
            return;
        }
    }

    /// Body of every dispatched job: run the current work, then release the
    /// flag and keep draining. The release happens in a drop guard so that it
    /// also runs when the work panics.
    fn run_current(self: Arc<Self>) {
        // SAFETY: This job was dispatched by the flag owner after it filled the
        // slot; the flag stays set until `Completion` drops, so this is the only
        // access to the slot.
        let job = unsafe {
            self.current.get_mut().with(|ptr| {
                ptr.as_mut()
                    .expect("SerialEngine::run_current: [1]")
                    .take()
                    .expect("SerialEngine::run_current: [2]")
            })
        };
        let _completion = Completion(&self);
        job();
    }

    #[cfg(all(test, not(feature = "loom")))]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Releases the flag and re-drains when the current work item is done.
///
/// Also drops while unwinding out of panicking work, so the `dispatch` call
/// reached through `attempt_dequeue` must not panic: a second panic during
/// unwinding aborts the process.
struct Completion<'a, D: Dispatcher>(&'a Arc<SerialEngine<D>>);

impl<D: Dispatcher> Drop for Completion<'_, D> {
    fn drop(&mut self) {
        let Self(engine) = self;
        engine.running.store(false, Ordering::SeqCst);
        trace!(queue = %engine.label, "work item complete");
        engine.attempt_dequeue();
    }
}

impl<D: Dispatcher> ImmediateSink for SerialEngine<D> {
    fn submit_job(self: Arc<Self>, job: Job) {
        self.enqueue(job);
    }
}
