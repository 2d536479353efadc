use crate::{config::PoolConfig, error::DispatchError, types::Job, utils::panic_message};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    cell::RefCell,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::error;

/// Capability to run a job asynchronously on some worker.
///
/// Implementations give no ordering guarantee between independently
/// dispatched jobs, neither for start nor for completion. Queues build their
/// ordering on top of this.
///
/// `dispatch` must not panic: queues call it while unwinding out of failed
/// work, where a second panic aborts the process.
pub trait Dispatcher: Send + Sync + 'static {
    /// Run `job` at some future point, on some thread.
    fn dispatch(&self, job: Job);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, job: Job) {
        (**self).dispatch(job);
    }
}

/// Dispatcher backed by a rayon thread pool.
///
/// With [`RayonDispatcher::global`] jobs go to rayon's global pool, where a
/// panicking job aborts the process. A pool built by
/// [`RayonDispatcher::with_config`] logs such panics and keeps running.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct RayonDispatcher {
    pool: Option<Arc<ThreadPool>>,
}

impl RayonDispatcher {
    /// Dispatch onto rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Dispatch onto a dedicated pool built from `config`.
    ///
    /// # Errors
    /// If rayon fails to build the pool.
    pub fn with_config(config: &PoolConfig) -> Result<Self, DispatchError> {
        let PoolConfig {
            num_threads,
            thread_name_prefix,
        } = config.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |index| format!("{thread_name_prefix}-{index}"))
            .panic_handler(|payload| {
                error!(message = panic_message(&*payload), "work item panicked");
            })
            .build()
            .map_err(|err| DispatchError::PoolBuild(err.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }
}

impl Dispatcher for RayonDispatcher {
    fn dispatch(&self, job: Job) {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}

/// Runs every job on the dispatching thread before `dispatch` returns.
///
/// Useful as a deterministic test double. A job dispatched while another
/// inline job is running on the same thread is queued on that thread and run
/// after the running one finishes, so chains of nested submissions use
/// constant stack. A panicking job does not discard the queued ones: they
/// still run, then the first panic resumes out of the outermost `dispatch`.
/// Blocking on a nested inline submission from inside inline work therefore
/// never completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

thread_local! {
    /// Jobs waiting for the outermost inline `dispatch` on this thread.
    /// `None` while no inline job is running here.
    static INLINE_BACKLOG: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Clears the backlog marker when the outermost inline `dispatch` returns.
struct BacklogOwner;

impl Drop for BacklogOwner {
    fn drop(&mut self) {
        let leftover = INLINE_BACKLOG.with(|backlog| backlog.borrow_mut().take());
        debug_assert!(
            leftover.is_none_or(|jobs| jobs.is_empty()),
            "BacklogOwner::drop: inline jobs left behind"
        );
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        let job = INLINE_BACKLOG.with(|backlog| match backlog.borrow_mut().as_mut() {
            Some(jobs) => {
                jobs.push_back(job);
                None
            }
            None => Some(job),
        });
        let Some(job) = job else {
            return;
        };

        INLINE_BACKLOG.with(|backlog| *backlog.borrow_mut() = Some(VecDeque::new()));
        let _owner = BacklogOwner;
        let mut first_panic = None;
        let mut next = Some(job);
        while let Some(job) = next {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                first_panic.get_or_insert(payload);
            }
            next = INLINE_BACKLOG.with(|backlog| {
                backlog.borrow_mut().as_mut().and_then(VecDeque::pop_front)
            });
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }
}
