use crate::{error::DispatchError, types::Task};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Turn any asynchronous submission primitive into a blocking call.
///
/// `work` is wrapped so that a one-shot completion signal is set after it
/// returns; the wrapped task is handed to `submit` and the calling thread
/// waits on the signal. If the wrapped task is dropped without running to
/// completion (for instance because `work` panicked) the caller is woken
/// with [`DispatchError::Abandoned`].
///
/// # Errors
/// Whatever `submit` reports, or [`DispatchError::Abandoned`].
pub fn submit_blocking<R, F, S>(submit: S, work: F) -> Result<R, DispatchError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
    S: FnOnce(Task) -> Result<(), DispatchError>,
{
    let signal = Arc::new(OneShot::default());
    let notifier = Notifier {
        signal: Some(signal.clone()),
    };
    submit(Task::new(move || notifier.complete(work())))?;
    signal.wait()
}

#[derive(Debug)]
struct OneShot<R> {
    state: Mutex<Outcome<R>>,
    ready: Condvar,
}

impl<R> Default for OneShot<R> {
    fn default() -> Self {
        Self {
            state: Mutex::new(Outcome::Pending),
            ready: Condvar::new(),
        }
    }
}

#[derive(Debug)]
enum Outcome<R> {
    Pending,
    Done(R),
    Abandoned,
}

impl<R> OneShot<R> {
    fn set(&self, outcome: Outcome<R>) {
        *self.state.lock() = outcome;
        self.ready.notify_one();
    }

    fn wait(&self) -> Result<R, DispatchError> {
        let mut state = self.state.lock();
        loop {
            match std::mem::replace(&mut *state, Outcome::Pending) {
                Outcome::Pending => self.ready.wait(&mut state),
                Outcome::Done(value) => return Ok(value),
                Outcome::Abandoned => return Err(DispatchError::Abandoned),
            }
        }
    }
}

/// Sending half of the completion signal. Dropping it unsent reports the
/// work as abandoned.
struct Notifier<R> {
    signal: Option<Arc<OneShot<R>>>,
}

impl<R> Notifier<R> {
    fn complete(mut self, value: R) {
        if let Some(signal) = self.signal.take() {
            signal.set(Outcome::Done(value));
        }
    }
}

impl<R> Drop for Notifier<R> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.set(Outcome::Abandoned);
        }
    }
}
