use crate::{engine::ImmediateSink, error::DispatchError, types::Job, utils::panic_message};
use derive_more::Debug;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::Instant,
};
use tracing::{debug, error, trace};

/// Deadline-ordered deferred submission onto a destination queue.
///
/// Any number of pending entries share one alarm thread, which sleeps until
/// the earliest deadline and is woken early only when a new entry becomes
/// the earliest one. The thread is started on first use and exits once the
/// owning queue is gone and no entries remain.
#[derive(Debug)]
pub(crate) struct Timer {
    label: Arc<str>,
    shared: Arc<TimerShared>,
}

#[derive(Debug, Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    alarm: Condvar,
}

#[derive(Debug, Default)]
struct TimerState {
    /// Sorted by descending deadline, so the next entry to fire is the tail.
    /// Equal deadlines keep insertion order towards the tail.
    entries: Vec<TimerEntry>,
    /// Deadline the alarm thread currently sleeps towards; `None` when
    /// disarmed.
    armed: Option<Instant>,
    alarm_thread: bool,
    shutdown: bool,
}

#[derive(Debug)]
struct TimerEntry {
    target: Instant,
    #[debug(skip)]
    job: Job,
    #[debug(skip)]
    destination: Arc<dyn ImmediateSink>,
}

impl Timer {
    pub(crate) fn new(label: Arc<str>) -> Self {
        Self {
            label,
            shared: Arc::default(),
        }
    }

    /// Register `job` to be submitted to `destination` once `target` has
    /// passed. A target in the past fires on the next drain pass.
    ///
    /// # Errors
    /// [`DispatchError::AlarmSpawn`] if the alarm thread is not running yet
    /// and cannot be started. Nothing is registered then.
    pub(crate) fn dispatch_at(
        &self,
        target: Instant,
        job: Job,
        destination: Arc<dyn ImmediateSink>,
    ) -> Result<(), DispatchError> {
        let mut state = self.shared.state.lock();
        if !state.alarm_thread {
            self.spawn_alarm()?;
            state.alarm_thread = true;
        }
        let rearm = state.schedule(TimerEntry {
            target,
            job,
            destination,
        });
        let pending = state.entries.len();
        drop(state);
        trace!(queue = %self.label, pending, rearm, "deferred work item registered");
        if rearm {
            self.shared.alarm.notify_one();
        }
        Ok(())
    }

    fn spawn_alarm(&self) -> Result<(), DispatchError> {
        let shared = self.shared.clone();
        let label = self.label.clone();
        thread::Builder::new()
            .name(format!("{}-alarm", self.label))
            .spawn(move || run_alarm(&shared, &label))
            .map_err(|err| DispatchError::AlarmSpawn(err.to_string()))?;
        debug!(queue = %self.label, "alarm thread started");
        Ok(())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.alarm.notify_one();
    }
}

impl TimerState {
    /// Insert `entry` in deadline order. Returns whether the alarm has to be
    /// rearmed for it.
    ///
    /// The decision compares against the deadline armed before the insert:
    /// after it the earliest pending deadline is never later than the new
    /// one, so that comparison could not tell whether the alarm moved.
    fn schedule(&mut self, entry: TimerEntry) -> bool {
        let target = entry.target;
        let index = self.entries.partition_point(|pending| pending.target > target);
        self.entries.insert(index, entry);
        let rearm = self.armed.is_none_or(|armed| target < armed);
        if rearm {
            self.armed = Some(target);
        }
        rearm
    }

    /// Remove every entry due at `now`, earliest first, and rearm for the
    /// earliest remaining one (or disarm).
    fn drain_due(&mut self, now: Instant) -> Vec<TimerEntry> {
        let mut due = vec![];
        while self.entries.last().is_some_and(|entry| entry.target <= now) {
            due.push(self.entries.pop().expect("TimerState::drain_due: [1]"));
        }
        self.armed = self.entries.last().map(|entry| entry.target);
        due
    }
}

/// Alarm thread body.
///
/// Wakes at the armed deadline, hands due entries to their destinations in
/// deadline order and sleeps towards the next one. Wakeups are never trusted
/// for timing: every pass compares the stored deadlines against the clock.
fn run_alarm(shared: &TimerShared, label: &str) {
    let mut state = shared.state.lock();
    loop {
        let Some(deadline) = state.armed else {
            if state.shutdown {
                break;
            }
            shared.alarm.wait(&mut state);
            continue;
        };
        let now = Instant::now();
        if now < deadline {
            let _ = shared.alarm.wait_until(&mut state, deadline);
            continue;
        }
        let due = state.drain_due(now);
        trace!(queue = %label, fired = due.len(), next = ?state.armed, "alarm fired");
        // Destinations may run work inline, and that work may register more
        // deferred work here.
        MutexGuard::unlocked(&mut state, || deliver(due, label));
    }
    state.alarm_thread = false;
    debug!(queue = %label, "alarm thread stopped");
}

/// Hand due entries to their destinations, earliest first. A destination
/// running work inline may panic; that must not cost the other entries or
/// the alarm thread.
fn deliver(due: Vec<TimerEntry>, label: &str) {
    for TimerEntry {
        job, destination, ..
    } in due
    {
        let delivery = AssertUnwindSafe(|| destination.submit_job(job));
        if let Err(payload) = panic::catch_unwind(delivery) {
            error!(
                queue = %label,
                message = panic_message(&*payload),
                "deferred work item panicked"
            );
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Recorder(Mutex<Vec<usize>>);

    impl ImmediateSink for Recorder {
        fn submit_job(self: Arc<Self>, job: Job) {
            job();
        }
    }

    fn entry(recorder: &Arc<Recorder>, target: Instant, value: usize) -> TimerEntry {
        let log = recorder.clone();
        TimerEntry {
            target,
            job: Box::new(move || log.0.lock().push(value)),
            destination: recorder.clone(),
        }
    }

    fn job(work: impl FnOnce() + Send + 'static) -> Job {
        Box::new(work)
    }

    fn fire(due: Vec<TimerEntry>) {
        deliver(due, "timer-test");
    }

    #[test]
    fn sooner_deadline_rearms_later_one_does_not() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let base = Instant::now();
        let mut state = TimerState::default();

        assert!(state.schedule(entry(&recorder, base + Duration::from_secs(60), 0)));
        assert_eq!(state.armed, Some(base + Duration::from_secs(60)));

        assert!(state.schedule(entry(&recorder, base + Duration::from_millis(10), 1)));
        assert_eq!(state.armed, Some(base + Duration::from_millis(10)));

        assert!(!state.schedule(entry(&recorder, base + Duration::from_secs(1), 2)));
        assert!(!state.schedule(entry(&recorder, base + Duration::from_millis(10), 3)));
        assert_eq!(state.armed, Some(base + Duration::from_millis(10)));
        assert_eq!(state.entries.len(), 4);
    }

    #[test]
    fn entries_stay_sorted_earliest_at_tail() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let base = Instant::now();
        let mut state = TimerState::default();
        for (value, millis) in [30, 10, 50, 20, 40].into_iter().enumerate() {
            state.schedule(entry(&recorder, base + Duration::from_millis(millis), value));
        }
        let targets: Vec<_> = state.entries.iter().map(|entry| entry.target).collect();
        assert!(targets.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(state.entries.last().map(|entry| entry.target), state.armed);
    }

    #[test]
    fn drain_fires_due_entries_earliest_first() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let base = Instant::now();
        let mut state = TimerState::default();
        state.schedule(entry(&recorder, base + Duration::from_millis(30), 2));
        state.schedule(entry(&recorder, base + Duration::from_millis(10), 0));
        state.schedule(entry(&recorder, base + Duration::from_secs(60), 9));
        state.schedule(entry(&recorder, base + Duration::from_millis(20), 1));

        let due = state.drain_due(base + Duration::from_millis(30));
        assert_eq!(due.len(), 3);
        fire(due);
        assert_eq!(*recorder.0.lock(), [0, 1, 2]);
        assert_eq!(state.armed, Some(base + Duration::from_secs(60)));

        assert!(state.drain_due(base + Duration::from_millis(31)).is_empty());
        assert_eq!(state.entries.len(), 1);

        fire(state.drain_due(base + Duration::from_secs(60)));
        assert_eq!(*recorder.0.lock(), [0, 1, 2, 9]);
        assert!(state.entries.is_empty());
        assert_eq!(state.armed, None);
    }

    #[test]
    fn equal_deadlines_fire_in_insertion_order() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let target = Instant::now();
        let mut state = TimerState::default();
        for value in 0..5 {
            state.schedule(entry(&recorder, target, value));
        }
        fire(state.drain_due(target));
        assert_eq!(*recorder.0.lock(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn past_target_fires_on_next_drain() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let target = Instant::now();
        let mut state = TimerState::default();
        assert!(state.schedule(entry(&recorder, target, 0)));
        fire(state.drain_due(Instant::now()));
        assert_eq!(*recorder.0.lock(), [0]);
    }

    #[test]
    fn alarm_thread_delivers_and_stops_after_drop() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let timer = Timer::new(Arc::from("timer-test"));
        let shared = timer.shared.clone();
        let base = Instant::now();
        for (value, millis) in [(1, 20), (0, 5)] {
            let log = recorder.clone();
            timer
                .dispatch_at(
                    base + Duration::from_millis(millis),
                    Box::new(move || log.0.lock().push(value)),
                    recorder.clone(),
                )
                .unwrap();
        }
        drop(timer);
        let deadline = Instant::now() + Duration::from_secs(5);
        while shared.state.lock().alarm_thread {
            assert!(Instant::now() < deadline, "alarm thread must stop");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(*recorder.0.lock(), [0, 1]);
    }

    #[test]
    fn panicking_delivery_spares_batch_and_alarm_thread() {
        let recorder = Arc::new(Recorder(Mutex::new(vec![])));
        let timer = Timer::new(Arc::from("timer-test"));
        let shared = timer.shared.clone();
        let base = Instant::now();
        let first = base + Duration::from_millis(5);
        let failing = job(|| panic!("deferred failure"));
        timer.dispatch_at(first, failing, recorder.clone()).unwrap();
        for (value, target) in [(0, first), (1, base + Duration::from_millis(30))] {
            let log = recorder.clone();
            let recording = job(move || log.0.lock().push(value));
            timer.dispatch_at(target, recording, recorder.clone()).unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while recorder.0.lock().len() < 2 {
            assert!(Instant::now() < deadline, "entries after the panic never fired");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(*recorder.0.lock(), [0, 1]);
        assert!(shared.state.lock().alarm_thread);
    }
}
