use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::Job;
use crate::error::{ParError, ParResult};
use crate::par::{Handle, ParValue};

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETED: u8 = 2;
const CANCELLED: u8 = 3;

/// Lifecycle shared between a submitted job and its handle
struct TaskSlot<T> {
    state: AtomicU8,
    outcome: Mutex<Option<ParResult<T>>>,
    settled: Condvar,
}

impl<T: Clone> TaskSlot<T> {
    fn run<F>(&self, task: F)
    where
        F: FnOnce() -> ParResult<T>,
    {
        if self
            .state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("skipping cancelled task");
            return;
        }

        let outcome = match catch_unwind(AssertUnwindSafe(task)) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let error = ParError::from_panic(payload);
                tracing::warn!("submitted task {}", error);
                Err(error)
            }
        };

        // Cancelled while running: the result is discarded
        if self
            .state
            .compare_exchange(RUNNING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.settle(outcome);
        }
    }

    fn cancel(&self, may_interrupt: bool) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            || (may_interrupt
                && self
                    .state
                    .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok());

        if cancelled {
            self.settle(Err(ParError::Cancelled));
        }
        cancelled
    }

    fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn lock_outcome(&self) -> MutexGuard<'_, Option<ParResult<T>>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the first outcome and wake every waiter
    fn settle(&self, outcome: ParResult<T>) {
        let mut slot = self.lock_outcome();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        drop(slot);
        self.settled.notify_all();
    }

    /// Wait for the outcome. The lock is released while waiting, so every
    /// caller keeps its own deadline.
    fn wait(&self, timeout: Option<Duration>) -> ParResult<T> {
        let slot = self.lock_outcome();
        let slot = match timeout {
            None => self
                .settled
                .wait_while(slot, |outcome| outcome.is_none())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.settled
                    .wait_timeout_while(slot, timeout, |outcome| outcome.is_none())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };

        match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => Err(ParError::Timeout(timeout.unwrap_or_default())),
        }
    }
}

/// Handle to a task submitted to an execution context.
///
/// Cancellation is cooperative: a running task keeps running, but its result
/// is dropped and retrieval reports [`ParError::Cancelled`]. Any number of
/// threads may wait on the same handle, each with its own timeout.
pub struct Submitted<T> {
    slot: Arc<TaskSlot<T>>,
}

impl<T: ParValue> Submitted<T> {
    /// Pair a handle with the job that fulfils it
    pub fn new<F>(task: F) -> (Self, Job)
    where
        F: FnOnce() -> ParResult<T> + Send + 'static,
    {
        let slot = Arc::new(TaskSlot {
            state: AtomicU8::new(PENDING),
            outcome: Mutex::new(None),
            settled: Condvar::new(),
        });

        let job_slot = Arc::clone(&slot);
        let job: Job = Box::new(move || job_slot.run(task));

        (Self { slot }, job)
    }
}

impl<T: ParValue> Handle<T> for Submitted<T> {
    fn cancel(&self, may_interrupt: bool) -> bool {
        self.slot.cancel(may_interrupt)
    }

    fn is_cancelled(&self) -> bool {
        self.slot.state() == CANCELLED
    }

    fn is_done(&self) -> bool {
        matches!(self.slot.state(), COMPLETED | CANCELLED)
    }

    fn get(&self) -> ParResult<T> {
        self.slot.wait(None)
    }

    fn get_timeout(&self, timeout: Duration) -> ParResult<T> {
        self.slot.wait(Some(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_pending_task_times_out_then_completes() {
        let (handle, job) = Submitted::new(|| Ok(5));
        assert!(!handle.is_done());
        assert!(handle.get_timeout(Duration::ZERO).unwrap_err().is_timeout());

        job();
        assert!(handle.is_done());
        assert_eq!(handle.get_timeout(Duration::ZERO).unwrap(), 5);
        assert_eq!(handle.get().unwrap(), 5);
    }

    #[test]
    fn test_cancel_before_start_skips_task() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_task = Arc::clone(&ran);
        let (handle, job) = Submitted::new(move || {
            ran_in_task.store(true, Ordering::SeqCst);
            Ok(1)
        });

        assert!(handle.cancel(false));
        assert!(handle.is_cancelled());
        assert!(handle.is_done());
        // Second cancel has nothing left to cancel
        assert!(!handle.cancel(true));

        job();
        assert!(!ran.load(Ordering::SeqCst));
        assert!(matches!(handle.get(), Err(ParError::Cancelled)));
    }

    #[test]
    fn test_completed_task_cannot_be_cancelled() {
        let (handle, job) = Submitted::new(|| Ok("value"));
        job();
        assert!(!handle.cancel(true));
        assert!(!handle.is_cancelled());
        assert_eq!(handle.get().unwrap(), "value");
    }

    #[test]
    fn test_task_errors_propagate_unchanged() {
        let (handle, job) =
            Submitted::<u8>::new(|| Err(ParError::execution(anyhow::anyhow!("bad input"))));
        job();
        let err = handle.get().unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "bad input");
        // Cached: the second retrieval sees the same failure
        assert_eq!(handle.get().unwrap_err().to_string(), err.to_string());
    }

    #[test]
    fn test_cancel_running_task_needs_interrupt() {
        let (started_tx, started_rx) = bounded(1);
        let (release_tx, release_rx) = bounded::<()>(1);
        let (handle, job) = Submitted::new(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            Ok(9)
        });
        let lane = thread::spawn(job);
        started_rx.recv().unwrap();

        // Running tasks are left alone without permission to interrupt
        assert!(!handle.cancel(false));
        assert!(!handle.is_cancelled());
        assert!(!handle.is_done());

        assert!(handle.cancel(true));
        assert!(handle.is_cancelled());
        assert!(handle.is_done());
        assert!(matches!(handle.get(), Err(ParError::Cancelled)));

        // The task finishes anyway, but its value is dropped
        release_tx.send(()).unwrap();
        lane.join().unwrap();
        assert!(matches!(handle.get(), Err(ParError::Cancelled)));
        assert!(matches!(
            handle.get_timeout(Duration::ZERO),
            Err(ParError::Cancelled)
        ));
        assert!(!handle.cancel(true));
    }

    #[test]
    fn test_timed_get_keeps_its_budget_behind_a_blocked_get() {
        let (handle, job) = Submitted::new(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(1)
        });
        let handle = Arc::new(handle);
        let lane = thread::spawn(job);

        let waiter = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.get())
        };
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        let err = handle.get_timeout(Duration::from_millis(50)).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(300));

        // Every waiter sees the value once it arrives
        assert_eq!(waiter.join().unwrap().unwrap(), 1);
        assert_eq!(handle.get_timeout(Duration::ZERO).unwrap(), 1);
        lane.join().unwrap();
    }
}
