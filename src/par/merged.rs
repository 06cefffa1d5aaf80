use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{BoxHandle, Handle, ParValue};
use crate::error::{ParError, ParResult};

/// Shared binary combining function
pub type Combine<A, B, C> = Arc<dyn Fn(A, B) -> C + Send + Sync>;

struct MergeState<C> {
    value: Option<C>,
    /// Set while one caller waits on the children and combines
    computing: bool,
}

/// Handle combining two child handles with a binary function.
///
/// The combination runs on whichever thread first calls `get`, at most once;
/// later calls return the cached value. Callers arriving while another one
/// is combining wait for it, within their own timeout.
///
/// Timed retrieval does not split its budget between the children. The left
/// child gets the whole timeout and the right child gets whatever is left, so
/// the total wait can exceed the requested timeout by up to the time spent on
/// the left child.
pub struct Merged<A, B, C> {
    left: BoxHandle<A>,
    right: BoxHandle<B>,
    combine: Combine<A, B, C>,
    state: Mutex<MergeState<C>>,
    settled: Condvar,
}

/// Clears the computing flag when the claiming caller finishes, however it
/// finishes
struct Claim<'a, C> {
    state: &'a Mutex<MergeState<C>>,
    settled: &'a Condvar,
}

impl<C> Drop for Claim<'_, C> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .computing = false;
        self.settled.notify_all();
    }
}

impl<A, B, C> Merged<A, B, C>
where
    A: ParValue,
    B: ParValue,
    C: ParValue,
{
    pub fn new<F>(left: BoxHandle<A>, right: BoxHandle<B>, combine: F) -> Self
    where
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        Self::with_shared(left, right, Arc::new(combine))
    }

    /// Build from a combining function shared with other handles
    pub fn with_shared(left: BoxHandle<A>, right: BoxHandle<B>, combine: Combine<A, B, C>) -> Self {
        Self {
            left,
            right,
            combine,
            state: Mutex::new(MergeState {
                value: None,
                computing: false,
            }),
            settled: Condvar::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MergeState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value, or claim the right to compute it. Waits for
    /// a caller already computing, until `deadline` if there is one.
    fn claim(&self, deadline: Option<Instant>, timeout: Duration) -> ParResult<Result<C, Claim<'_, C>>> {
        let mut state = self.lock_state();
        loop {
            if let Some(value) = state.value.as_ref() {
                return Ok(Ok(value.clone()));
            }
            if !state.computing {
                state.computing = true;
                return Ok(Err(Claim {
                    state: &self.state,
                    settled: &self.settled,
                }));
            }

            state = match deadline {
                None => self
                    .settled
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(ParError::Timeout(timeout));
                    }
                    self.settled
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn compute(&self, timeout: Option<Duration>) -> ParResult<C> {
        let start = Instant::now();
        let deadline = timeout.and_then(|timeout| start.checked_add(timeout));
        let claim = match self.claim(deadline, timeout.unwrap_or_default())? {
            Ok(cached) => return Ok(cached),
            Err(claim) => claim,
        };

        let (a, b) = match timeout {
            None => (self.left.get()?, self.right.get()?),
            Some(timeout) => {
                // Time spent waiting for another caller counts against the left child
                let a = self.left.get_timeout(timeout.saturating_sub(start.elapsed()))?;
                let b = self.right.get_timeout(timeout.saturating_sub(start.elapsed()))?;
                (a, b)
            }
        };

        tracing::trace!("combining merged results");
        let value =
            catch_unwind(AssertUnwindSafe(|| (self.combine)(a, b))).map_err(ParError::from_panic)?;
        self.lock_state().value = Some(value.clone());
        drop(claim);
        Ok(value)
    }
}

impl<A, B, C> Handle<C> for Merged<A, B, C>
where
    A: ParValue,
    B: ParValue,
    C: ParValue,
{
    /// Cancels the left child, and the right child only if the left one
    /// reports nothing was cancelled.
    fn cancel(&self, may_interrupt: bool) -> bool {
        self.left.cancel(may_interrupt) || self.right.cancel(may_interrupt)
    }

    fn is_cancelled(&self) -> bool {
        self.left.is_cancelled() || self.right.is_cancelled()
    }

    /// Done once the combined value is cached. A `get` still combining counts
    /// as not done.
    fn is_done(&self) -> bool {
        self.lock_state().value.is_some()
    }

    fn get(&self) -> ParResult<C> {
        self.compute(None)
    }

    fn get_timeout(&self, timeout: Duration) -> ParResult<C> {
        self.compute(Some(timeout))
    }
}
