use std::time::Duration;

use crate::error::ParResult;

/// Reference to a result that may not be available yet.
///
/// Three kinds of handle exist: [`Immediate`](super::Immediate) values that
/// were ready at construction, [`Submitted`](crate::context::Submitted) tasks
/// running on an execution context, and [`Merged`](super::Merged) pairs
/// combined by a function.
pub trait Handle<A>: Send + Sync {
    /// Attempt to cancel the work behind this handle. Returns whether
    /// anything was actually cancelled.
    fn cancel(&self, may_interrupt: bool) -> bool;

    fn is_cancelled(&self) -> bool;

    fn is_done(&self) -> bool;

    /// Block until the value is available. Never fails with a timeout.
    fn get(&self) -> ParResult<A>;

    /// Block for at most `timeout`, failing with
    /// [`ParError::Timeout`](crate::error::ParError::Timeout) when the value
    /// is still missing. A zero timeout polls once.
    fn get_timeout(&self, timeout: Duration) -> ParResult<A>;
}

/// Owned, type-erased handle
pub type BoxHandle<A> = Box<dyn Handle<A>>;
