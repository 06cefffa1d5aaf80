use std::time::Duration;

use super::{Handle, ParValue};
use crate::error::{ParError, ParResult};

/// Handle around a value that was already computed
#[derive(Debug, Clone)]
pub struct Immediate<A> {
    value: ParResult<A>,
}

impl<A> Immediate<A> {
    pub fn new(value: A) -> Self {
        Self { value: Ok(value) }
    }

    /// Handle whose computation failed before it could produce a value
    pub fn failed(error: ParError) -> Self {
        Self { value: Err(error) }
    }
}

impl<A: ParValue> Handle<A> for Immediate<A> {
    fn cancel(&self, _may_interrupt: bool) -> bool {
        false
    }

    fn is_cancelled(&self) -> bool {
        false
    }

    fn is_done(&self) -> bool {
        true
    }

    fn get(&self) -> ParResult<A> {
        self.value.clone()
    }

    fn get_timeout(&self, _timeout: Duration) -> ParResult<A> {
        self.get()
    }
}
