use super::{ExecutionContext, Job};

/// Runs every job on the thread that submits it.
///
/// Forked work still goes through a submitted handle, it just never changes
/// lanes, which makes results deterministic in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineContext;

impl ExecutionContext for InlineContext {
    fn spawn(&self, job: Job) {
        job();
    }

    fn name(&self) -> &str {
        "inline"
    }
}
