use anyhow::{Context as _, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{ExecutionContext, Job};

/// Fixed-size context backed by a rayon thread pool.
///
/// A `fork` keeps its lane busy while it waits for the computation it forked,
/// so a composition needs more lanes than its deepest chain of nested forks.
/// Below that the pool stalls.
pub struct RayonContext {
    pool: ThreadPool,
}

impl RayonContext {
    pub fn new(lanes: usize, name_prefix: &str) -> Result<Self> {
        let prefix = name_prefix.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(lanes)
            .thread_name(move |index| format!("{prefix}-{index}"))
            .panic_handler(|_| tracing::warn!("job panicked on rayon lane"))
            .build()
            .with_context(|| format!("Failed to build rayon pool with {lanes} lanes"))?;

        tracing::debug!(lanes, "rayon context started");
        Ok(Self { pool })
    }

    pub fn lanes(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ExecutionContext for RayonContext {
    fn spawn(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn name(&self) -> &str {
        "rayon"
    }
}
