//! Execution contexts
//!
//! The combinators never start threads themselves. Work that has to move to
//! another lane is handed to an [`ExecutionContext`], which only needs to
//! accept a boxed job. [`submit`] turns a fallible task into a job and hands
//! back the [`Submitted`] handle that tracks it.
//!
//! Three contexts ship with the crate:
//!
//! - [`ElasticPool`]: starts a new lane whenever no idle lane is available and
//!   retires idle lanes after a keep-alive period. Blocking `fork`s can nest
//!   arbitrarily deep without starving.
//! - [`RayonContext`]: a fixed-size rayon pool. Each `fork` holds a lane while
//!   it waits on its inner computation, so nested forks deeper than the pool
//!   size stall forever.
//! - [`InlineContext`]: runs every job on the submitting thread.
//!
//! ```rust
//! use forkpar::context::{self, InlineContext};
//! use forkpar::par::Handle;
//! use std::sync::Arc;
//!
//! let ctx: context::Context = Arc::new(InlineContext);
//! let handle = context::submit(&ctx, || Ok(6 * 7));
//! assert_eq!(handle.get().unwrap(), 42);
//! ```

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ContextConfig, ContextKind};
use crate::error::ParResult;
use crate::par::{BoxHandle, ParValue};

mod elastic;
mod inline;
mod rayon_pool;
mod submitted;

pub use elastic::ElasticPool;
pub use inline::InlineContext;
pub use rayon_pool::RayonContext;
pub use submitted::Submitted;

/// A unit of work handed to an execution context
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared execution context passed to every computation
pub type Context = Arc<dyn ExecutionContext>;

/// Task-submission service the combinators run on
pub trait ExecutionContext: Send + Sync {
    /// Run `job` at some point, on whatever lane the context chooses
    fn spawn(&self, job: Job);

    /// Short label used in log output
    fn name(&self) -> &str {
        "context"
    }
}

/// Submit `task` to `ctx` and return a handle to its eventual result.
///
/// Panics inside `task` are caught and reported through the handle as
/// execution failures.
pub fn submit<T, F>(ctx: &Context, task: F) -> BoxHandle<T>
where
    T: ParValue,
    F: FnOnce() -> ParResult<T> + Send + 'static,
{
    let (handle, job) = Submitted::new(task);
    tracing::trace!(context = ctx.name(), "submitting task");
    ctx.spawn(job);
    Box::new(handle)
}

/// Build the context described by `config`
pub fn from_config(config: &ContextConfig) -> Result<Context> {
    let context: Context = match config.kind {
        ContextKind::Elastic => Arc::new(ElasticPool::new(
            Duration::from_millis(config.keep_alive_ms),
            config.thread_name_prefix.clone(),
        )),
        ContextKind::Rayon => {
            let lanes = lanes_for(config.max_lanes, config.lane_percentage);
            Arc::new(RayonContext::new(lanes, &config.thread_name_prefix)?)
        }
        ContextKind::Inline => Arc::new(InlineContext),
    };
    tracing::debug!(context = context.name(), "execution context ready");
    Ok(context)
}

/// Number of lanes for a fixed-size context.
///
/// Takes `lane_percentage` percent of the available cores, never less than
/// one, and caps the result at `max_lanes` when that is non-zero.
pub fn lanes_for(max_lanes: usize, lane_percentage: u8) -> usize {
    let available_cores = num_cpus::get();

    let lanes_by_percentage = std::cmp::max(1, (available_cores * lane_percentage as usize) / 100);

    if max_lanes > 0 {
        std::cmp::min(max_lanes, lanes_by_percentage)
    } else {
        lanes_by_percentage
    }
}
