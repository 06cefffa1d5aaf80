//! Deferred parallel computations
//!
//! A [`Par<A>`] describes how to produce an `A` once it is given an execution
//! context. Building one does no work; applying it to a context (through
//! [`run`]) yields a [`Handle`] to the eventual value.
//!
//! # Combinators
//!
//! | Combinator     | Runs on                    | Handle      |
//! |----------------|----------------------------|-------------|
//! | [`unit`]       | the applying thread        | `Immediate` |
//! | [`lazy_unit`]  | a lane of the context      | `Submitted` |
//! | [`fork`]       | a lane of the context      | `Submitted` |
//! | [`map2`]       | whoever calls `get`        | `Merged`    |
//!
//! `fork` is the only combinator that introduces concurrency. `map2` applies
//! both sides to the same context without forking either, and combines them
//! lazily on retrieval. Wrap it in `fork` to move the combination to a lane.
//!
//! A forked task blocks its lane until the computation it forked finishes, so
//! nested forks occupy more lanes than are logically busy.
//!
//! # Example
//!
//! ```rust
//! use forkpar::context::{Context, ElasticPool};
//! use forkpar::par::{Handle, fork, map2, run, unit};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let ctx: Context = Arc::new(ElasticPool::new(Duration::from_secs(1), "doc"));
//! let answer = map2(fork(|| unit(|| 40)), unit(|| 2), |a, b| a + b);
//! assert_eq!(run(&ctx, &answer).get().unwrap(), 42);
//! ```

use std::sync::Arc;

use crate::context::Context;

mod combinators;
mod handle;
mod immediate;
mod merged;

pub use combinators::{fork, lazy_unit, map2, par_map, run, sequence, try_unit, unit};
pub use handle::{BoxHandle, Handle};
pub use immediate::Immediate;
pub use merged::{Combine, Merged};

/// Bounds shared by every value flowing through a computation
pub trait ParValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> ParValue for T {}

/// Anything that can turn an execution context into a handle
pub trait Computation<A>: Send + Sync {
    fn apply(&self, ctx: &Context) -> BoxHandle<A>;
}

impl<A, F> Computation<A> for F
where
    F: Fn(&Context) -> BoxHandle<A> + Send + Sync,
{
    fn apply(&self, ctx: &Context) -> BoxHandle<A> {
        self(ctx)
    }
}

/// Description of a computation producing an `A`.
///
/// Cheap to clone. Each application is independent and yields a fresh
/// handle.
pub struct Par<A> {
    computation: Arc<dyn Computation<A>>,
}

impl<A> Clone for Par<A> {
    fn clone(&self) -> Self {
        Self {
            computation: Arc::clone(&self.computation),
        }
    }
}

impl<A: ParValue> Par<A> {
    pub fn new<C>(computation: C) -> Self
    where
        C: Computation<A> + 'static,
    {
        Self {
            computation: Arc::new(computation),
        }
    }

    pub fn apply(&self, ctx: &Context) -> BoxHandle<A> {
        self.computation.apply(ctx)
    }

    /// Transform the eventual value without forking
    pub fn map<B, F>(self, f: F) -> Par<B>
    where
        B: ParValue,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        map2(self, unit(|| ()), move |a, _| f(a))
    }
}
