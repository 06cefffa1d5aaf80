use std::sync::Arc;

use super::{BoxHandle, Combine, Immediate, Merged, Par, ParValue};
use crate::context::{self, Context};
use crate::error::ParError;

/// Computation whose value is produced by `supplier` on the applying thread.
/// The context is never used.
pub fn unit<A, F>(supplier: F) -> Par<A>
where
    A: ParValue,
    F: Fn() -> A + Send + Sync + 'static,
{
    Par::new(move |_ctx: &Context| -> BoxHandle<A> { Box::new(Immediate::new(supplier())) })
}

/// Like [`unit`], for suppliers that can fail. A failure is reported by the
/// handle's `get` as an execution error.
pub fn try_unit<A, F>(supplier: F) -> Par<A>
where
    A: ParValue,
    F: Fn() -> anyhow::Result<A> + Send + Sync + 'static,
{
    Par::new(move |_ctx: &Context| -> BoxHandle<A> {
        match supplier() {
            Ok(value) => Box::new(Immediate::new(value)),
            Err(error) => Box::new(Immediate::failed(ParError::execution(error))),
        }
    })
}

/// Run the computation produced by `thunk` on a lane of the context.
///
/// The submitted task builds the computation, applies it to the same context
/// and blocks on its handle, holding the lane for the whole wait.
pub fn fork<A, F>(thunk: F) -> Par<A>
where
    A: ParValue,
    F: Fn() -> Par<A> + Send + Sync + 'static,
{
    let thunk = Arc::new(thunk);
    Par::new(move |ctx: &Context| -> BoxHandle<A> {
        let thunk = Arc::clone(&thunk);
        let lane_ctx = Arc::clone(ctx);
        context::submit(ctx, move || thunk().apply(&lane_ctx).get())
    })
}

/// Combine two computations with `f`.
///
/// Both sides are applied to the same context, left first, and `f` runs when
/// the merged handle is first retrieved.
pub fn map2<A, B, C, F>(a: Par<A>, b: Par<B>, f: F) -> Par<C>
where
    A: ParValue,
    B: ParValue,
    C: ParValue,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    let combine: Combine<A, B, C> = Arc::new(f);
    Par::new(move |ctx: &Context| -> BoxHandle<C> {
        let left = a.apply(ctx);
        let right = b.apply(ctx);
        Box::new(Merged::with_shared(left, right, Arc::clone(&combine)))
    })
}

/// Evaluate `supplier` on a lane instead of the applying thread
pub fn lazy_unit<A, F>(supplier: F) -> Par<A>
where
    A: ParValue,
    F: Fn() -> A + Send + Sync + 'static,
{
    let supplier = Arc::new(supplier);
    fork(move || {
        let supplier = Arc::clone(&supplier);
        unit(move || supplier())
    })
}

/// Hand `par` to `ctx` and get back a handle to its result
pub fn run<A: ParValue>(ctx: &Context, par: &Par<A>) -> BoxHandle<A> {
    tracing::trace!(context = ctx.name(), "running computation");
    par.apply(ctx)
}

/// Collect the results of `pars` in order, merging pairwise as a balanced
/// tree
pub fn sequence<A: ParValue>(mut pars: Vec<Par<A>>) -> Par<Vec<A>> {
    match pars.len() {
        0 => unit(Vec::new),
        1 => match pars.pop() {
            Some(only) => only.map(|value| vec![value]),
            None => unit(Vec::new),
        },
        len => {
            let right = pars.split_off(len / 2);
            map2(sequence(pars), sequence(right), |mut left, right| {
                left.extend(right);
                left
            })
        }
    }
}

/// Apply `f` to every item, each on its own lane
pub fn par_map<A, B, F>(items: Vec<A>, f: F) -> Par<Vec<B>>
where
    A: ParValue,
    B: ParValue,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let pars = items
        .into_iter()
        .map(|item| {
            let f = Arc::clone(&f);
            lazy_unit(move || f(item.clone()))
        })
        .collect();
    sequence(pars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ElasticPool, InlineContext};
    use crate::par::Handle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn elastic() -> Context {
        Arc::new(ElasticPool::new(Duration::from_secs(5), "combinator-test"))
    }

    /// Context that counts submissions before running them inline
    #[derive(Default)]
    struct Counting {
        submitted: AtomicUsize,
    }

    impl context::ExecutionContext for Counting {
        fn spawn(&self, job: context::Job) {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            job();
        }
    }

    #[test]
    fn test_unit_never_touches_context() {
        let counting = Arc::new(Counting::default());
        let ctx: Context = counting.clone();

        let handle = run(&ctx, &unit(|| 7));
        assert!(handle.is_done());
        assert!(!handle.cancel(true));
        assert_eq!(handle.get().unwrap(), 7);
        assert_eq!(counting.submitted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unit_evaluates_on_each_application() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let par = unit(move || counted.fetch_add(1, Ordering::SeqCst));
        let ctx: Context = Arc::new(InlineContext);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(run(&ctx, &par).get().unwrap(), 0);
        assert_eq!(run(&ctx, &par).get().unwrap(), 1);
    }

    #[test]
    fn test_fork_submits_exactly_once() {
        let counting = Arc::new(Counting::default());
        let ctx: Context = counting.clone();

        let handle = run(&ctx, &fork(|| unit(|| "forked")));
        assert_eq!(handle.get().unwrap(), "forked");
        assert_eq!(counting.submitted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fork_preserves_result() {
        let ctx = elastic();
        let par = map2(unit(|| 3), unit(|| 4), |a, b| a * b);
        let forked = {
            let par = par.clone();
            fork(move || par.clone())
        };
        assert_eq!(
            run(&ctx, &forked).get().unwrap(),
            run(&ctx, &par).get().unwrap()
        );
    }

    #[test]
    fn test_fork_runs_on_another_lane() {
        let ctx = elastic();
        let caller = std::thread::current().id();
        let par = fork(|| unit(|| std::thread::current().id()));
        assert_ne!(run(&ctx, &par).get().unwrap(), caller);
    }

    #[test]
    fn test_map2_matches_separate_runs() {
        let ctx = elastic();
        let a = lazy_unit(|| 6);
        let b = fork(|| unit(|| 7));
        let combined = map2(a.clone(), b.clone(), |x, y| x * y);

        let expected = run(&ctx, &a).get().unwrap() * run(&ctx, &b).get().unwrap();
        assert_eq!(run(&ctx, &combined).get().unwrap(), expected);
    }

    #[test]
    fn test_map2_does_not_fork() {
        let counting = Arc::new(Counting::default());
        let ctx: Context = counting.clone();
        let handle = run(&ctx, &map2(unit(|| 1), unit(|| 2), |a, b| a + b));
        assert_eq!(handle.get().unwrap(), 3);
        assert_eq!(counting.submitted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lazy_unit_defers_supplier_to_context() {
        let ctx = elastic();
        let caller = std::thread::current().id();
        let par = lazy_unit(|| std::thread::current().id());
        assert_ne!(run(&ctx, &par).get().unwrap(), caller);
    }

    #[test]
    fn test_try_unit_failure_surfaces_from_get() {
        let ctx: Context = Arc::new(InlineContext);
        let par: Par<u32> = try_unit(|| anyhow::bail!("sensor offline"));
        let err = run(&ctx, &par).get().unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "sensor offline");

        // Failures cross a fork unchanged
        let forked = fork(move || par.clone());
        let err = run(&ctx, &forked).get().unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "sensor offline");
    }

    #[test]
    fn test_panicking_fork_surfaces_from_get() {
        let ctx = elastic();
        let par: Par<i32> = fork(|| panic!("thunk blew up"));
        let err = run(&ctx, &par).get().unwrap_err();
        assert!(err.to_string().contains("thunk blew up"));
    }

    #[test]
    fn test_map_transforms_value() {
        let ctx: Context = Arc::new(InlineContext);
        let par = unit(|| 21).map(|x| x * 2).map(|x| format!("{x}"));
        assert_eq!(run(&ctx, &par).get().unwrap(), "42");
    }

    #[test]
    fn test_sequence_keeps_order() {
        let ctx = elastic();
        let pars = (0..9).map(|i| lazy_unit(move || i * i)).collect();
        let squares = run(&ctx, &sequence(pars)).get().unwrap();
        assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49, 64]);

        let empty: Vec<Par<i32>> = Vec::new();
        assert!(run(&ctx, &sequence(empty)).get().unwrap().is_empty());
    }

    #[test]
    fn test_par_map_applies_to_every_item() {
        let ctx = elastic();
        let words = vec!["fork", "map2", "unit"];
        let lengths = run(&ctx, &par_map(words, str::len)).get().unwrap();
        assert_eq!(lengths, vec![4, 4, 4]);
    }

    #[test]
    fn test_timed_get_on_slow_fork() {
        let ctx = elastic();
        let slow = lazy_unit(|| {
            std::thread::sleep(Duration::from_millis(200));
            1
        });
        let handle = run(&ctx, &slow);
        assert!(
            handle
                .get_timeout(Duration::from_millis(10))
                .unwrap_err()
                .is_timeout()
        );
        assert_eq!(handle.get().unwrap(), 1);
    }
}
