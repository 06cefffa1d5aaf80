//! Divide-and-conquer summation built only from the combinators
//!
//! The list is split in half recursively. Each half is forked and the two
//! results are added by `map2`, giving a balanced tree of depth `O(log n)`
//! whose leaves can run concurrently. Nothing runs until the returned
//! computation is applied to a context.

use std::ops::Add;
use std::sync::Arc;

use crate::par::{Par, ParValue, fork, map2, unit};

/// Sum `values` in parallel. The empty list sums to `T::default()`.
pub fn sum<T>(values: Vec<T>) -> Par<T>
where
    T: ParValue + Add<Output = T> + Default,
{
    let len = values.len();
    sum_range(Arc::from(values), 0, len)
}

fn sum_range<T>(values: Arc<[T]>, start: usize, end: usize) -> Par<T>
where
    T: ParValue + Add<Output = T> + Default,
{
    let len = end - start;
    if len <= 1 {
        return unit(move || {
            if len == 1 {
                values[start].clone()
            } else {
                T::default()
            }
        });
    }

    let mid = start + len / 2;
    let left_values = Arc::clone(&values);
    map2(
        fork(move || sum_range(Arc::clone(&left_values), start, mid)),
        fork(move || sum_range(Arc::clone(&values), mid, end)),
        |x, y| x + y,
    )
}
