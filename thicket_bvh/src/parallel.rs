// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-parallel helpers: rayon when the `rayon` feature is on, plain loops otherwise.
//!
//! Both variants share signatures (including the `Send`/`Sync` bounds) so the
//! builders compile identically either way.

use alloc::vec::Vec;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Run two closures, potentially in parallel.
#[cfg(feature = "rayon")]
#[inline]
pub(crate) fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

/// Run two closures, potentially in parallel.
#[cfg(not(feature = "rayon"))]
#[inline]
pub(crate) fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    (a(), b())
}

/// Append `f(index, item)` for every item, preserving order.
#[cfg(feature = "rayon")]
pub(crate) fn extend_mapped<T, U, F>(out: &mut Vec<U>, items: &[T], f: F)
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    out.par_extend(items.par_iter().enumerate().map(|(i, item)| f(i, item)));
}

/// Append `f(index, item)` for every item, preserving order.
#[cfg(not(feature = "rayon"))]
pub(crate) fn extend_mapped<T, U, F>(out: &mut Vec<U>, items: &[T], f: F)
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    out.extend(items.iter().enumerate().map(|(i, item)| f(i, item)));
}

/// Map every item mutably into a new vector, preserving order.
#[cfg(feature = "rayon")]
pub(crate) fn map_collect_mut<T, U, F>(items: &mut [T], f: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(&mut T) -> U + Sync + Send,
{
    items.par_iter_mut().map(f).collect()
}

/// Map every item mutably into a new vector, preserving order.
#[cfg(not(feature = "rayon"))]
pub(crate) fn map_collect_mut<T, U, F>(items: &mut [T], f: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(&mut T) -> U + Sync + Send,
{
    items.iter_mut().map(f).collect()
}

/// Call `f` on every item.
#[cfg(feature = "rayon")]
pub(crate) fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    items.par_iter_mut().for_each(f);
}

/// Call `f` on every item.
#[cfg(not(feature = "rayon"))]
pub(crate) fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    items.iter_mut().for_each(f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn helpers_preserve_order() {
        let items: Vec<u32> = (0..1000).collect();
        let mut out = Vec::new();
        extend_mapped(&mut out, &items, |i, v| (i, v * 2));
        assert!(out.iter().enumerate().all(|(i, &(j, v))| i == j && v as usize == 2 * i));

        let mut counters = vec![0_u32; 100];
        let before = map_collect_mut(&mut counters, |c| {
            *c += 1;
            *c - 1
        });
        assert!(before.iter().all(|&v| v == 0) && counters.iter().all(|&c| c == 1));

        let mut doubled = vec![1_u32; 64];
        for_each_mut(&mut doubled, |v| *v *= 2);
        assert!(doubled.iter().all(|&v| v == 2));

        let (a, b) = join(|| 1 + 1, || "right");
        assert_eq!((a, b), (2, "right"));
    }
}
