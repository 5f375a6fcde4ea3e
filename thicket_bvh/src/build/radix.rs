// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-place most-significant-digit radix sort on 32-bit keys.
//!
//! Each level distributes a slice into 64 buckets by one 6-bit digit using the
//! "American flag" cycle walk, then recurses into the buckets with the next digit.
//! Buckets are independent, so large slices sort them in parallel.

use smallvec::SmallVec;

use crate::parallel;

const DIGIT_BITS: u32 = 6;
const RADIX: usize = 1 << DIGIT_BITS;
const INSERTION_SORT_THRESHOLD: usize = 32;

/// Sort `items` by `key`, which must be below `2^key_bits`.
pub(crate) fn sort_by_key<T, K>(items: &mut [T], key_bits: u32, parallel_threshold: usize, key: K)
where
    T: Send,
    K: Fn(&T) -> u32 + Copy + Send + Sync,
{
    debug_assert!(key_bits <= 32, "keys are 32-bit");
    sort_digit(items, key_bits.saturating_sub(DIGIT_BITS), parallel_threshold, key);
}

fn sort_digit<T, K>(items: &mut [T], shift: u32, parallel_threshold: usize, key: K)
where
    T: Send,
    K: Fn(&T) -> u32 + Copy + Send + Sync,
{
    if items.len() < INSERTION_SORT_THRESHOLD {
        insertion_sort(items, key);
        return;
    }
    let digit = |item: &T| (key(item) >> shift) as usize & (RADIX - 1);

    let mut counts = [0_usize; RADIX];
    for item in items.iter() {
        counts[digit(item)] += 1;
    }
    let mut next = [0_usize; RADIX];
    let mut ends = [0_usize; RADIX];
    let mut sum = 0;
    for ((start, end), &count) in next.iter_mut().zip(&mut ends).zip(&counts) {
        *start = sum;
        sum += count;
        *end = sum;
    }

    // Every swap drops one item into its final bucket.
    for d in 0..RADIX {
        while next[d] < ends[d] {
            let target = digit(&items[next[d]]);
            if target == d {
                next[d] += 1;
            } else {
                items.swap(next[d], next[target]);
                next[target] += 1;
            }
        }
    }

    if shift == 0 {
        return;
    }
    let next_shift = shift.saturating_sub(DIGIT_BITS);
    let parallel = items.len() >= parallel_threshold;

    let mut buckets: SmallVec<[&mut [T]; RADIX]> = SmallVec::new();
    let mut rest = items;
    for &count in &counts {
        let (head, tail) = core::mem::take(&mut rest).split_at_mut(count);
        if head.len() > 1 {
            buckets.push(head);
        }
        rest = tail;
    }
    let recurse = |bucket: &mut &mut [T]| sort_digit(bucket, next_shift, parallel_threshold, key);
    if parallel {
        parallel::for_each_mut(&mut buckets, recurse);
    } else {
        buckets.iter_mut().for_each(recurse);
    }
}

fn insertion_sort<T, K: Fn(&T) -> u32>(items: &mut [T], key: K) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && key(&items[j - 1]) > key(&items[j]) {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Deterministic 30-bit keys.
    fn keys(n: usize, seed: u32) -> Vec<u32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                state >> 2
            })
            .collect()
    }

    #[test]
    fn sorts_like_the_standard_library() {
        for (n, threshold) in [(0, 1), (1, 1), (31, 1), (32, 1), (5000, usize::MAX), (20_000, 512)] {
            let mut ours = keys(n, 7);
            let mut expected = ours.clone();
            expected.sort_unstable();
            sort_by_key(&mut ours, 30, threshold, |&k| k);
            assert_eq!(ours, expected, "n = {n}");
        }
    }

    #[test]
    fn keeps_payloads_with_their_keys() {
        let mut pairs: Vec<(u32, usize)> = keys(3000, 11)
            .into_iter()
            .map(|k| k & 0xFF)
            .enumerate()
            .map(|(i, k)| (k, i))
            .collect();
        let original = pairs.clone();
        sort_by_key(&mut pairs, 30, usize::MAX, |p| p.0);
        assert!(pairs.windows(2).all(|w| w[0].0 <= w[1].0));
        for &(k, i) in &pairs {
            assert_eq!(original[i].0, k);
        }
    }

    #[test]
    fn handles_all_equal_keys() {
        let mut same = alloc::vec![0x2AAA_AAAA_u32 & ((1 << 30) - 1); 1000];
        sort_by_key(&mut same, 30, 1, |&k| k);
        assert!(same.windows(2).all(|w| w[0] == w[1]));
    }
}
