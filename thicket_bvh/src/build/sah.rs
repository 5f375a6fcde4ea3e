// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-down builders: bucketed SAH, plus the midpoint and equal-count splits.
//!
//! The primitive info array is partitioned in place, so once the recursion is done
//! its order *is* the final primitive order and every leaf simply refers to the
//! range it was built from.

use alloc::collections::TryReserveError;

use glam::Vec3;

use super::{
    BuildArena, BuildOptions, Centroid, LEAF_CAPACITY, MAX_SAH_BUCKETS, NodeId, PrimitiveInfo,
    SplitMethod, partition,
};
use crate::bounds::Bounds3;
use crate::parallel;

/// Build a tree over `infos`, reordering it into leaf order.
pub(crate) fn build(
    infos: &mut [PrimitiveInfo],
    options: &BuildOptions,
) -> Result<(BuildArena, NodeId), TryReserveError> {
    debug_assert_ne!(
        options.split_method,
        SplitMethod::Hlbvh,
        "HLBVH builds go through hlbvh::build"
    );
    TopDown { options }.build_detached(infos, 0)
}

#[derive(Copy, Clone)]
struct TopDown<'a> {
    options: &'a BuildOptions,
}

impl TopDown<'_> {
    /// `offset` is the position of `infos[0]` in the full info array.
    fn build_range(
        self,
        arena: &mut BuildArena,
        infos: &mut [PrimitiveInfo],
        offset: usize,
    ) -> Result<NodeId, TryReserveError> {
        let n = infos.len();
        let bounds: Bounds3 = infos.iter().map(|info| info.bounds).collect();
        if n == 1 {
            return Ok(arena.push_leaf(bounds, offset, n));
        }

        let centroid_bounds: Bounds3 = infos.iter().map(|info| info.centroid).collect();
        let axis = centroid_bounds.max_extent();
        if centroid_bounds.upper[axis] == centroid_bounds.lower[axis] {
            return self.leaf_or_bisect(arena, infos, offset, bounds);
        }

        let Some(mid) = self.split(infos, &bounds, &centroid_bounds, axis) else {
            return Ok(arena.push_leaf(bounds, offset, n));
        };
        let (left, right) = infos.split_at_mut(mid);
        let (l, r) = if n >= self.options.parallel_threshold {
            let (left_built, right_built) = parallel::join(
                move || self.build_detached(left, offset),
                move || self.build_detached(right, offset + mid),
            );
            let (left_arena, left_root) = left_built?;
            let (right_arena, right_root) = right_built?;
            (
                arena.append(left_arena, left_root),
                arena.append(right_arena, right_root),
            )
        } else {
            (
                self.build_range(arena, left, offset)?,
                self.build_range(arena, right, offset + mid)?,
            )
        };
        Ok(arena.push_interior(axis, l, r))
    }

    /// Build `infos` into an arena of its own, reserved up front so that no push
    /// below reallocates.
    fn build_detached(
        self,
        infos: &mut [PrimitiveInfo],
        offset: usize,
    ) -> Result<(BuildArena, NodeId), TryReserveError> {
        let mut arena = BuildArena::new();
        // A binary tree with at least one primitive per leaf.
        arena.try_reserve(infos.len().saturating_mul(2) - 1)?;
        let root = self.build_range(&mut arena, infos, offset)?;
        Ok((arena, root))
    }

    /// The primitives cannot be told apart spatially: one leaf if it fits the
    /// record, otherwise split the range in half.
    fn leaf_or_bisect(
        self,
        arena: &mut BuildArena,
        infos: &mut [PrimitiveInfo],
        offset: usize,
        bounds: Bounds3,
    ) -> Result<NodeId, TryReserveError> {
        let n = infos.len();
        if n <= LEAF_CAPACITY {
            if n > self.options.max_primitives_per_leaf {
                log::trace!("{n} coincident primitives share one leaf");
            }
            return Ok(arena.push_leaf(bounds, offset, n));
        }
        let mid = n / 2;
        let (left, right) = infos.split_at_mut(mid);
        let l = self.build_range(arena, left, offset)?;
        let r = self.build_range(arena, right, offset + mid)?;
        Ok(arena.push_interior(bounds.max_extent(), l, r))
    }

    /// Partition `infos` for an interior node, or `None` if a leaf is cheaper.
    ///
    /// The returned split point is always strictly inside the range.
    fn split(
        self,
        infos: &mut [PrimitiveInfo],
        bounds: &Bounds3,
        centroid_bounds: &Bounds3,
        axis: usize,
    ) -> Option<usize> {
        let n = infos.len();
        let fits_leaf = n <= self.options.max_primitives_per_leaf;
        match self.options.split_method {
            SplitMethod::Middle if !fits_leaf => Some(
                split_middle(infos, centroid_bounds, axis)
                    .unwrap_or_else(|| split_equal_counts(infos, axis)),
            ),
            SplitMethod::EqualCounts if !fits_leaf => Some(split_equal_counts(infos, axis)),
            SplitMethod::Middle | SplitMethod::EqualCounts => None,
            // `build` rejects Hlbvh; its upper level calls `Buckets` directly.
            SplitMethod::Sah | SplitMethod::Hlbvh => {
                if n <= 2 {
                    return Some(split_equal_counts(infos, axis));
                }
                // Flat ranges have no area to weigh children against.
                let total_area = bounds.surface_area();
                if total_area == 0.0 {
                    return (!fits_leaf).then(|| split_equal_counts(infos, axis));
                }
                let sah = &self.options.sah;
                let buckets = Buckets::new(centroid_bounds, axis, sah.buckets);
                let best = buckets.best_split(infos, total_area, sah.traversal_cost);
                let split_pays = best.cost < n as f32;
                if fits_leaf && !split_pays {
                    return None;
                }
                let mid = partition(infos, |info| buckets.index(info.centroid) <= best.bucket);
                if mid == 0 || mid == n {
                    Some(split_equal_counts(infos, axis))
                } else {
                    Some(mid)
                }
            }
        }
    }
}

/// Equal-width centroid buckets along one axis.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Buckets {
    axis: usize,
    lower: f32,
    scale: f32,
    count: usize,
}

/// The cheapest bucket boundary: buckets `0..=bucket` go left.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct BucketSplit {
    pub(crate) bucket: usize,
    pub(crate) cost: f32,
}

impl Buckets {
    /// `centroid_bounds` must have a non-zero extent along `axis`.
    pub(crate) fn new(centroid_bounds: &Bounds3, axis: usize, count: usize) -> Self {
        debug_assert!((2..=MAX_SAH_BUCKETS).contains(&count), "bucket count out of range");
        let lower = centroid_bounds.lower[axis];
        let extent = centroid_bounds.upper[axis] - lower;
        Self {
            axis,
            lower,
            scale: count as f32 / extent,
            count,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Float-to-int casts saturate; the result is clamped to the last bucket."
    )]
    #[inline]
    pub(crate) fn index(&self, centroid: Vec3) -> usize {
        let b = ((centroid[self.axis] - self.lower) * self.scale) as usize;
        b.min(self.count - 1)
    }

    /// Evaluate `traversal_cost + (n_l · area_l + n_r · area_r) / total_area` for
    /// every bucket boundary with one suffix sweep and one prefix sweep.
    pub(crate) fn best_split<T: Centroid>(
        &self,
        items: &[T],
        total_area: f32,
        traversal_cost: f32,
    ) -> BucketSplit {
        let mut counts = [0_usize; MAX_SAH_BUCKETS];
        let mut boxes = [Bounds3::EMPTY; MAX_SAH_BUCKETS];
        for item in items {
            let b = self.index(item.centroid());
            counts[b] += 1;
            boxes[b] = boxes[b].union(item.bounds());
        }

        // right_*[i] describes buckets i + 1 .. count.
        let mut right_area = [0.0_f32; MAX_SAH_BUCKETS];
        let mut right_count = [0_usize; MAX_SAH_BUCKETS];
        let mut acc = Bounds3::EMPTY;
        let mut acc_count = 0;
        for i in (1..self.count).rev() {
            acc = acc.union(boxes[i]);
            acc_count += counts[i];
            right_area[i - 1] = acc.surface_area();
            right_count[i - 1] = acc_count;
        }

        let mut best = BucketSplit {
            bucket: 0,
            cost: f32::INFINITY,
        };
        let mut acc = Bounds3::EMPTY;
        let mut acc_count = 0;
        for i in 0..self.count - 1 {
            acc = acc.union(boxes[i]);
            acc_count += counts[i];
            let cost = traversal_cost
                + (acc_count as f32 * acc.surface_area()
                    + right_count[i] as f32 * right_area[i])
                    / total_area;
            if cost < best.cost {
                best = BucketSplit { bucket: i, cost };
            }
        }
        best
    }
}

/// Split at the centroid midpoint; `None` if every item falls on one side.
pub(crate) fn split_middle<T: Centroid>(
    items: &mut [T],
    centroid_bounds: &Bounds3,
    axis: usize,
) -> Option<usize> {
    let pmid = 0.5 * (centroid_bounds.lower[axis] + centroid_bounds.upper[axis]);
    let mid = partition(items, |item| item.centroid()[axis] < pmid);
    (mid != 0 && mid != items.len()).then_some(mid)
}

/// Place the median centroid at `len / 2`, smaller ones before it. Needs two items.
pub(crate) fn split_equal_counts<T: Centroid>(items: &mut [T], axis: usize) -> usize {
    debug_assert!(items.len() >= 2, "nothing to split");
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| a.centroid()[axis].total_cmp(&b.centroid()[axis]));
    mid
}
