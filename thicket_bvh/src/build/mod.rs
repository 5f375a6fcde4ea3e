// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build configuration and the transient node arena shared by the builders.
//!
//! Every builder produces a [`BuildArena`] plus a root [`NodeId`] and the order in
//! which primitives are referenced by leaves. [`flatten`] then turns that into the
//! [`LinearNode`](crate::LinearNode) array kept by a [`Bvh`](crate::Bvh).

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use glam::Vec3;

use crate::bounds::Bounds3;
use crate::error::{BuildError, OptionsError};
use crate::math::MORTON_CODE_BITS;

pub(crate) mod flatten;
pub(crate) mod hlbvh;
mod radix;
pub(crate) mod sah;

/// Largest accepted `max_primitives_per_leaf`.
pub const MAX_PRIMITIVES_PER_LEAF: usize = 255;

/// Most primitives a single leaf record can reference.
///
/// Only reached when primitives cannot be separated at all (identical centroids or
/// identical Morton codes); larger runs of such primitives are bisected.
pub(crate) const LEAF_CAPACITY: usize = u16::MAX as usize;

/// Smallest accepted SAH bucket count.
pub const MIN_SAH_BUCKETS: usize = 2;

/// Largest accepted SAH bucket count.
pub const MAX_SAH_BUCKETS: usize = 32;

/// How interior nodes choose where to split their primitives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitMethod {
    /// Bucketed surface area heuristic, top-down.
    #[default]
    Sah,
    /// Morton-ordered treelets built in parallel, joined by SAH at the top.
    Hlbvh,
    /// Split at the midpoint of the centroid bounds along the widest axis.
    Middle,
    /// Split at the median centroid along the widest axis.
    EqualCounts,
}

/// Surface area heuristic parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SahOptions {
    /// Number of centroid buckets evaluated per split, in `2..=32`.
    pub buckets: usize,
    /// Cost of visiting an interior node, relative to one primitive test.
    pub traversal_cost: f32,
}

impl SahOptions {
    /// 12 buckets, traversal cost 1/8.
    pub const DEFAULT: Self = Self {
        buckets: 12,
        traversal_cost: 0.125,
    };
}

impl Default for SahOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// HLBVH parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HlbvhOptions {
    /// High Morton bits shared by the primitives of one treelet.
    ///
    /// 12 bits yields up to 4096 treelets on a 16³ grid. 0 puts every primitive in a
    /// single treelet.
    pub treelet_bits: u32,
}

impl HlbvhOptions {
    /// 12 treelet bits.
    pub const DEFAULT: Self = Self { treelet_bits: 12 };
}

impl Default for HlbvhOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything a build can be configured with.
///
/// ```
/// use thicket_bvh::{BuildOptions, SplitMethod};
///
/// let options = BuildOptions::new(SplitMethod::Hlbvh).with_max_primitives_per_leaf(2);
/// assert!(options.validate().is_ok());
/// assert!(BuildOptions::default().with_max_primitives_per_leaf(0).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BuildOptions {
    /// Split strategy.
    pub split_method: SplitMethod,
    /// Leaves hold at most this many primitives unless the primitives cannot be
    /// separated. In `1..=255`.
    pub max_primitives_per_leaf: usize,
    /// Used by [`SplitMethod::Sah`] and the upper level of [`SplitMethod::Hlbvh`].
    pub sah: SahOptions,
    /// Used by [`SplitMethod::Hlbvh`].
    pub hlbvh: HlbvhOptions,
    /// Ranges with at least this many primitives are split across threads.
    pub parallel_threshold: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new(SplitMethod::Sah)
    }
}

impl BuildOptions {
    /// Default options with the given split method.
    pub const fn new(split_method: SplitMethod) -> Self {
        Self {
            split_method,
            max_primitives_per_leaf: 4,
            sah: SahOptions::DEFAULT,
            hlbvh: HlbvhOptions::DEFAULT,
            parallel_threshold: 128 * 1024,
        }
    }

    /// Set the split method.
    #[must_use]
    pub const fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set the leaf size limit.
    #[must_use]
    pub const fn with_max_primitives_per_leaf(mut self, max: usize) -> Self {
        self.max_primitives_per_leaf = max;
        self
    }

    /// Set the SAH parameters.
    #[must_use]
    pub const fn with_sah(mut self, sah: SahOptions) -> Self {
        self.sah = sah;
        self
    }

    /// Set the HLBVH parameters.
    #[must_use]
    pub const fn with_hlbvh(mut self, hlbvh: HlbvhOptions) -> Self {
        self.hlbvh = hlbvh;
        self
    }

    /// Set the range size above which work is split across threads.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(1..=MAX_PRIMITIVES_PER_LEAF).contains(&self.max_primitives_per_leaf) {
            return Err(OptionsError::LeafSize {
                got: self.max_primitives_per_leaf,
                max: MAX_PRIMITIVES_PER_LEAF,
            });
        }
        if !(MIN_SAH_BUCKETS..=MAX_SAH_BUCKETS).contains(&self.sah.buckets) {
            return Err(OptionsError::BucketCount {
                got: self.sah.buckets,
                min: MIN_SAH_BUCKETS,
                max: MAX_SAH_BUCKETS,
            });
        }
        if !self.sah.traversal_cost.is_finite() || self.sah.traversal_cost < 0.0 {
            return Err(OptionsError::TraversalCost);
        }
        if self.hlbvh.treelet_bits > MORTON_CODE_BITS {
            return Err(OptionsError::TreeletBits {
                got: self.hlbvh.treelet_bits,
                max: MORTON_CODE_BITS,
            });
        }
        Ok(())
    }
}

/// What a builder knows about one primitive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimitiveInfo {
    /// Index into the caller's primitive list.
    pub primitive_index: u32,
    /// World bounds of the primitive.
    pub bounds: Bounds3,
    /// Center of `bounds`.
    pub centroid: Vec3,
}

impl PrimitiveInfo {
    /// Record a primitive and derive its centroid.
    #[inline]
    pub fn new(primitive_index: u32, bounds: Bounds3) -> Self {
        Self {
            primitive_index,
            bounds,
            centroid: bounds.centroid(),
        }
    }
}

/// Anything the bucketed SAH can partition: a box and a representative point.
pub(crate) trait Centroid {
    fn bounds(&self) -> Bounds3;
    fn centroid(&self) -> Vec3;
}

impl Centroid for PrimitiveInfo {
    #[inline]
    fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    #[inline]
    fn centroid(&self) -> Vec3 {
        self.centroid
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Arena length is checked against u32::MAX on push."
    )]
    const fn new(i: usize) -> Self {
        Self(i as u32)
    }

    pub(crate) const fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Kind {
    Leaf { first: u32, count: u16 },
    Interior { left: NodeId, right: NodeId, axis: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct BuildNode {
    pub(crate) bounds: Bounds3,
    pub(crate) kind: Kind,
}

/// Flat storage for a build tree. Children are always pushed before their parent.
///
/// Builders reserve `2n - 1` nodes for `n` primitives before pushing, so an
/// allocation failure surfaces from [`BuildArena::try_reserve`] and never from a push.
#[derive(Debug, Default)]
pub(crate) struct BuildArena {
    nodes: Vec<BuildNode>,
}

impl BuildArena {
    pub(crate) const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.nodes.try_reserve(additional)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &BuildNode {
        &self.nodes[id.get()]
    }

    fn push(&mut self, node: BuildNode) -> NodeId {
        debug_assert!(self.nodes.len() < u32::MAX as usize, "arena index overflow");
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Leaf over `count` primitives starting at `first` in the final primitive order.
    pub(crate) fn push_leaf(&mut self, bounds: Bounds3, first: usize, count: usize) -> NodeId {
        debug_assert!(count > 0 && count <= LEAF_CAPACITY, "leaf count out of range");
        self.push(BuildNode {
            bounds,
            kind: Kind::Leaf {
                first: to_u32(first),
                count: to_u16(count),
            },
        })
    }

    /// Interior node whose bounds are the union of its children.
    pub(crate) fn push_interior(&mut self, axis: usize, left: NodeId, right: NodeId) -> NodeId {
        let bounds = self.node(left).bounds.union(self.node(right).bounds);
        self.push(BuildNode {
            bounds,
            kind: Kind::Interior {
                left,
                right,
                axis: to_u8(axis),
            },
        })
    }

    /// Move every node of `other` into `self`; returns `root` renumbered.
    pub(crate) fn append(&mut self, other: Self, root: NodeId) -> NodeId {
        let shift = to_u32(self.nodes.len());
        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            if let Kind::Interior { left, right, .. } = &mut node.kind {
                left.0 += shift;
                right.0 += shift;
            }
            node
        }));
        NodeId(root.0 + shift)
    }
}

#[cfg(test)]
impl BuildArena {
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// `(first, count)` of every leaf under `root`, depth-first.
    pub(crate) fn leaf_ranges(&self, root: NodeId) -> Vec<(u32, u16)> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![root];
        while let Some(id) = stack.pop() {
            match self.node(id).kind {
                Kind::Leaf { first, count } => out.push((first, count)),
                Kind::Interior { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// Assert the leaves under `root` tile `0..n` without gaps or overlap.
    pub(crate) fn assert_leaves_tile(&self, root: NodeId, n: usize) {
        let mut ranges = self.leaf_ranges(root);
        ranges.sort_unstable();
        let mut next = 0;
        for (first, count) in ranges {
            assert_eq!(first as usize, next, "leaf ranges overlap or leave a gap");
            next += count as usize;
        }
        assert_eq!(next, n);
    }
}

/// A finished build tree and the primitive order its leaves refer to.
#[derive(Debug)]
pub(crate) struct Hierarchy {
    pub(crate) arena: BuildArena,
    pub(crate) root: NodeId,
    /// `order[k]` is the caller index of the primitive at position `k`.
    pub(crate) order: Vec<u32>,
}

/// Dispatch on `options.split_method`. `infos` must be non-empty.
pub(crate) fn build_hierarchy(
    mut infos: Vec<PrimitiveInfo>,
    options: &BuildOptions,
) -> Result<Hierarchy, BuildError> {
    debug_assert!(!infos.is_empty(), "empty builds are handled by the caller");
    match options.split_method {
        SplitMethod::Hlbvh => hlbvh::build(&infos, options),
        SplitMethod::Sah | SplitMethod::Middle | SplitMethod::EqualCounts => {
            let (arena, root) = sah::build(&mut infos, options)?;
            let mut order = Vec::new();
            order.try_reserve_exact(infos.len())?;
            order.extend(infos.iter().map(|info| info.primitive_index));
            Ok(Hierarchy { arena, root, order })
        }
    }
}

/// Move the items satisfying `pred` to the front; returns how many there are.
pub(crate) fn partition<T>(items: &mut [T], mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(mid, i);
            mid += 1;
        }
    }
    mid
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Primitive counts are checked against u32::MAX before building."
)]
#[inline]
pub(crate) const fn to_u32(i: usize) -> u32 {
    debug_assert!(i <= u32::MAX as usize, "index exceeds u32");
    i as u32
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Leaf sizes are bounded by LEAF_CAPACITY."
)]
#[inline]
const fn to_u16(i: usize) -> u16 {
    i as u16
}

#[allow(clippy::cast_possible_truncation, reason = "Axes are 0, 1 or 2.")]
#[inline]
const fn to_u8(axis: usize) -> u8 {
    debug_assert!(axis < 3, "axis out of range");
    axis as u8
}
