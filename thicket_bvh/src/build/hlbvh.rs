// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HLBVH: Morton-sorted treelets emitted in parallel, then joined with SAH.
//!
//! 1. Every centroid is quantized into a 1024³ grid over the centroid bounds and
//!    encoded as a 30-bit Morton code.
//! 2. The codes are radix sorted, which clusters nearby primitives.
//! 3. Runs sharing the top `treelet_bits` bits become treelets. Each treelet is
//!    split bit by bit (LBVH) on its own thread into its own arena. Leaves claim
//!    their slots in the shared output order with one atomic fetch-add.
//! 4. Treelet roots are combined with the bucketed SAH.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use glam::Vec3;

use super::sah::{Buckets, split_equal_counts};
use super::{
    BuildArena, BuildOptions, Centroid, Hierarchy, LEAF_CAPACITY, NodeId, PrimitiveInfo,
    SahOptions, partition, radix,
};
use crate::bounds::Bounds3;
use crate::error::BuildError;
use crate::math::{MORTON_CODE_BITS, MORTON_SCALE, encode_morton_3};
use crate::parallel;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MortonPrimitive {
    pub(crate) primitive_index: u32,
    pub(crate) code: u32,
}

/// Mask selecting the top `bits` of a 30-bit Morton code.
pub(crate) const fn treelet_mask(bits: u32) -> u32 {
    if bits == 0 {
        0
    } else {
        ((1 << bits) - 1) << (MORTON_CODE_BITS - bits)
    }
}

pub(crate) fn build(
    infos: &[PrimitiveInfo],
    options: &BuildOptions,
) -> Result<Hierarchy, BuildError> {
    let n = infos.len();
    let centroid_bounds: Bounds3 = infos.iter().map(|info| info.centroid).collect();
    let scale = MORTON_SCALE as f32;

    let mut morton = Vec::new();
    morton.try_reserve_exact(n)?;
    parallel::extend_mapped(&mut morton, infos, |_, info| MortonPrimitive {
        primitive_index: info.primitive_index,
        code: encode_morton_3(centroid_bounds.offset(info.centroid) * scale),
    });
    radix::sort_by_key(
        &mut morton,
        MORTON_CODE_BITS,
        options.parallel_threshold,
        |p: &MortonPrimitive| p.code,
    );

    let mask = treelet_mask(options.hlbvh.treelet_bits);
    let same_treelet = |a: &MortonPrimitive, b: &MortonPrimitive| a.code & mask == b.code & mask;
    let mut treelets: Vec<&mut [MortonPrimitive]> = Vec::new();
    treelets.try_reserve_exact(morton.chunk_by(same_treelet).count())?;
    treelets.extend(morton.chunk_by_mut(same_treelet));
    log::trace!(
        "HLBVH: {} treelets, largest holds {} primitives",
        treelets.len(),
        treelets.iter().map(|t| t.len()).max().unwrap_or(0)
    );

    let mut slots = Vec::new();
    slots.try_reserve_exact(n)?;
    slots.resize_with(n, || AtomicU32::new(0));
    let next_slot = AtomicUsize::new(0);
    let total_nodes = AtomicUsize::new(0);
    let bits_left = MORTON_CODE_BITS - options.hlbvh.treelet_bits;

    let built = parallel::map_collect_mut(&mut treelets, |prims| {
        let mut arena = BuildArena::new();
        arena.try_reserve(2 * prims.len() - 1)?;
        let mut emitter = Emitter {
            infos,
            max_leaf: options.max_primitives_per_leaf,
            slots: &slots,
            next_slot: &next_slot,
            arena,
        };
        let root = emitter.emit(prims, bits_left);
        total_nodes.fetch_add(emitter.arena.len(), Ordering::Relaxed);
        Ok::<_, TryReserveError>((emitter.arena, root))
    });

    // The upper level adds one interior node per treelet beyond the first.
    let treelet_count = built.len();
    let mut arena = BuildArena::new();
    arena.try_reserve(total_nodes.into_inner() + treelet_count - 1)?;
    let mut roots = Vec::new();
    roots.try_reserve_exact(treelet_count)?;
    for result in built {
        let (treelet, root) = result?;
        let node = arena.append(treelet, root);
        let bounds = arena.node(node).bounds;
        roots.push(TreeletRoot {
            node,
            bounds,
            centroid: bounds.centroid(),
        });
    }
    debug_assert_eq!(next_slot.load(Ordering::Relaxed), n, "every primitive lands in one leaf");
    let root = build_upper(&mut arena, &mut roots, &options.sah);

    let mut order = Vec::new();
    order.try_reserve_exact(n)?;
    order.extend(slots.into_iter().map(AtomicU32::into_inner));
    Ok(Hierarchy { arena, root, order })
}

/// Emits the LBVH of one treelet.
struct Emitter<'a> {
    infos: &'a [PrimitiveInfo],
    max_leaf: usize,
    slots: &'a [AtomicU32],
    next_slot: &'a AtomicUsize,
    arena: BuildArena,
}

impl Emitter<'_> {
    /// Split `prims` on the highest of the low `bits_left` bits where they differ.
    fn emit(&mut self, prims: &mut [MortonPrimitive], bits_left: u32) -> NodeId {
        let n = prims.len();
        if n <= self.max_leaf {
            return self.leaf(prims);
        }
        let Some(bit) = bits_left.checked_sub(1) else {
            return self.emit_by_centroid(prims);
        };
        let mask = 1 << bit;
        if prims[0].code & mask == prims[n - 1].code & mask {
            return self.emit(prims, bit);
        }
        // Sorted and sharing every higher bit: the zeros come first.
        let split = prims.partition_point(|p| p.code & mask == 0);
        let (low, high) = prims.split_at_mut(split);
        let l = self.emit(low, bit);
        let r = self.emit(high, bit);
        self.arena.push_interior((bit % 3) as usize, l, r)
    }

    /// Identical codes: the centroids share one grid cell but may still differ, so
    /// bisect at their median. Only truly coincident centroids share an oversized leaf.
    fn emit_by_centroid(&mut self, prims: &mut [MortonPrimitive]) -> NodeId {
        let n = prims.len();
        if n <= self.max_leaf {
            return self.leaf(prims);
        }
        let infos = self.infos;
        let centroid = |p: &MortonPrimitive| infos[p.primitive_index as usize].centroid;
        let centroid_bounds: Bounds3 = prims.iter().map(centroid).collect();
        let axis = centroid_bounds.max_extent();
        if centroid_bounds.upper[axis] == centroid_bounds.lower[axis] && n <= LEAF_CAPACITY {
            log::trace!("{n} coincident primitives share one leaf");
            return self.leaf(prims);
        }
        let mid = n / 2;
        prims.select_nth_unstable_by(mid, |a, b| centroid(a)[axis].total_cmp(&centroid(b)[axis]));
        let (low, high) = prims.split_at_mut(mid);
        let l = self.emit_by_centroid(low);
        let r = self.emit_by_centroid(high);
        self.arena.push_interior(axis, l, r)
    }

    fn leaf(&mut self, prims: &[MortonPrimitive]) -> NodeId {
        let first = self.next_slot.fetch_add(prims.len(), Ordering::Relaxed);
        let mut bounds = Bounds3::EMPTY;
        for (slot, p) in self.slots[first..first + prims.len()].iter().zip(prims) {
            slot.store(p.primitive_index, Ordering::Relaxed);
            bounds = bounds.union(self.infos[p.primitive_index as usize].bounds);
        }
        self.arena.push_leaf(bounds, first, prims.len())
    }
}

#[derive(Copy, Clone, Debug)]
struct TreeletRoot {
    node: NodeId,
    bounds: Bounds3,
    centroid: Vec3,
}

impl Centroid for TreeletRoot {
    #[inline]
    fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    #[inline]
    fn centroid(&self) -> Vec3 {
        self.centroid
    }
}

fn build_upper(arena: &mut BuildArena, roots: &mut [TreeletRoot], sah: &SahOptions) -> NodeId {
    if let [only] = roots {
        return only.node;
    }
    let bounds: Bounds3 = roots.iter().map(|r| r.bounds).collect();
    let centroid_bounds: Bounds3 = roots.iter().map(|r| r.centroid).collect();
    let axis = centroid_bounds.max_extent();
    let mid = if centroid_bounds.upper[axis] == centroid_bounds.lower[axis] {
        roots.len() / 2
    } else {
        let buckets = Buckets::new(&centroid_bounds, axis, sah.buckets);
        let best = buckets.best_split(roots, bounds.surface_area(), sah.traversal_cost);
        let mid = partition(roots, |r| buckets.index(r.centroid) <= best.bucket);
        if mid == 0 || mid == roots.len() {
            split_equal_counts(roots, axis)
        } else {
            mid
        }
    };
    let (left, right) = roots.split_at_mut(mid);
    let l = build_upper(arena, left, sah);
    let r = build_upper(arena, right, sah);
    arena.push_interior(axis, l, r)
}
