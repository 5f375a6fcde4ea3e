// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The flattened node record used at query time.

use core::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::bounds::Bounds3;

/// One node of a flattened hierarchy, 32 bytes.
///
/// Nodes are stored depth-first: an interior node's first child is the next node
/// in the array and `offset` holds the index of its second child. A leaf stores the
/// position of its first primitive in `offset` and a non-zero `primitive_count`.
///
/// The layout is `#[repr(C)]` and [`Pod`], so a node slice can be uploaded as a GPU
/// storage buffer as-is (two `vec4`s per node: `lower, offset` and
/// `upper, count | axis << 16`).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LinearNode {
    /// Minimum corner of the node bounds.
    pub lower: [f32; 3],
    /// Second child index (interior) or first primitive index (leaf).
    pub offset: u32,
    /// Maximum corner of the node bounds.
    pub upper: [f32; 3],
    /// Number of primitives; zero for interior nodes.
    pub primitive_count: u16,
    /// Split axis of an interior node: 0, 1 or 2.
    pub axis: u8,
    /// Always zero.
    pub pad: u8,
}

const _: () = assert!(size_of::<LinearNode>() == 32, "LinearNode is two vec4s");

impl LinearNode {
    pub(crate) fn leaf(bounds: Bounds3, first_primitive: u32, count: u16) -> Self {
        debug_assert!(count > 0, "a leaf needs at least one primitive");
        Self {
            lower: bounds.lower.to_array(),
            offset: first_primitive,
            upper: bounds.upper.to_array(),
            primitive_count: count,
            axis: 0,
            pad: 0,
        }
    }

    pub(crate) fn interior(bounds: Bounds3, second_child: u32, axis: u8) -> Self {
        Self {
            lower: bounds.lower.to_array(),
            offset: second_child,
            upper: bounds.upper.to_array(),
            primitive_count: 0,
            axis,
            pad: 0,
        }
    }

    /// Bounds of everything below this node.
    #[inline]
    pub fn bounds(&self) -> Bounds3 {
        Bounds3 {
            lower: Vec3::from_array(self.lower),
            upper: Vec3::from_array(self.upper),
        }
    }

    /// Whether this node references primitives directly.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        self.primitive_count > 0
    }

    /// Index of the second child, or `None` for a leaf.
    #[inline]
    pub const fn second_child(&self) -> Option<u32> {
        if self.is_leaf() {
            None
        } else {
            Some(self.offset)
        }
    }

    /// Range into the primitive list, or `None` for an interior node.
    #[inline]
    pub fn primitive_range(&self) -> Option<Range<usize>> {
        self.is_leaf().then(|| {
            let first = self.offset as usize;
            first..first + usize::from(self.primitive_count)
        })
    }
}
