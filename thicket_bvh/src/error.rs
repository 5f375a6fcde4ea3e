// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by [`Bvh::build`](crate::Bvh::build).

use alloc::collections::TryReserveError;

use thiserror::Error;

/// Why a build did not produce a hierarchy.
///
/// A failed build never exposes partial output: the caller either gets a complete
/// [`Bvh`](crate::Bvh) or one of these.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Primitive indices are stored as `u32`.
    #[error("{count} primitives exceed the 32-bit primitive index range")]
    TooManyPrimitives {
        /// Number of primitives passed in.
        count: usize,
    },
    /// The [`BuildOptions`](crate::BuildOptions) were out of range.
    #[error("invalid build options: {0}")]
    InvalidOptions(#[from] OptionsError),
    /// A scratch or output array could not be allocated.
    #[error("failed to allocate BVH build storage")]
    Allocation(#[from] TryReserveError),
}

/// A [`BuildOptions`](crate::BuildOptions) field outside its valid range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// `max_primitives_per_leaf` must be in `1..=max`.
    #[error("max_primitives_per_leaf must be in 1..={max}, got {got}")]
    LeafSize {
        /// Requested value.
        got: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// The SAH bucket count must be in `min..=max`.
    #[error("SAH bucket count must be in {min}..={max}, got {got}")]
    BucketCount {
        /// Requested value.
        got: usize,
        /// Smallest accepted value.
        min: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// The SAH traversal cost must be finite and non-negative.
    #[error("SAH traversal cost must be finite and non-negative")]
    TraversalCost,
    /// Treelets cannot be keyed on more bits than a Morton code has.
    #[error("HLBVH treelet_bits must be at most {max}, got {got}")]
    TreeletBits {
        /// Requested value.
        got: u32,
        /// Largest accepted value.
        max: u32,
    },
}
