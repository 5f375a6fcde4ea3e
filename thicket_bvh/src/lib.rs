// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thicket BVH: a bounding volume hierarchy for ray queries over 3D primitives.
//!
//! - Build over any type implementing [`Primitive`] (a bounding box plus a ray test).
//! - Choose a [`SplitMethod`]: bucketed SAH, HLBVH (Morton-ordered treelets built in
//!   parallel), or the cheaper midpoint and equal-count splits.
//! - Query with [`Bvh::intersect`] (closest hit), [`Bvh::intersect_p`] (any hit),
//!   [`Bvh::query_bounds`] and [`Bvh::query_point`].
//!
//! A built [`Bvh`] is a flat, depth-first array of 32-byte [`LinearNode`]s plus the
//! primitives reordered so each leaf refers to a contiguous range. The node array is
//! [`bytemuck::Pod`] and can be uploaded to the GPU unchanged; see [`gpu`].
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use thicket_bvh::{Bounds3, BuildOptions, Bvh, Ray, SplitMethod};
//!
//! // Unit cubes at the corners of a 4×4×4 grid.
//! let mut cubes = Vec::new();
//! for i in 0..8 {
//!     let corner = Vec3::new((i & 1) as f32, ((i >> 1) & 1) as f32, (i >> 2) as f32) * 3.0;
//!     cubes.push(Bounds3::new(corner, corner + Vec3::ONE));
//! }
//!
//! let options = BuildOptions::new(SplitMethod::Sah).with_max_primitives_per_leaf(1);
//! let bvh = Bvh::build(cubes, &options).unwrap();
//! assert_eq!(bvh.stats().leaves, 8);
//!
//! let origin = Vec3::splat(-1.0);
//! let ray = Ray::new(origin, Vec3::splat(0.5) - origin);
//! let hit = bvh.intersect(&ray).unwrap();
//! assert_eq!(bvh.primitives()[hit.primitive].lower, Vec3::ZERO);
//! assert!(hit.t > 0.0);
//! ```
//!
//! ## Features
//!
//! - `std` (default): use the standard library for float math.
//! - `libm`: float math for `no_std` targets.
//! - `rayon` (default): build on the rayon thread pool.
//! - `kurbo`: convert [`Bounds2`] to and from `kurbo::Rect`.
//!
//! ### Float semantics
//!
//! Primitive bounds are assumed free of NaNs. Rays may have zero direction
//! components; the box tests handle the resulting infinities.

#![no_std]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

mod bounds;
mod build;
mod bvh;
mod error;
pub mod gpu;
pub mod math;
mod node;
mod parallel;
mod primitive;
mod ray;

pub use bounds::{Bounds2, Bounds3};
pub use build::{
    BuildOptions, HlbvhOptions, MAX_PRIMITIVES_PER_LEAF, MAX_SAH_BUCKETS, MIN_SAH_BUCKETS,
    PrimitiveInfo, SahOptions, SplitMethod,
};
pub use bvh::{BoundsQuery, Bvh, BvhStats, Hit};
pub use error::{BuildError, OptionsError};
pub use node::LinearNode;
pub use primitive::{Primitive, Triangle, TriangleHit, TrianglePrimitive};
pub use ray::{DirIsNeg, Ray, RayInv};
