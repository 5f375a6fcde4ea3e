// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The primitive interface consumed by the builders, and the triangle adapter.

use alloc::sync::Arc;

use glam::Vec3;

use crate::bounds::Bounds3;
use crate::math::MACHINE_EPSILON;
use crate::ray::Ray;

/// Geometry a [`Bvh`](crate::Bvh) can be built over.
///
/// Builders only ever call [`Primitive::world_bound`]; traversal calls the
/// intersection methods on the primitives of the leaves a ray reaches. Callers must
/// not change the geometry of a primitive after handing it to a build.
pub trait Primitive {
    /// World-space bounding box. Called once per primitive per build.
    fn world_bound(&self) -> Bounds3;

    /// Parametric distance of the nearest hit within `[0, ray.t_max]`.
    fn intersect(&self, ray: &Ray) -> Option<f32>;

    /// Whether the ray hits at all within `[0, ray.t_max]`.
    #[inline]
    fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

impl<P: Primitive + ?Sized> Primitive for &P {
    #[inline]
    fn world_bound(&self) -> Bounds3 {
        (**self).world_bound()
    }

    #[inline]
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        (**self).intersect(ray)
    }

    #[inline]
    fn intersect_p(&self, ray: &Ray) -> bool {
        (**self).intersect_p(ray)
    }
}

impl<P: Primitive + ?Sized> Primitive for Arc<P> {
    #[inline]
    fn world_bound(&self) -> Bounds3 {
        (**self).world_bound()
    }

    #[inline]
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        (**self).intersect(ray)
    }

    #[inline]
    fn intersect_p(&self, ray: &Ray) -> bool {
        (**self).intersect_p(ray)
    }
}

/// A solid box. The hit distance is where the ray enters it (0 from inside).
impl Primitive for Bounds3 {
    #[inline]
    fn world_bound(&self) -> Bounds3 {
        *self
    }

    #[inline]
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.intersect_ray(ray).map(|(t0, _)| t0)
    }
}

/// Relative size below which the determinant counts as zero: the ray is parallel to
/// the triangle's plane.
const DET_TOLERANCE: f32 = 4.0 * MACHINE_EPSILON;

/// A triangle given by its three vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    /// First vertex; barycentric weight `1 − b1 − b2`.
    pub v0: Vec3,
    /// Second vertex; barycentric weight `b1`.
    pub v1: Vec3,
    /// Third vertex; barycentric weight `b2`.
    pub v2: Vec3,
}

/// Where a ray meets a triangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    /// Parametric distance along the ray.
    pub t: f32,
    /// Barycentric weight of `v1`.
    pub b1: f32,
    /// Barycentric weight of `v2`.
    pub b2: f32,
}

impl Triangle {
    /// Triangle from three vertices.
    #[inline]
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Tight bounding box of the vertices.
    #[inline]
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::new(self.v0, self.v1).union_point(self.v2)
    }

    /// Möller–Trumbore ray/triangle test.
    ///
    /// Misses when the ray is parallel to the plane, when either barycentric
    /// coordinate is negative or their sum exceeds 1, or when the distance falls
    /// outside `[0, ray.t_max]`.
    pub fn intersect_barycentric(&self, ray: &Ray) -> Option<TriangleHit> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        // `det` scales with both edge lengths and the direction length.
        let scale = e1.length() * e2.length() * ray.direction.length();
        if det == 0.0 || det.abs() <= DET_TOLERANCE * scale {
            return None;
        }
        let inv_det = 1.0 / det;
        if !inv_det.is_finite() {
            return None;
        }
        let s = ray.origin - self.v0;
        let b1 = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&b1) {
            return None;
        }
        let q = s.cross(e1);
        let b2 = ray.direction.dot(q) * inv_det;
        if b2 < 0.0 || b1 + b2 > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        if !(0.0..=ray.t_max).contains(&t) {
            return None;
        }
        Some(TriangleHit { t, b1, b2 })
    }
}

/// A triangle with its bounding box cached at construction.
///
/// `id` is carried through the build untouched so callers can map the reordered
/// primitive list back to their own data (materials, mesh indices, ...).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrianglePrimitive {
    triangle: Triangle,
    bounds: Bounds3,
    /// Caller-defined identifier.
    pub id: u32,
}

impl TrianglePrimitive {
    /// Wrap a triangle and compute its bounds once.
    #[inline]
    pub fn new(triangle: Triangle, id: u32) -> Self {
        Self {
            bounds: triangle.bounds(),
            triangle,
            id,
        }
    }

    /// The wrapped triangle.
    #[inline]
    pub const fn triangle(&self) -> &Triangle {
        &self.triangle
    }
}

impl Primitive for TrianglePrimitive {
    #[inline]
    fn world_bound(&self) -> Bounds3 {
        self.bounds
    }

    #[inline]
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.triangle.intersect_barycentric(ray).map(|hit| hit.t)
    }
}
