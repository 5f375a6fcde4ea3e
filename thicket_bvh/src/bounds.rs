// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned bounding boxes in 3D and 2D.

use core::ops::Index;

use glam::{Vec2, Vec3};

use crate::math::gamma;
use crate::ray::{Ray, RayInv};

/// Far-distance inflation applied by the ray/box tests.
const FAR_INFLATION: f32 = 1.0 + 2.0 * gamma(3);

/// Axis-aligned bounding box in 3D.
///
/// The default value is the empty box (`lower = +∞`, `upper = −∞`), which is the
/// identity of [`Bounds3::union`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3 {
    /// Component-wise minimum corner.
    pub lower: Vec3,
    /// Component-wise maximum corner.
    pub upper: Vec3,
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3 {
    /// The empty box.
    pub const EMPTY: Self = Self {
        lower: Vec3::INFINITY,
        upper: Vec3::NEG_INFINITY,
    };

    /// Box spanning two points, in any order.
    #[inline]
    pub fn new(p0: Vec3, p1: Vec3) -> Self {
        Self {
            lower: p0.min(p1),
            upper: p0.max(p1),
        }
    }

    /// Degenerate box containing exactly one point.
    #[inline]
    pub const fn from_point(p: Vec3) -> Self {
        Self { lower: p, upper: p }
    }

    /// Smallest box containing both boxes.
    #[inline]
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Smallest box containing this box and the point.
    #[inline]
    #[must_use]
    pub fn union_point(self, p: Vec3) -> Self {
        Self {
            lower: self.lower.min(p),
            upper: self.upper.max(p),
        }
    }

    /// The overlap of two boxes. Empty (inverted) if they do not overlap.
    #[inline]
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Whether the boxes share at least one point (touching faces count).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.upper.cmpge(other.lower).all() && self.lower.cmple(other.upper).all()
    }

    /// Whether the point lies inside or on the boundary.
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.lower).all() && p.cmple(self.upper).all()
    }

    /// Whether `other` lies entirely inside this box. The empty box is contained
    /// in every box.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty()
            || (other.lower.cmpge(self.lower).all() && other.upper.cmple(self.upper).all())
    }

    /// Grow (or shrink, for negative `delta`) the box by `delta` on every side.
    #[inline]
    #[must_use]
    pub fn expand(self, delta: f32) -> Self {
        Self {
            lower: self.lower - Vec3::splat(delta),
            upper: self.upper + Vec3::splat(delta),
        }
    }

    /// True if `upper < lower` on any axis. Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.upper.cmplt(self.lower).any()
    }

    /// Vector from `lower` to `upper`.
    #[inline]
    pub fn diagonal(&self) -> Vec3 {
        self.upper - self.lower
    }

    /// Surface area; zero for empty boxes.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Volume; zero for empty boxes.
    #[inline]
    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        d.x * d.y * d.z
    }

    /// Index of the axis with the largest extent (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn max_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Center of the box.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        self.lower * 0.5 + self.upper * 0.5
    }

    /// Position of `p` relative to the box: `lower` maps to 0 and `upper` to 1.
    ///
    /// Axes with no extent map to 0 instead of dividing by zero.
    #[inline]
    pub fn offset(&self, p: Vec3) -> Vec3 {
        let mut o = p - self.lower;
        let d = self.diagonal();
        for axis in 0..3 {
            if d[axis] > 0.0 {
                o[axis] /= d[axis];
            } else {
                o[axis] = 0.0;
            }
        }
        o
    }

    /// Point at parametric position `t` inside the box (inverse of [`Bounds3::offset`]).
    #[inline]
    pub fn lerp(&self, t: Vec3) -> Vec3 {
        self.lower + (self.upper - self.lower) * t
    }

    /// One of the eight corners; bit 0 of `i` selects x, bit 1 y and bit 2 z.
    #[inline]
    pub fn corner(&self, i: usize) -> Vec3 {
        Vec3::new(
            self[i & 1].x,
            self[(i >> 1) & 1].y,
            self[(i >> 2) & 1].z,
        )
    }

    /// Slab test returning the parametric entry and exit distances of `ray`,
    /// clipped to `[0, ray.t_max]`.
    ///
    /// Each axis computes `t = (plane − origin) / direction`; a zero direction
    /// component yields ±∞, so axis-parallel rays need no special case. The far
    /// distance of every axis is inflated by `1 + 2·γ(3)`.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let mut t0 = 0.0_f32;
        let mut t1 = ray.t_max;
        for axis in 0..3 {
            let inv_dir = 1.0 / ray.direction[axis];
            let mut t_near = (self.lower[axis] - ray.origin[axis]) * inv_dir;
            let mut t_far = (self.upper[axis] - ray.origin[axis]) * inv_dir;
            if inv_dir < 0.0 {
                core::mem::swap(&mut t_near, &mut t_far);
            }
            t_far *= FAR_INFLATION;
            // NaN (origin on a plane of a parallel slab) fails both comparisons and
            // leaves the interval untouched.
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Slab test using a reciprocal direction and sign mask computed once per ray.
    ///
    /// Near and far planes are selected by indexing with the sign bits, so no
    /// comparison-and-swap happens per axis. Results match [`Bounds3::intersect_ray`].
    #[inline]
    pub fn intersect_ray_precomputed(&self, ray: &Ray, inv: &RayInv) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let mut t0 = 0.0_f32;
        let mut t1 = ray.t_max;
        for axis in 0..3 {
            let near = inv.dir_is_neg.index(axis);
            let t_near = (self[near][axis] - ray.origin[axis]) * inv.inv_dir[axis];
            let t_far =
                (self[1 - near][axis] - ray.origin[axis]) * inv.inv_dir[axis] * FAR_INFLATION;
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

impl Index<usize> for Bounds3 {
    type Output = Vec3;

    /// `0` is the lower corner, `1` the upper corner.
    #[inline]
    fn index(&self, i: usize) -> &Vec3 {
        match i {
            0 => &self.lower,
            1 => &self.upper,
            _ => panic!("Bounds3 corner index out of range: {i}"),
        }
    }
}

impl FromIterator<Self> for Bounds3 {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::union)
    }
}

impl FromIterator<Vec3> for Bounds3 {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::union_point)
    }
}

/// Axis-aligned bounding box in 2D.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds2 {
    /// Component-wise minimum corner.
    pub lower: Vec2,
    /// Component-wise maximum corner.
    pub upper: Vec2,
}

impl Default for Bounds2 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds2 {
    /// The empty box.
    pub const EMPTY: Self = Self {
        lower: Vec2::INFINITY,
        upper: Vec2::NEG_INFINITY,
    };

    /// Box spanning two points, in any order.
    #[inline]
    pub fn new(p0: Vec2, p1: Vec2) -> Self {
        Self {
            lower: p0.min(p1),
            upper: p0.max(p1),
        }
    }

    /// Degenerate box containing exactly one point.
    #[inline]
    pub const fn from_point(p: Vec2) -> Self {
        Self { lower: p, upper: p }
    }

    /// Smallest box containing both boxes.
    #[inline]
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Smallest box containing this box and the point.
    #[inline]
    #[must_use]
    pub fn union_point(self, p: Vec2) -> Self {
        Self {
            lower: self.lower.min(p),
            upper: self.upper.max(p),
        }
    }

    /// The overlap of two boxes. Empty (inverted) if they do not overlap.
    #[inline]
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Whether the boxes share at least one point.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.upper.cmpge(other.lower).all() && self.lower.cmple(other.upper).all()
    }

    /// Whether the point lies inside or on the boundary.
    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.cmpge(self.lower).all() && p.cmple(self.upper).all()
    }

    /// Whether `other` lies entirely inside this box.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty()
            || (other.lower.cmpge(self.lower).all() && other.upper.cmple(self.upper).all())
    }

    /// True if `upper < lower` on any axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.upper.cmplt(self.lower).any()
    }

    /// Area; zero for empty boxes.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.upper - self.lower;
        d.x * d.y
    }

    /// Perimeter, the 2D analogue of surface area for SAH costs; zero for empty boxes.
    #[inline]
    pub fn perimeter(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.upper - self.lower;
        2.0 * (d.x + d.y)
    }

    /// Index of the axis with the larger extent.
    #[inline]
    pub fn max_extent(&self) -> usize {
        let d = self.upper - self.lower;
        usize::from(d.y > d.x)
    }

    /// Center of the box.
    #[inline]
    pub fn centroid(&self) -> Vec2 {
        self.lower * 0.5 + self.upper * 0.5
    }
}

#[cfg(feature = "kurbo")]
impl From<kurbo::Rect> for Bounds2 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Kurbo works in f64; the hierarchy stores f32 coordinates."
    )]
    fn from(r: kurbo::Rect) -> Self {
        Self::new(
            Vec2::new(r.x0 as f32, r.y0 as f32),
            Vec2::new(r.x1 as f32, r.y1 as f32),
        )
    }
}

#[cfg(feature = "kurbo")]
impl From<Bounds2> for kurbo::Rect {
    fn from(b: Bounds2) -> Self {
        Self::new(
            f64::from(b.lower.x),
            f64::from(b.lower.y),
            f64::from(b.upper.x),
            f64::from(b.upper.y),
        )
    }
}
