// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rays and per-ray traversal data.

use bitflags::bitflags;
use glam::Vec3;

/// A half-line `origin + t · direction` for `t ∈ [0, t_max]`.
///
/// `direction` need not be normalized; hit distances are in units of its length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Direction of travel.
    pub direction: Vec3,
    /// Largest parametric distance considered a hit.
    pub t_max: f32,
}

impl Ray {
    /// Unbounded ray.
    #[inline]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t_max: f32::INFINITY,
        }
    }

    /// Segment from `a` to `b`: `t = 1` lands on `b`.
    #[inline]
    pub fn between(a: Vec3, b: Vec3) -> Self {
        Self {
            origin: a,
            direction: b - a,
            t_max: 1.0,
        }
    }

    /// Same ray with a different maximum distance.
    #[inline]
    #[must_use]
    pub const fn with_t_max(mut self, t_max: f32) -> Self {
        self.t_max = t_max;
        self
    }

    /// Point at parametric distance `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Reciprocal direction and sign mask for repeated box tests.
    #[inline]
    pub fn precompute(&self) -> RayInv {
        RayInv::new(self.direction)
    }
}

bitflags! {
    /// Which components of a ray direction are negative.
    ///
    /// Selects the near and far slab planes of a box by table lookup, and tells
    /// traversal which child of a node the ray reaches first.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct DirIsNeg: u8 {
        /// Direction x is negative.
        const X = 1 << 0;
        /// Direction y is negative.
        const Y = 1 << 1;
        /// Direction z is negative.
        const Z = 1 << 2;
    }
}

impl DirIsNeg {
    /// Sign bits of a reciprocal direction; `-0.0` maps to `-∞` and counts as negative.
    #[inline]
    pub fn from_inv_dir(inv_dir: Vec3) -> Self {
        let mut mask = Self::empty();
        mask.set(Self::X, inv_dir.x < 0.0);
        mask.set(Self::Y, inv_dir.y < 0.0);
        mask.set(Self::Z, inv_dir.z < 0.0);
        mask
    }

    /// 1 if the component along `axis` is negative, else 0.
    #[inline]
    pub fn index(self, axis: usize) -> usize {
        usize::from((self.bits() >> axis) & 1)
    }

    /// Whether the component along `axis` is negative.
    #[inline]
    pub fn is_neg(self, axis: usize) -> bool {
        self.index(axis) == 1
    }
}

/// Reciprocal direction and sign mask, computed once per traversal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayInv {
    /// `1 / direction`, ±∞ for zero components.
    pub inv_dir: Vec3,
    /// Sign bits of `inv_dir`.
    pub dir_is_neg: DirIsNeg,
}

impl RayInv {
    /// Precompute from a direction.
    #[inline]
    pub fn new(direction: Vec3) -> Self {
        let inv_dir = direction.recip();
        Self {
            inv_dir,
            dir_is_neg: DirIsNeg::from_inv_dir(inv_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_and_between() {
        let r = Ray::between(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(r.t_max, 1.0);
        assert_eq!(r.at(0.5), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Ray::new(Vec3::ZERO, Vec3::X).t_max, f32::INFINITY);
        assert_eq!(Ray::new(Vec3::ZERO, Vec3::X).with_t_max(3.0).t_max, 3.0);
    }

    #[test]
    fn sign_mask_tracks_negative_components() {
        let inv = Ray::new(Vec3::ZERO, Vec3::new(-1.0, 2.0, -0.5)).precompute();
        assert_eq!(inv.dir_is_neg, DirIsNeg::X | DirIsNeg::Z);
        assert_eq!(inv.dir_is_neg.index(0), 1);
        assert_eq!(inv.dir_is_neg.index(1), 0);
        assert!(inv.dir_is_neg.is_neg(2));
        assert_eq!(inv.inv_dir, Vec3::new(-1.0, 0.5, -2.0));
    }

    #[test]
    fn zero_components_become_signed_infinities() {
        let inv = RayInv::new(Vec3::new(0.0, -0.0, 1.0));
        assert_eq!(inv.inv_dir.x, f32::INFINITY);
        assert_eq!(inv.inv_dir.y, f32::NEG_INFINITY);
        assert_eq!(inv.dir_is_neg, DirIsNeg::Y);
    }
}
