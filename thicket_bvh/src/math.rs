// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Floating-point error bounds and Morton (Z-order) encoding.

use glam::Vec3;

/// Half of `f32::EPSILON`: the relative rounding error of one IEEE-754 operation.
pub const MACHINE_EPSILON: f32 = f32::EPSILON * 0.5;

/// Conservative relative error bound after `n` sequential floating-point operations.
///
/// `γ(n) = n·ε / (1 − n·ε)`. The ray/box tests inflate their far distances by
/// `1 + 2·γ(3)` so that rounding in `(plane − origin) · inv_dir` never turns a hit
/// at a box boundary into a miss.
#[inline]
pub const fn gamma(n: u32) -> f32 {
    let n_eps = n as f32 * MACHINE_EPSILON;
    n_eps / (1.0 - n_eps)
}

/// Number of bits each axis is quantized to before interleaving.
pub const MORTON_BITS: u32 = 10;

/// Grid resolution per axis, `2^MORTON_BITS`.
pub const MORTON_SCALE: u32 = 1 << MORTON_BITS;

/// Total number of significant bits in a 3D Morton code.
pub const MORTON_CODE_BITS: u32 = 3 * MORTON_BITS;

/// Spread the low 10 bits of `x` so that two zero bits separate each of them.
///
/// `x == MORTON_SCALE` is clamped to the last cell so that a centroid lying exactly
/// on the upper face of the quantization box stays in range.
#[inline]
pub const fn left_shift_3(mut x: u32) -> u32 {
    debug_assert!(x <= MORTON_SCALE, "Morton input out of range");
    if x == MORTON_SCALE {
        x -= 1;
    }
    x = (x | (x << 16)) & 0b0000_0011_0000_0000_0000_0000_1111_1111;
    // x = ---- --98 ---- ---- ---- ---- 7654 3210
    x = (x | (x << 8)) & 0b0000_0011_0000_0000_1111_0000_0000_1111;
    // x = ---- --98 ---- ---- 7654 ---- ---- 3210
    x = (x | (x << 4)) & 0b0000_0011_0000_1100_0011_0000_1100_0011;
    // x = ---- --98 ---- 76-- --54 ---- 32-- --10
    x = (x | (x << 2)) & 0b0000_1001_0010_0100_1001_0010_0100_1001;
    // x = ---- 9--8 --7- -6-- 5--4 --3- -2-- 1--0
    x
}

/// Interleave a point already scaled into `[0, MORTON_SCALE]³`.
///
/// Bit `3k` holds bit `k` of x, bit `3k + 1` of y and bit `3k + 2` of z.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Inputs are clamped to [0, MORTON_SCALE] before the cast."
)]
#[inline]
pub fn encode_morton_3(v: Vec3) -> u32 {
    let scale = MORTON_SCALE as f32;
    let q = v.clamp(Vec3::ZERO, Vec3::splat(scale));
    (left_shift_3(q.z as u32) << 2) | (left_shift_3(q.y as u32) << 1) | left_shift_3(q.x as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_is_small_and_monotonic() {
        assert_eq!(gamma(0), 0.0);
        assert!(gamma(1) > 0.0);
        assert!(gamma(3) > gamma(2));
        assert!(gamma(3) < 1e-6);
    }

    #[test]
    fn left_shift_spreads_bits() {
        assert_eq!(left_shift_3(0), 0);
        assert_eq!(left_shift_3(1), 1);
        assert_eq!(left_shift_3(0b11), 0b1001);
        assert_eq!(left_shift_3(0b11_1111_1111), 0b1001_0010_0100_1001_0010_0100_1001);
        // Upper face clamps into the last cell.
        assert_eq!(left_shift_3(MORTON_SCALE), left_shift_3(MORTON_SCALE - 1));
    }

    #[test]
    fn morton_interleaves_axes() {
        assert_eq!(encode_morton_3(Vec3::new(1.0, 0.0, 0.0)), 0b001);
        assert_eq!(encode_morton_3(Vec3::new(0.0, 1.0, 0.0)), 0b010);
        assert_eq!(encode_morton_3(Vec3::new(0.0, 0.0, 1.0)), 0b100);
        let max = encode_morton_3(Vec3::splat(MORTON_SCALE as f32));
        assert_eq!(max, (1 << MORTON_CODE_BITS) - 1);
    }

    #[test]
    fn morton_clamps_out_of_range_input() {
        assert_eq!(encode_morton_3(Vec3::splat(-5.0)), 0);
        assert_eq!(
            encode_morton_3(Vec3::splat(1.0e9)),
            encode_morton_3(Vec3::splat(MORTON_SCALE as f32))
        );
    }
}
