// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Storage-buffer layouts for traversing a triangle hierarchy on the GPU.
//!
//! The GPU walks the same [`LinearNode`] array as [`Bvh::intersect`]; only the
//! triangles are repacked. [`WGSL_LAYOUT`] declares matching structs.

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};

use crate::bvh::Bvh;
use crate::node::LinearNode;
use crate::primitive::TrianglePrimitive;

/// One triangle as three 16-byte rows; the caller id rides in the first row.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    /// First vertex.
    pub v0: [f32; 3],
    /// [`TrianglePrimitive::id`].
    pub id: u32,
    /// Second vertex.
    pub v1: [f32; 3],
    /// Always zero.
    pub pad0: u32,
    /// Third vertex.
    pub v2: [f32; 3],
    /// Always zero.
    pub pad1: u32,
}

const _: () = assert!(size_of::<GpuTriangle>() == 48, "GpuTriangle is three vec4s");

impl From<&TrianglePrimitive> for GpuTriangle {
    fn from(prim: &TrianglePrimitive) -> Self {
        let tri = prim.triangle();
        Self {
            v0: tri.v0.to_array(),
            id: prim.id,
            v1: tri.v1.to_array(),
            pad0: 0,
            v2: tri.v2.to_array(),
            pad1: 0,
        }
    }
}

/// WGSL declarations matching [`LinearNode`] and [`GpuTriangle`].
pub const WGSL_LAYOUT: &str = "\
struct LinearNode {
    lower: vec3<f32>,
    offset: u32,
    upper: vec3<f32>,
    // primitive_count in the low 16 bits, axis in the next 8.
    count_axis: u32,
}

struct GpuTriangle {
    v0: vec3<f32>,
    id: u32,
    v1: vec3<f32>,
    pad0: u32,
    v2: vec3<f32>,
    pad1: u32,
}
";

/// Node and triangle arrays ready for upload.
#[derive(Clone, Debug, Default)]
pub struct GpuScene {
    /// Flattened nodes, root first.
    pub nodes: Vec<LinearNode>,
    /// Triangles in leaf order, so node primitive ranges index this array.
    pub triangles: Vec<GpuTriangle>,
}

impl GpuScene {
    /// Pack a triangle hierarchy.
    pub fn from_bvh(bvh: &Bvh<TrianglePrimitive>) -> Self {
        Self {
            nodes: bvh.nodes().to_vec(),
            triangles: bvh.primitives().iter().map(GpuTriangle::from).collect(),
        }
    }

    /// Nodes as bytes.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Triangles as bytes.
    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildOptions;
    use crate::primitive::Triangle;
    use glam::Vec3;

    fn fan(n: u32) -> Vec<TrianglePrimitive> {
        (0..n)
            .map(|i| {
                let x = i as f32 * 2.0;
                let tri = Triangle::new(
                    Vec3::new(x, 0.0, 0.0),
                    Vec3::new(x + 1.0, 0.0, 0.0),
                    Vec3::new(x, 1.0, 0.0),
                );
                TrianglePrimitive::new(tri, 100 + i)
            })
            .collect()
    }

    #[test]
    fn triangles_follow_leaf_order() {
        let bvh = Bvh::build(fan(9), &BuildOptions::default().with_max_primitives_per_leaf(2))
            .unwrap();
        let scene = GpuScene::from_bvh(&bvh);
        assert_eq!(scene.nodes.len(), bvh.node_count());
        for (gpu, prim) in scene.triangles.iter().zip(bvh.primitives()) {
            assert_eq!(gpu.id, prim.id);
            assert_eq!(gpu.v2, prim.triangle().v2.to_array());
        }
        assert_eq!(scene.triangle_bytes().len(), 9 * 48);
        assert_eq!(scene.node_bytes(), bvh.node_bytes());
    }

    #[test]
    fn id_sits_after_first_vertex() {
        let gpu = GpuTriangle::from(&fan(1)[0]);
        let bytes: &[u8] = bytemuck::bytes_of(&gpu);
        assert_eq!(&bytes[12..16], &100_u32.to_ne_bytes());
        assert!(WGSL_LAYOUT.contains("struct GpuTriangle"));
    }
}
