// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU buffer layout.
//!
//! Pack a triangle hierarchy into storage-buffer bytes and print the matching
//! WGSL declarations, then walk the node array the way a shader would.
//!
//! Run:
//! - `cargo run -p thicket_demos --example gpu_layout`

use glam::Vec3;
use thicket_bvh::gpu::{GpuScene, GpuTriangle, WGSL_LAYOUT};
use thicket_bvh::{BuildOptions, Bvh, LinearNode, SplitMethod, Triangle, TrianglePrimitive};

fn main() {
    env_logger::init();

    let tris: Vec<_> = (0..32_u32)
        .map(|i| {
            let x = i as f32 * 1.5;
            let tri = Triangle::new(
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x, 1.0, (i % 3) as f32),
            );
            TrianglePrimitive::new(tri, i)
        })
        .collect();
    let options = BuildOptions::new(SplitMethod::Hlbvh).with_max_primitives_per_leaf(2);
    let bvh = match Bvh::build(tris, &options) {
        Ok(bvh) => bvh,
        Err(err) => {
            log::error!("build failed: {err}");
            return;
        }
    };
    let scene = GpuScene::from_bvh(&bvh);

    println!("{WGSL_LAYOUT}");
    println!(
        "node buffer: {} nodes, {} bytes ({} per node)",
        scene.nodes.len(),
        scene.node_bytes().len(),
        size_of::<LinearNode>()
    );
    println!(
        "triangle buffer: {} triangles, {} bytes ({} per triangle)",
        scene.triangles.len(),
        scene.triangle_bytes().len(),
        size_of::<GpuTriangle>()
    );

    // Round-trip through bytes, as a readback would.
    let nodes: &[LinearNode] = bytemuck::cast_slice(scene.node_bytes());
    let mut depth = vec![0_usize; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        let indent = "  ".repeat(depth[i]);
        match node.primitive_range() {
            Some(range) => {
                let ids: Vec<_> = range.map(|k| scene.triangles[k].id).collect();
                println!("{indent}#{i} leaf {ids:?}");
            }
            None => {
                println!("{indent}#{i} split on axis {}", node.axis);
                depth[i + 1] = depth[i] + 1;
                depth[node.offset as usize] = depth[i] + 1;
            }
        }
    }
}
