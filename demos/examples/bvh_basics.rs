// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! BVH basics.
//!
//! Build a hierarchy over a small triangle mesh with each split method, print its
//! shape, and shoot a few rays.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p thicket_demos --example bvh_basics`

use glam::Vec3;
use thicket_bvh::{BuildOptions, Bvh, Ray, SplitMethod, Triangle, TrianglePrimitive};

/// A `n × n` height field of triangles over the xz plane.
fn terrain(n: u32) -> Vec<TrianglePrimitive> {
    let height = |x: u32, z: u32| ((x as f32 * 0.7).sin() + (z as f32 * 0.4).cos()) * 0.5;
    let vertex = |x: u32, z: u32| Vec3::new(x as f32, height(x, z), z as f32);
    let mut tris = Vec::new();
    for z in 0..n {
        for x in 0..n {
            let (a, b) = (vertex(x, z), vertex(x + 1, z));
            let (c, d) = (vertex(x + 1, z + 1), vertex(x, z + 1));
            let id = 2 * (z * n + x);
            tris.push(TrianglePrimitive::new(Triangle::new(a, b, c), id));
            tris.push(TrianglePrimitive::new(Triangle::new(a, c, d), id + 1));
        }
    }
    tris
}

fn main() {
    env_logger::init();

    let mesh = terrain(64);
    let rays = [
        Ray::new(Vec3::new(10.3, 10.0, 20.7), Vec3::NEG_Y),
        Ray::new(Vec3::new(-5.0, 3.0, -5.0), Vec3::new(1.0, -0.1, 1.0)),
        Ray::new(Vec3::new(32.0, 5.0, 32.0), Vec3::Y),
    ];

    for method in [
        SplitMethod::Sah,
        SplitMethod::Hlbvh,
        SplitMethod::Middle,
        SplitMethod::EqualCounts,
    ] {
        let bvh = match Bvh::build(mesh.clone(), &BuildOptions::new(method)) {
            Ok(bvh) => bvh,
            Err(err) => {
                log::error!("{method:?} build failed: {err}");
                continue;
            }
        };
        let stats = bvh.stats();
        println!("== {method:?} ==");
        println!(
            "  nodes={} leaves={} depth={} max_leaf={} sah_cost={:.2}",
            stats.nodes, stats.leaves, stats.max_depth, stats.max_leaf_primitives, stats.sah_cost
        );
        for ray in &rays {
            match bvh.intersect(ray) {
                Some(hit) => {
                    let tri = &bvh.primitives()[hit.primitive];
                    println!("  hit triangle {} at {:?}", tri.id, ray.at(hit.t));
                }
                None => println!("  miss from {:?}", ray.origin),
            }
        }
    }
}
