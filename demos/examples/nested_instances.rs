// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested hierarchies.
//!
//! A built `Bvh` is itself a primitive, so one object's hierarchy can be shared by
//! several copies in a scene-level hierarchy.
//!
//! Run:
//! - `cargo run -p thicket_demos --example nested_instances`

use std::sync::Arc;

use glam::Vec3;
use thicket_bvh::{Bounds3, Bvh, Ray};

fn main() {
    env_logger::init();

    // A "tree" made of a trunk and a canopy, built once per position.
    let tree_at = |x: f32, z: f32| {
        let base = Vec3::new(x, 0.0, z);
        let parts = vec![
            Bounds3::new(base + Vec3::new(-0.2, 0.0, -0.2), base + Vec3::new(0.2, 2.0, 0.2)),
            Bounds3::new(base + Vec3::new(-1.0, 2.0, -1.0), base + Vec3::new(1.0, 4.0, 1.0)),
        ];
        Bvh::new(parts).map(Arc::new)
    };

    let mut forest = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            match tree_at(i as f32 * 5.0, j as f32 * 5.0) {
                Ok(tree) => forest.push(tree),
                Err(err) => {
                    log::error!("could not build tree ({i}, {j}): {err}");
                    return;
                }
            }
        }
    }
    let scene = match Bvh::new(forest) {
        Ok(scene) => scene,
        Err(err) => {
            log::error!("could not build forest: {err}");
            return;
        }
    };
    println!("forest bounds: {:?}", scene.bounds());

    // Look along the row at z = 10 from outside the forest.
    let ray = Ray::new(Vec3::new(-10.0, 3.0, 10.0), Vec3::X);
    match scene.intersect(&ray) {
        Some(hit) => println!(
            "first canopy at x = {:.1} (tree #{})",
            ray.at(hit.t).x,
            hit.primitive
        ),
        None => println!("nothing in the way"),
    }

    // Walk between the rows.
    let path = Ray::new(Vec3::new(-10.0, 1.0, 12.5), Vec3::X);
    println!("clear path between rows: {}", !scene.intersect_p(&path));

    let near_origin: Vec<_> = scene
        .query_bounds(Bounds3::new(Vec3::splat(-1.0), Vec3::new(6.0, 5.0, 6.0)))
        .collect();
    println!("trees overlapping the corner: {near_origin:?}");
}
