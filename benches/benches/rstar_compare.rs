// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use thicket_bvh::{Bounds3, BuildOptions, Bvh, SplitMethod};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};

fn gen_grid_cubes(n: usize, cell: f32) -> Vec<Bounds3> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let lower = Vec3::new(x as f32, y as f32, z as f32) * cell;
                out.push(Bounds3::new(lower, lower + Vec3::splat(cell)));
            }
        }
    }
    out
}

fn to_rstar_boxes(v: &[Bounds3]) -> Vec<Rectangle<[f32; 3]>> {
    v.iter()
        .map(|b| Rectangle::from_corners(b.lower.to_array(), b.upper.to_array()))
        .collect()
}

fn bench_rstar_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_compare");
    for &n in &[16_usize, 32] {
        let cubes = gen_grid_cubes(n, 10.0);
        let query = Bounds3::new(Vec3::splat(25.0), Vec3::splat(105.0));
        group.throughput(Throughput::Elements((n * n * n) as u64));

        for method in [SplitMethod::Sah, SplitMethod::Hlbvh] {
            let options = BuildOptions::new(method);
            group.bench_function(format!("thicket_{method:?}_build_query_n{n}"), |b| {
                b.iter_batched(
                    || cubes.clone(),
                    |cubes| {
                        let bvh = Bvh::build(cubes, &options).unwrap();
                        let hits: usize = bvh.query_bounds(query).count();
                        black_box(hits);
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.bench_function(format!("rstar_build_query_bulk_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_boxes(&cubes),
                |boxes| {
                    let tree = RTree::bulk_load(boxes);
                    let aabb = AABB::from_corners(query.lower.to_array(), query.upper.to_array());
                    let hits: usize = tree.locate_in_envelope_intersecting(&aabb).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });

        let bvh = Bvh::build(cubes.clone(), &BuildOptions::default()).unwrap();
        let tree = RTree::bulk_load(to_rstar_boxes(&cubes));
        let aabb = AABB::from_corners(query.lower.to_array(), query.upper.to_array());
        group.bench_function(format!("thicket_query_only_n{n}"), |b| {
            b.iter(|| black_box(bvh.query_bounds(query).count()))
        });
        group.bench_function(format!("rstar_query_only_n{n}"), |b| {
            b.iter(|| black_box(tree.locate_in_envelope_intersecting(&aabb).count()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_compare);
criterion_main!(benches);
