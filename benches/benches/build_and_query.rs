// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use thicket_bvh::{
    Bounds3, BuildOptions, Bvh, Ray, SplitMethod, Triangle, TrianglePrimitive,
};

const METHODS: [SplitMethod; 4] = [
    SplitMethod::Sah,
    SplitMethod::Hlbvh,
    SplitMethod::Middle,
    SplitMethod::EqualCounts,
];

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        (v as f32) / ((1u64 << 24) as f32)
    }
    fn next_vec3(&mut self, scale: f32) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * scale
    }
}

/// `n³` unit cubes spaced two units apart.
fn gen_grid_cubes(n: usize) -> Vec<Bounds3> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let lower = Vec3::new(x as f32, y as f32, z as f32) * 2.0;
                out.push(Bounds3::new(lower, lower + Vec3::ONE));
            }
        }
    }
    out
}

/// Small random triangles scattered through a cube, denser near one corner.
fn gen_triangle_soup(count: usize, extent: f32, seed: u64) -> Vec<TrianglePrimitive> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|i| {
            let bias = rng.next_f32();
            let center = rng.next_vec3(extent) * bias * bias;
            let tri = Triangle::new(
                center + rng.next_vec3(1.0),
                center + rng.next_vec3(1.0),
                center + rng.next_vec3(1.0),
            );
            TrianglePrimitive::new(tri, i as u32)
        })
        .collect()
}

/// Rays from outside the scene aimed at random points inside it.
fn gen_rays(count: usize, extent: f32, seed: u64) -> Vec<Ray> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            let origin = rng.next_vec3(extent * 3.0) - Vec3::splat(extent);
            let target = rng.next_vec3(extent);
            Ray::new(origin, target - origin)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &count in &[4_096_usize, 65_536] {
        let soup = gen_triangle_soup(count, 100.0, 0x5eed);
        group.throughput(Throughput::Elements(count as u64));
        for method in METHODS {
            let options = BuildOptions::new(method);
            group.bench_function(format!("{method:?}_triangles_n{count}"), |b| {
                b.iter_batched(
                    || soup.clone(),
                    |prims| black_box(Bvh::build(prims, &options).unwrap()),
                    BatchSize::LargeInput,
                )
            });
        }
    }

    let cubes = gen_grid_cubes(32);
    group.throughput(Throughput::Elements(cubes.len() as u64));
    for method in [SplitMethod::Sah, SplitMethod::Hlbvh] {
        let sequential = BuildOptions::new(method).with_parallel_threshold(usize::MAX);
        group.bench_function(format!("{method:?}_grid32_sequential"), |b| {
            b.iter_batched(
                || cubes.clone(),
                |prims| black_box(Bvh::build(prims, &sequential).unwrap()),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_rays(c: &mut Criterion) {
    let mut group = c.benchmark_group("rays");
    let soup = gen_triangle_soup(65_536, 100.0, 0x5eed);
    let rays = gen_rays(1024, 100.0, 7);
    group.throughput(Throughput::Elements(rays.len() as u64));
    for method in METHODS {
        let bvh = Bvh::build(soup.clone(), &BuildOptions::new(method)).unwrap();
        group.bench_function(format!("{method:?}_intersect"), |b| {
            b.iter(|| {
                let hits = rays.iter().filter_map(|r| bvh.intersect(r)).count();
                black_box(hits);
            })
        });
        group.bench_function(format!("{method:?}_intersect_p"), |b| {
            b.iter(|| {
                let hits = rays.iter().filter(|r| bvh.intersect_p(r)).count();
                black_box(hits);
            })
        });
    }
    group.finish();
}

fn bench_box_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_queries");
    let cubes = gen_grid_cubes(32);
    let window = Bounds3::new(Vec3::splat(10.0), Vec3::splat(30.0));
    for method in [SplitMethod::Sah, SplitMethod::Hlbvh] {
        let bvh = Bvh::build(cubes.clone(), &BuildOptions::new(method)).unwrap();
        group.bench_function(format!("{method:?}_query_bounds"), |b| {
            b.iter(|| black_box(bvh.query_bounds(window).count()))
        });
        group.bench_function(format!("{method:?}_query_point"), |b| {
            b.iter(|| black_box(bvh.query_point(Vec3::new(20.5, 20.5, 20.5)).count()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_rays, bench_box_queries);
criterion_main!(benches);
