// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built hierarchy: flattened nodes plus primitives in leaf order.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use glam::Vec3;
use smallvec::{SmallVec, smallvec};

use crate::bounds::Bounds3;
use crate::build::flatten::flatten;
use crate::build::{BuildOptions, PrimitiveInfo, build_hierarchy, to_u32};
use crate::error::BuildError;
use crate::node::LinearNode;
use crate::parallel;
use crate::primitive::Primitive;
use crate::ray::Ray;

/// Traversal stack; deeper trees spill to the heap.
type NodeStack = SmallVec<[u32; 64]>;

/// The closest hit found by [`Bvh::intersect`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Parametric distance along the ray.
    pub t: f32,
    /// Index into [`Bvh::primitives`].
    pub primitive: usize,
}

/// Shape summary of a hierarchy, from [`Bvh::stats`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BvhStats {
    /// Total node count.
    pub nodes: usize,
    /// Leaf count.
    pub leaves: usize,
    /// Interior node count.
    pub interior: usize,
    /// Nodes on the longest root-to-leaf path; 1 for a single leaf.
    pub max_depth: usize,
    /// Largest number of primitives in one leaf.
    pub max_leaf_primitives: usize,
    /// Surface area heuristic cost: every node weighted by its area relative to the
    /// root, interior nodes costing 1 and leaves their primitive count.
    pub sah_cost: f32,
}

/// A bounding volume hierarchy over primitives of type `P`.
///
/// Building takes ownership of the primitives and stores them reordered so that
/// each leaf refers to a contiguous range; indices reported by queries point into
/// [`Bvh::primitives`], not the caller's original order. A built hierarchy is
/// immutable and may be queried from many threads at once.
#[derive(Clone)]
pub struct Bvh<P> {
    nodes: Vec<LinearNode>,
    primitives: Vec<P>,
}

impl<P> Default for Bvh<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P> fmt::Debug for Bvh<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bvh")
            .field("primitives", &self.primitives.len())
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl<P> Bvh<P> {
    /// A hierarchy with no primitives. Every ray misses it.
    pub const fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            primitives: Vec::new(),
        }
    }

    /// Flattened nodes; the root is at index 0.
    pub fn nodes(&self) -> &[LinearNode] {
        &self.nodes
    }

    /// Primitives in leaf order.
    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    /// Give up the node array and the reordered primitives.
    pub fn into_parts(self) -> (Vec<LinearNode>, Vec<P>) {
        (self.nodes, self.primitives)
    }

    /// The nodes as raw bytes, ready for a GPU storage buffer.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Whether there are no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of every primitive; empty for an empty hierarchy.
    pub fn bounds(&self) -> Bounds3 {
        self.nodes.first().map_or(Bounds3::EMPTY, LinearNode::bounds)
    }

    /// Walk the whole tree and summarize its shape.
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        let Some(root) = self.nodes.first() else {
            return stats;
        };
        let root_area = root.bounds().surface_area();
        let mut stack: SmallVec<[(u32, usize); 64]> = smallvec![(0, 1)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index as usize];
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            let weight = if root_area > 0.0 {
                node.bounds().surface_area() / root_area
            } else {
                1.0
            };
            match node.primitive_range() {
                Some(range) => {
                    stats.leaves += 1;
                    stats.max_leaf_primitives = stats.max_leaf_primitives.max(range.len());
                    stats.sah_cost += weight * range.len() as f32;
                }
                None => {
                    stats.interior += 1;
                    stats.sah_cost += weight;
                    stack.push((node.offset, depth + 1));
                    stack.push((index + 1, depth + 1));
                }
            }
        }
        stats
    }
}

impl<P: Primitive> Bvh<P> {
    /// Build with [`BuildOptions::default`].
    pub fn new(primitives: Vec<P>) -> Result<Self, BuildError>
    where
        P: Sync,
    {
        Self::build(primitives, &BuildOptions::default())
    }

    /// Build a hierarchy over `primitives`.
    ///
    /// Empty input yields an empty hierarchy. On error the primitives are dropped
    /// and nothing partially built is returned.
    pub fn build(primitives: Vec<P>, options: &BuildOptions) -> Result<Self, BuildError>
    where
        P: Sync,
    {
        options.validate()?;
        let count = primitives.len();
        if u32::try_from(count).is_err() {
            return Err(BuildError::TooManyPrimitives { count });
        }
        if primitives.is_empty() {
            return Ok(Self::empty());
        }

        let mut infos = Vec::new();
        infos.try_reserve_exact(count)?;
        parallel::extend_mapped(&mut infos, &primitives, |i, p| {
            PrimitiveInfo::new(to_u32(i), p.world_bound())
        });
        let hierarchy = build_hierarchy(infos, options)?;
        let nodes = flatten(&hierarchy.arena, hierarchy.root)?;
        let primitives = reorder(primitives, &hierarchy.order)?;
        log::debug!(
            "built {:?} BVH over {} primitives: {} nodes",
            options.split_method,
            count,
            nodes.len()
        );
        Ok(Self { nodes, primitives })
    }

    /// Closest hit within `[0, ray.t_max]`.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let mut closest = None;
        let mut ray = *ray;
        self.traverse(&mut ray, |ray, range| {
            for i in range {
                if let Some(t) = self.primitives[i].intersect(ray) {
                    ray.t_max = t;
                    closest = Some(Hit { t, primitive: i });
                }
            }
            false
        });
        closest
    }

    /// Whether anything is hit within `[0, ray.t_max]`. Stops at the first hit.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        let mut hit = false;
        let mut ray = *ray;
        self.traverse(&mut ray, |ray, mut range| {
            hit = range.any(|i| self.primitives[i].intersect_p(ray));
            hit
        });
        hit
    }

    /// Indices of primitives whose bounds overlap `query` (touching counts).
    pub fn query_bounds(&self, query: Bounds3) -> BoundsQuery<'_, P> {
        let stack = if self.nodes.is_empty() {
            NodeStack::new()
        } else {
            smallvec![0]
        };
        BoundsQuery {
            nodes: &self.nodes,
            primitives: &self.primitives,
            query,
            stack,
            leaf: 0..0,
        }
    }

    /// Indices of primitives whose bounds contain `point`.
    pub fn query_point(&self, point: Vec3) -> BoundsQuery<'_, P> {
        self.query_bounds(Bounds3::from_point(point))
    }

    /// Visit the leaves `ray` reaches, near child first. `leaf` may shorten the ray
    /// and returns `true` to stop.
    fn traverse(&self, ray: &mut Ray, mut leaf: impl FnMut(&mut Ray, Range<usize>) -> bool) {
        if self.nodes.is_empty() {
            return;
        }
        let inv = ray.precompute();
        let mut stack = NodeStack::new();
        let mut current = 0_u32;
        loop {
            let node = &self.nodes[current as usize];
            if node.bounds().intersect_ray_precomputed(ray, &inv).is_some() {
                match node.primitive_range() {
                    Some(range) => {
                        if leaf(ray, range) {
                            return;
                        }
                    }
                    None => {
                        if inv.dir_is_neg.is_neg(usize::from(node.axis)) {
                            stack.push(current + 1);
                            current = node.offset;
                        } else {
                            stack.push(node.offset);
                            current += 1;
                        }
                        continue;
                    }
                }
            }
            match stack.pop() {
                Some(next) => current = next,
                None => return,
            }
        }
    }
}

/// A hierarchy is itself a primitive, so hierarchies can be nested.
impl<P: Primitive> Primitive for Bvh<P> {
    fn world_bound(&self) -> Bounds3 {
        self.bounds()
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        Bvh::intersect(self, ray).map(|hit| hit.t)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        Bvh::intersect_p(self, ray)
    }
}

/// Iterator returned by [`Bvh::query_bounds`] and [`Bvh::query_point`].
pub struct BoundsQuery<'a, P> {
    nodes: &'a [LinearNode],
    primitives: &'a [P],
    query: Bounds3,
    stack: NodeStack,
    leaf: Range<usize>,
}

impl<P> fmt::Debug for BoundsQuery<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundsQuery")
            .field("query", &self.query)
            .field("pending_nodes", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl<P: Primitive> Iterator for BoundsQuery<'_, P> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            for i in self.leaf.by_ref() {
                if self.primitives[i].world_bound().overlaps(&self.query) {
                    return Some(i);
                }
            }
            let index = self.stack.pop()?;
            let node = &self.nodes[index as usize];
            if !node.bounds().overlaps(&self.query) {
                continue;
            }
            match node.primitive_range() {
                Some(range) => self.leaf = range,
                None => {
                    self.stack.push(node.offset);
                    self.stack.push(index + 1);
                }
            }
        }
    }
}

/// Permute `primitives` so that `out[k] = primitives[order[k]]`.
fn reorder<P>(primitives: Vec<P>, order: &[u32]) -> Result<Vec<P>, TryReserveError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(primitives.len())?;
    let mut out = Vec::new();
    out.try_reserve_exact(order.len())?;
    slots.extend(primitives.into_iter().map(Some));
    out.extend(order.iter().filter_map(|&i| slots[i as usize].take()));
    debug_assert_eq!(out.len(), slots.len(), "order is not a permutation");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::SplitMethod;
    use crate::error::OptionsError;
    use alloc::vec;

    const METHODS: [SplitMethod; 4] = [
        SplitMethod::Sah,
        SplitMethod::Hlbvh,
        SplitMethod::Middle,
        SplitMethod::EqualCounts,
    ];

    fn cube(x: f32, y: f32, z: f32) -> Bounds3 {
        let lower = Vec3::new(x, y, z);
        Bounds3::new(lower, lower + Vec3::ONE)
    }

    /// Unit cubes at the eight corners of a 4×4×4 grid.
    fn corner_cubes() -> Vec<Bounds3> {
        let mut cubes = Vec::new();
        for z in [0.0, 3.0] {
            for y in [0.0, 3.0] {
                for x in [0.0, 3.0] {
                    cubes.push(cube(x, y, z));
                }
            }
        }
        cubes
    }

    #[test]
    fn empty_input_builds_empty_hierarchy() {
        let bvh = Bvh::<Bounds3>::build(Vec::new(), &BuildOptions::default()).unwrap();
        assert!(bvh.is_empty());
        assert_eq!(bvh.node_count(), 0);
        assert!(bvh.bounds().is_empty());
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(bvh.intersect(&ray), None);
        assert!(!bvh.intersect_p(&ray));
        assert_eq!(bvh.query_point(Vec3::ZERO).count(), 0);
        assert_eq!(bvh.stats(), BvhStats::default());
    }

    #[test]
    fn corner_cubes_one_per_leaf() {
        let options = BuildOptions::new(SplitMethod::Sah).with_max_primitives_per_leaf(1);
        let bvh = Bvh::build(corner_cubes(), &options).unwrap();
        let stats = bvh.stats();
        assert_eq!(stats.leaves, 8);
        assert_eq!(stats.interior, 7);
        assert_eq!(stats.nodes, bvh.node_count());
        assert_eq!(stats.max_leaf_primitives, 1);
        assert_eq!(bvh.bounds(), cube(0.0, 0.0, 0.0).union(cube(3.0, 3.0, 3.0)));

        let origin = Vec3::splat(-1.0);
        let ray = Ray::new(origin, Vec3::splat(0.5) - origin);
        let hit = bvh.intersect(&ray).expect("ray aims at the cube at the origin");
        assert!(hit.t > 0.0 && hit.t.is_finite());
        assert_eq!(bvh.primitives()[hit.primitive], cube(0.0, 0.0, 0.0));
        assert!((hit.t - 1.0 / 1.5).abs() < 1e-5);
    }

    #[test]
    fn closest_hit_wins_for_every_method() {
        // A row of cubes along x; the ray enters from the far end.
        let row: Vec<_> = (0..20).map(|i| cube(i as f32 * 2.0, 0.0, 0.0)).collect();
        let ray = Ray::new(Vec3::new(100.0, 0.5, 0.5), Vec3::NEG_X);
        for method in METHODS {
            let bvh = Bvh::build(row.clone(), &BuildOptions::new(method)).unwrap();
            let hit = bvh.intersect(&ray).unwrap();
            assert_eq!(bvh.primitives()[hit.primitive], cube(38.0, 0.0, 0.0), "{method:?}");
            assert!((hit.t - 61.0).abs() < 1e-4);
            assert!(bvh.intersect_p(&ray));
            // Stopping short of the first cube misses everything.
            assert!(!bvh.intersect_p(&ray.with_t_max(60.0)));
        }
    }

    #[test]
    fn rays_between_cubes_miss() {
        let bvh = Bvh::new(corner_cubes()).unwrap();
        let through_gap = Ray::new(Vec3::new(2.0, 2.0, -5.0), Vec3::Z);
        assert_eq!(bvh.intersect(&through_gap), None);
        let away = Ray::new(Vec3::splat(-1.0), Vec3::splat(-1.0));
        assert!(!bvh.intersect_p(&away));
    }

    #[test]
    fn primitives_are_a_permutation() {
        let cubes: Vec<_> = (0..50)
            .map(|i| cube((i % 7) as f32 * 1.5, (i / 7) as f32 * 1.5, (i % 3) as f32))
            .collect();
        for method in METHODS {
            let bvh = Bvh::build(cubes.clone(), &BuildOptions::new(method)).unwrap();
            assert_eq!(bvh.len(), cubes.len());
            for c in &cubes {
                let a = cubes.iter().filter(|x| *x == c).count();
                let b = bvh.primitives().iter().filter(|x| *x == c).count();
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn bounds_and_point_queries() {
        let bvh = Bvh::new(corner_cubes()).unwrap();
        let hits: Vec<_> = bvh.query_point(Vec3::splat(3.5)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(bvh.primitives()[hits[0]], cube(3.0, 3.0, 3.0));

        let bottom = Bounds3::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(5.0, 5.0, 0.5));
        let mut found: Vec<_> = bvh
            .query_bounds(bottom)
            .map(|i| bvh.primitives()[i].lower.z)
            .collect();
        found.sort_by(f32::total_cmp);
        assert_eq!(found, [0.0; 4]);

        assert_eq!(bvh.query_point(Vec3::splat(2.0)).count(), 0);
        // Touching faces count.
        assert_eq!(bvh.query_point(Vec3::new(1.0, 0.5, 0.5)).count(), 1);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = BuildOptions::default().with_max_primitives_per_leaf(0);
        let err = Bvh::build(corner_cubes(), &options).unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidOptions(OptionsError::LeafSize { got: 0, max: 255 })
        );
    }

    #[test]
    fn nested_hierarchies() {
        let left = Bvh::new(vec![cube(0.0, 0.0, 0.0), cube(2.0, 0.0, 0.0)]).unwrap();
        let right = Bvh::new(vec![cube(10.0, 0.0, 0.0)]).unwrap();
        let top = Bvh::new(vec![left, right]).unwrap();
        assert_eq!(top.bounds(), cube(0.0, 0.0, 0.0).union(cube(10.0, 0.0, 0.0)));
        let ray = Ray::new(Vec3::new(20.0, 0.5, 0.5), Vec3::NEG_X);
        let hit = top.intersect(&ray).unwrap();
        assert!((hit.t - 9.0).abs() < 1e-5);
        assert_eq!(top.primitives()[hit.primitive].len(), 1);
    }

    #[test]
    fn debug_is_summarized() {
        let bvh = Bvh::new(corner_cubes()).unwrap();
        let s = alloc::format!("{bvh:?}");
        assert!(s.starts_with("Bvh { primitives: 8, nodes: "));
    }

    #[test]
    fn node_bytes_cover_every_node() {
        let bvh = Bvh::new(corner_cubes()).unwrap();
        assert_eq!(bvh.node_bytes().len(), bvh.node_count() * 32);
    }
}
