// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-first flattening of a build tree into [`LinearNode`]s.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use super::{BuildArena, Kind, NodeId, to_u32};
use crate::node::LinearNode;

/// Lay out the tree under `root` so that first children directly follow their
/// parent and second children are reached through `offset`.
pub(crate) fn flatten(arena: &BuildArena, root: NodeId) -> Result<Vec<LinearNode>, TryReserveError> {
    let mut nodes = Vec::new();
    nodes.try_reserve_exact(arena.len())?;
    nodes.resize(arena.len(), LinearNode::default());
    let mut next = 0;
    flatten_node(arena, root, &mut nodes, &mut next);
    nodes.truncate(next);
    Ok(nodes)
}

/// Write `id` at `*next` and its subtree after it; returns its index.
fn flatten_node(arena: &BuildArena, id: NodeId, out: &mut [LinearNode], next: &mut usize) -> u32 {
    let index = *next;
    *next += 1;
    let node = arena.node(id);
    out[index] = match node.kind {
        Kind::Leaf { first, count } => LinearNode::leaf(node.bounds, first, count),
        Kind::Interior { left, right, axis } => {
            flatten_node(arena, left, out, next);
            let second = flatten_node(arena, right, out, next);
            LinearNode::interior(node.bounds, second, axis)
        }
    };
    to_u32(index)
}
