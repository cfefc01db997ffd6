//! The DAWG builder (C2): turns the query BWT into a directed acyclic word
//! graph, one node per distinct query substring, topologically ordered.

use std::collections::HashMap;

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use crate::error::DawgError;
use crate::query_bwt::QueryBwt;

/// One DAWG node: a distinct query substring identified by its BWT interval.
#[derive(Debug, Clone, Copy)]
pub struct DawgNode {
    /// Query-BWT suffix-array interval `[lo, hi)` identifying this substring.
    pub lo: i32,
    /// See [`DawgNode::lo`].
    pub hi: i32,
    /// Incoming edge symbol in nt6 encoding (`1..=4`); `0` for the root.
    pub c: u8,
    pre_start: u32,
    pre_len: u32,
}

/// The query DAWG: a flat node array plus a flat predecessor array backing
/// per-node predecessor slices.
pub struct Dawg<'a> {
    nodes: BumpVec<'a, DawgNode>,
    pre: BumpVec<'a, u32>,
}

impl<'a> Dawg<'a> {
    /// Nodes in topological order (node 0 is always the root).
    pub fn nodes(&self) -> &[DawgNode] {
        &self.nodes
    }

    /// Predecessor node indices of node `i`.
    pub fn predecessors(&self, i: usize) -> &[u32] {
        let node = &self.nodes[i];
        let start = node.pre_start as usize;
        let len = node.pre_len as usize;
        &self.pre[start..start + len]
    }

    /// Build the DAWG for `bwt` inside `arena`.
    pub fn build(arena: &'a Bump, bwt: &QueryBwt) -> Result<Self, DawgError> {
        let root_key = (0i32, bwt.seq_len() + 1);

        let degrees = count_in_degrees(bwt, root_key);
        let n_node = degrees.len();
        let n_pre: usize = degrees.values().map(|d| d.total as usize).sum();

        let mut ids: HashMap<(i32, i32), TopoCell> = HashMap::with_capacity(n_node);
        for (&key, deg) in degrees.iter() {
            ids.insert(
                key,
                TopoCell {
                    total: deg.total,
                    visit: 0,
                    id: 0,
                },
            );
        }

        let mut nodes = BumpVec::with_capacity_in(n_node, arena);
        nodes.push(DawgNode {
            lo: root_key.0,
            hi: root_key.1,
            c: 0,
            pre_start: 0,
            pre_len: 0,
        });
        let mut next_id = 1u32;
        let mut pre_offset = 0u32;
        let mut stack = vec![root_key];

        while let Some((lo, hi)) = stack.pop() {
            let (rlo, rhi) = bwt.rank2a(lo, hi);
            for c in (0..4).rev() {
                let clo = bwt.l2()[c] + rlo[c] as i32;
                let chi = bwt.l2()[c] + rhi[c] as i32;
                if clo == chi {
                    continue;
                }
                let key = (clo, chi);
                let cell = ids.get_mut(&key).expect("in-degree pass must have seen every reachable interval");
                cell.visit += 1;
                if cell.visit == cell.total {
                    cell.id = next_id;
                    nodes.push(DawgNode {
                        lo: clo,
                        hi: chi,
                        c: (c + 1) as u8,
                        pre_start: pre_offset,
                        pre_len: 0,
                    });
                    pre_offset += cell.total;
                    next_id += 1;
                    stack.push(key);
                }
            }
        }

        if next_id as usize != n_node || pre_offset as usize != n_pre {
            return Err(DawgError::NodeCountMismatch {
                emitted: next_id as usize,
                expected: n_node,
            });
        }

        // Pass 3: populate predecessor slices now that every node has an id.
        let mut pre = BumpVec::from_iter_in(std::iter::repeat(0u32).take(n_pre), arena);
        let mut cursor = vec![0u32; n_node];
        for i in 0..nodes.len() {
            let (lo, hi) = (nodes[i].lo, nodes[i].hi);
            let (rlo, rhi) = bwt.rank2a(lo, hi);
            for c in 0..4 {
                let clo = bwt.l2()[c] + rlo[c] as i32;
                let chi = bwt.l2()[c] + rhi[c] as i32;
                if clo == chi {
                    continue;
                }
                let child_id = ids[&(clo, chi)].id as usize;
                let start = nodes[child_id].pre_start as usize;
                let slot = start + cursor[child_id] as usize;
                pre[slot] = i as u32;
                cursor[child_id] += 1;
                nodes[child_id].pre_len += 1;
            }
        }

        debug_assert!(
            nodes.iter().skip(1).all(|n| n.pre_len >= 1),
            "every non-root DAWG node must have at least one predecessor"
        );

        Ok(Self { nodes, pre })
    }
}

struct DegCell {
    total: u32,
}

struct TopoCell {
    total: u32,
    visit: u32,
    id: u32,
}

/// Pass 1: depth-first walk of the query BWT counting, per reachable
/// interval, how many distinct parent edges reach it.
fn count_in_degrees(bwt: &QueryBwt, root_key: (i32, i32)) -> HashMap<(i32, i32), DegCell> {
    let mut degrees: HashMap<(i32, i32), DegCell> = HashMap::new();
    degrees.insert(root_key, DegCell { total: 0 });
    let mut stack = vec![root_key];

    while let Some((lo, hi)) = stack.pop() {
        let (rlo, rhi) = bwt.rank2a(lo, hi);
        for c in (0..4).rev() {
            let clo = bwt.l2()[c] + rlo[c] as i32;
            let chi = bwt.l2()[c] + rhi[c] as i32;
            if clo == chi {
                continue;
            }
            let key = (clo, chi);
            match degrees.get_mut(&key) {
                Some(cell) => cell.total += 1,
                None => {
                    degrees.insert(key, DegCell { total: 1 });
                    stack.push(key);
                }
            }
        }
    }
    degrees
}
