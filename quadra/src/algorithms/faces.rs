//! Planar face tracing over the road graph.
//!
//! Every edge yields two half-edges. Leaving a node, the walk takes the
//! outgoing half-edge with the smallest positive angular delta from the
//! reversed incoming direction (the rightmost turn), so each walk closes
//! around exactly one face. Bounded faces come out clockwise (negative
//! shoelace area); the outer face of each connected component comes out
//! counter-clockwise.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use tracing::warn;

use crate::geometry::tolerance::EPS_ANG;
use crate::model::{Edge, EdgeId, Node, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalfEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub edge: EdgeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub half_edges: Vec<HalfEdge>,
}

impl Face {
    /// Edge ids in walk order (an edge walked on both sides appears twice).
    pub fn edges(&self) -> Vec<EdgeId> {
        self.half_edges.iter().map(|h| h.edge).collect()
    }

    /// Node ids in walk order; node `i` is where half-edge `i` starts.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.half_edges.iter().map(|h| h.from).collect()
    }
}

struct HalfEdgeTable {
    half: Vec<HalfEdge>,
    angle: Vec<f64>,
    outgoing: BTreeMap<NodeId, Vec<usize>>,
}

fn build_table(nodes: &BTreeMap<NodeId, Node>, edges: &BTreeMap<EdgeId, Edge>) -> HalfEdgeTable {
    let mut half = Vec::with_capacity(edges.len() * 2);
    let mut angle = Vec::with_capacity(edges.len() * 2);
    for e in edges.values() {
        if e.from == e.to || !nodes.contains_key(&e.from) || !nodes.contains_key(&e.to) {
            continue;
        }
        // index 2k is forward, 2k+1 its twin
        half.push(HalfEdge { from: e.from, to: e.to, edge: e.id });
        angle.push(e.curve.departure().angle());
        half.push(HalfEdge { from: e.to, to: e.from, edge: e.id });
        angle.push(e.curve.reversed().departure().angle());
    }
    let mut outgoing: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();
    for (i, h) in half.iter().enumerate() {
        outgoing.entry(h.from).or_default().push(i);
    }
    for list in outgoing.values_mut() {
        list.sort_by(|&a, &b| angle[a].total_cmp(&angle[b]).then(a.cmp(&b)));
    }
    HalfEdgeTable { half, angle, outgoing }
}

impl HalfEdgeTable {
    fn next(&self, cur: usize) -> Option<usize> {
        let v = self.half[cur].to;
        let back = self.angle[cur ^ 1];
        let candidates = self.outgoing.get(&v)?;
        let mut best: Option<(f64, usize)> = None;
        for &c in candidates {
            let mut d = self.angle[c] - back;
            while d <= EPS_ANG {
                d += TAU;
            }
            while d > TAU + EPS_ANG {
                d -= TAU;
            }
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, c));
            }
        }
        best.map(|(_, c)| c)
    }
}

/// Trace every face of the graph, the unbounded outer face(s) included.
/// Faces with fewer than 3 half-edges and walks that fail to close within
/// `2·|edges| + 2` steps are dropped.
pub fn trace_faces(nodes: &BTreeMap<NodeId, Node>, edges: &BTreeMap<EdgeId, Edge>) -> Vec<Face> {
    let table = build_table(nodes, edges);
    let m = table.half.len();
    let limit = 2 * edges.len() + 2;
    let mut used = vec![false; m];
    let mut faces = Vec::new();
    for start in 0..m {
        if used[start] {
            continue;
        }
        let mut cur = start;
        let mut walk: Vec<usize> = Vec::new();
        let mut closed = false;
        loop {
            used[cur] = true;
            walk.push(cur);
            if walk.len() > limit {
                warn!(start = start, steps = walk.len(), "face trace exceeded step bound; truncated");
                break;
            }
            let Some(next) = table.next(cur) else { break };
            if next == start {
                closed = true;
                break;
            }
            if used[next] {
                break;
            }
            cur = next;
        }
        if closed && walk.len() >= 3 {
            faces.push(Face {
                half_edges: walk.iter().map(|&i| table.half[i]).collect(),
            });
        }
    }
    faces
}
