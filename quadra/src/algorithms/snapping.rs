use serde::{Deserialize, Serialize};

use crate::geometry::math::seg_distance_sq;
use crate::model::{BlockId, EdgeId, LotId, NodeId, Vec2};
use crate::TopologyState;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snap {
    Node { id: NodeId, position: Vec2, dist: f64 },
    Edge { id: EdgeId, t: f64, position: Vec2, dist: f64 },
    LotVertex { lot: LotId, index: usize, position: Vec2, dist: f64 },
    BlockBoundary { block: BlockId, position: Vec2, dist: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapQuery {
    pub position: Vec2,
    pub radius: f64,
    #[serde(default)]
    pub include_lots: bool,
    #[serde(default)]
    pub exclude_lot: Option<LotId>,
    /// Skip roundabout-internal edges in the edge pass.
    #[serde(default)]
    pub skip_internal: bool,
}

impl SnapQuery {
    pub fn new(position: Vec2, radius: f64) -> Self {
        SnapQuery { position, radius, include_lots: false, exclude_lot: None, skip_internal: false }
    }
}

pub fn snap_node(s: &TopologyState, p: Vec2, radius: f64) -> Option<Snap> {
    let r2 = radius * radius;
    let mut best: Option<(NodeId, Vec2, f64)> = None;
    for n in s.nodes.values() {
        let d2 = n.position.distance_sq(p);
        if d2 <= r2 && best.map_or(true, |(_, _, bd)| d2 < bd) {
            best = Some((n.id, n.position, d2));
        }
    }
    best.map(|(id, position, d2)| Snap::Node { id, position, dist: d2.sqrt() })
}

pub fn snap_edge(s: &TopologyState, p: Vec2, radius: f64, samples: usize, skip_internal: bool) -> Option<Snap> {
    let r2 = radius * radius;
    let mut best: Option<(EdgeId, f64, Vec2, f64)> = None;
    for e in s.edges.values() {
        if skip_internal && e.style.is_internal() {
            continue;
        }
        let (t, q, d2) = e.curve.closest_point(p, samples);
        if d2 <= r2 && best.map_or(true, |(_, _, _, bd)| d2 < bd) {
            best = Some((e.id, t, q, d2));
        }
    }
    best.map(|(id, t, position, d2)| Snap::Edge { id, t, position, dist: d2.sqrt() })
}

pub fn snap_lot_vertex(s: &TopologyState, p: Vec2, radius: f64, exclude: Option<LotId>) -> Option<Snap> {
    let r2 = radius * radius;
    let mut best: Option<(LotId, usize, Vec2, f64)> = None;
    for lot in s.lots.values() {
        if Some(lot.id) == exclude {
            continue;
        }
        for (i, v) in lot.polygon.iter().enumerate() {
            let d2 = v.distance_sq(p);
            if d2 <= r2 && best.map_or(true, |(_, _, _, bd)| d2 < bd) {
                best = Some((lot.id, i, *v, d2));
            }
        }
    }
    best.map(|(lot, index, position, d2)| Snap::LotVertex { lot, index, position, dist: d2.sqrt() })
}

pub fn snap_block_boundary(s: &TopologyState, p: Vec2, radius: f64) -> Option<Snap> {
    let r2 = radius * radius;
    let mut best: Option<(BlockId, Vec2, f64)> = None;
    for b in s.blocks.values() {
        let n = b.polygon.len();
        for i in 0..n {
            let (a, c) = (b.polygon[i], b.polygon[(i + 1) % n]);
            let (d2, t) = seg_distance_sq(p, a, c);
            if d2 <= r2 && best.map_or(true, |(_, _, bd)| d2 < bd) {
                best = Some((b.id, a.lerp(c, t), d2));
            }
        }
    }
    best.map(|(block, position, d2)| Snap::BlockBoundary { block, position, dist: d2.sqrt() })
}

/// Node, then edge, then (when asked) lot vertex; the first hit wins even if
/// a later category is closer.
pub fn snap_impl(s: &TopologyState, q: &SnapQuery, samples: usize) -> Option<Snap> {
    if !q.position.is_finite() || !q.radius.is_finite() || q.radius < 0.0 {
        return None;
    }
    if let Some(hit) = snap_node(s, q.position, q.radius) {
        return Some(hit);
    }
    if let Some(hit) = snap_edge(s, q.position, q.radius, samples, q.skip_internal) {
        return Some(hit);
    }
    if q.include_lots {
        return snap_lot_vertex(s, q.position, q.radius, q.exclude_lot);
    }
    None
}
