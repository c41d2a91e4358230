use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::geometry::limits::{
    in_coord_bounds, in_width_bounds, MAX_ANNOTATIONS, MAX_BLOCKS, MAX_EDGES, MAX_LOTS, MAX_NODES,
    MAX_POLYGON_POINTS, MAX_POLYGON_POINTS_TOTAL, MIN_ROUNDABOUT_PORTS, WIDTH_MAX,
};
use crate::model::{Block, Edge, Lot, NaturalElement, Node, Roundabout, TextLabel, Vec2};
use crate::TopologyState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocSer<'a> {
    version: u32,
    next_id: u32,
    nodes: Vec<&'a Node>,
    edges: Vec<&'a Edge>,
    roundabouts: Vec<&'a Roundabout>,
    blocks: Vec<&'a Block>,
    lots: Vec<&'a Lot>,
    naturals: Vec<&'a NaturalElement>,
    labels: Vec<&'a TextLabel>,
}

#[derive(Deserialize)]
struct DocDe {
    version: Option<u32>,
    #[serde(default)]
    next_id: u32,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(default)]
    roundabouts: Vec<Roundabout>,
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    lots: Vec<Lot>,
    #[serde(default)]
    naturals: Vec<NaturalElement>,
    #[serde(default)]
    labels: Vec<TextLabel>,
}

pub fn to_json_impl(s: &TopologyState) -> Value {
    let doc = DocSer {
        version: SNAPSHOT_VERSION,
        next_id: s.next_id,
        nodes: s.nodes.values().collect(),
        edges: s.edges.values().collect(),
        roundabouts: s.roundabouts.values().collect(),
        blocks: s.blocks.values().collect(),
        lots: s.lots.values().collect(),
        naturals: s.naturals.values().collect(),
        labels: s.labels.values().collect(),
    };
    serde_json::to_value(doc).unwrap_or(Value::Null)
}

fn check_pt(p: Vec2, what: &'static str) -> Result<()> {
    if in_coord_bounds(p.x) && in_coord_bounds(p.y) {
        Ok(())
    } else {
        Err(Error::CoordOutOfBounds(what))
    }
}

struct PointBudget(usize);

impl PointBudget {
    fn take(&mut self, poly: &[Vec2], what: &'static str) -> Result<()> {
        if poly.len() > MAX_POLYGON_POINTS {
            return Err(Error::LimitExceeded { what: "polygon points", limit: MAX_POLYGON_POINTS });
        }
        self.0 += poly.len();
        if self.0 > MAX_POLYGON_POINTS_TOTAL {
            return Err(Error::LimitExceeded { what: "total polygon points", limit: MAX_POLYGON_POINTS_TOTAL });
        }
        poly.iter().try_for_each(|p| check_pt(*p, what))
    }
}

fn check_caps(doc: &DocDe) -> Result<()> {
    let caps = [
        ("nodes", doc.nodes.len(), MAX_NODES),
        ("edges", doc.edges.len(), MAX_EDGES),
        ("blocks", doc.blocks.len(), MAX_BLOCKS),
        ("lots", doc.lots.len(), MAX_LOTS),
        ("annotations", doc.naturals.len() + doc.labels.len(), MAX_ANNOTATIONS),
    ];
    for (what, got, limit) in caps {
        if got > limit {
            return Err(Error::LimitExceeded { what, limit });
        }
    }
    Ok(())
}

fn check_geometry(doc: &DocDe) -> Result<()> {
    for n in &doc.nodes {
        check_pt(n.position, "node position")?;
    }
    for e in &doc.edges {
        let c = &e.curve;
        for p in [c.p0, c.p1, c.p2, c.p3] {
            check_pt(p, "edge curve")?;
        }
        if !in_width_bounds(e.width) {
            return Err(Error::OutOfRange { param: "width", min: 0.0, max: WIDTH_MAX, got: e.width });
        }
    }
    for r in &doc.roundabouts {
        check_pt(r.center, "roundabout center")?;
        if !in_width_bounds(r.radius) {
            return Err(Error::OutOfRange { param: "radius", min: 0.0, max: WIDTH_MAX, got: r.radius });
        }
    }
    let mut budget = PointBudget(0);
    for b in &doc.blocks {
        budget.take(&b.polygon, "block polygon")?;
        for side in &b.sides {
            budget.take(side, "block side")?;
        }
    }
    for l in &doc.lots {
        budget.take(&l.polygon, "lot polygon")?;
        if !l.area.is_finite() || !l.frontage.is_finite() {
            return Err(Error::NonFinite("lot measures"));
        }
    }
    for n in &doc.naturals {
        budget.take(&n.polygon, "natural polygon")?;
    }
    for l in &doc.labels {
        check_pt(l.position, "label position")?;
    }
    Ok(())
}

/// Decode and validate a snapshot. Structural problems (wrong version,
/// oversize collections, bad coordinates) are errors; dangling references are
/// dropped with a warning.
pub fn from_json_impl(v: Value) -> Result<TopologyState> {
    let doc: DocDe = serde_json::from_value(v)?;
    let version = doc.version.unwrap_or(SNAPSHOT_VERSION);
    if version != SNAPSHOT_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    check_caps(&doc)?;
    check_geometry(&doc)?;

    let mut s = TopologyState::default();
    let mut max_id = doc.next_id;
    for n in doc.nodes {
        max_id = max_id.max(n.id);
        s.nodes.insert(n.id, n);
    }
    for mut e in doc.edges {
        let (Some(a), Some(b)) = (s.nodes.get(&e.from), s.nodes.get(&e.to)) else {
            warn!(edge = e.id, "edge references a missing node; dropped");
            continue;
        };
        if e.from == e.to {
            warn!(edge = e.id, "self-loop edge dropped");
            continue;
        }
        // endpoints always sit on their nodes
        e.curve = e.curve.with_start(a.position).with_end(b.position);
        max_id = max_id.max(e.id);
        s.edges.insert(e.id, e);
    }
    for mut r in doc.roundabouts {
        r.ports.retain(|p| s.nodes.contains_key(p));
        r.edges.retain(|e| s.edges.contains_key(e));
        if (r.ports.len() as u32) < MIN_ROUNDABOUT_PORTS || r.edges.len() != r.ports.len() {
            warn!(roundabout = r.id, "roundabout lost ports or arcs; dropped");
            continue;
        }
        max_id = max_id.max(r.id);
        s.roundabouts.insert(r.id, r);
    }
    for n in s.nodes.values_mut() {
        if n.roundabout.map_or(false, |r| !s.roundabouts.contains_key(&r)) {
            n.roundabout = None;
        }
    }
    for b in doc.blocks {
        max_id = max_id.max(b.id);
        s.blocks.insert(b.id, b);
    }
    let mut owned: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for l in doc.lots {
        if !s.blocks.contains_key(&l.block) {
            warn!(lot = l.id, block = l.block, "lot references a missing block; dropped");
            continue;
        }
        max_id = max_id.max(l.id);
        owned.entry(l.block).or_default().insert(l.id);
        s.lots.insert(l.id, l);
    }
    for b in s.blocks.values_mut() {
        let mine = owned.remove(&b.id).unwrap_or_default();
        b.lots.retain(|id| mine.contains(id));
        for id in mine {
            if !b.lots.contains(&id) {
                b.lots.push(id);
            }
        }
    }
    for n in doc.naturals {
        max_id = max_id.max(n.id);
        s.naturals.insert(n.id, n);
    }
    for l in doc.labels {
        max_id = max_id.max(l.id);
        s.labels.insert(l.id, l);
    }
    s.next_id = max_id;
    Ok(s)
}
