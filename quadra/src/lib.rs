pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod model;
pub mod geometry {
    pub mod clip;
    pub mod cubic;
    pub mod intersect;
    pub mod limits;
    pub mod math;
    pub mod polygon;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod blocks;
    pub mod faces;
    pub mod lots;
    pub mod regeneration;
    pub mod snapping;
}
mod json;

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use tracing::debug;

pub use algorithms::lots::LotOptions;
pub use algorithms::regeneration::RefreshMode;
pub use algorithms::snapping::{Snap, SnapQuery};
pub use config::KernelConfig;
pub use error::{Error, Result, TopologyError};
pub use json::SNAPSHOT_VERSION;

use geometry::cubic::CubicBezier;
use geometry::limits::{
    in_coord_bounds, in_width_bounds, MAX_ANNOTATIONS, MAX_EDGES, MAX_NODES, MAX_POLYGON_POINTS,
    MAX_ROUNDABOUT_PORTS, MIN_ROUNDABOUT_PORTS, WIDTH_MAX,
};
use geometry::polygon::normalize_polygon;
use geometry::tolerance::EPS_POS;
use history::History;
use model::{
    Block, BlockId, Edge, EdgeId, LabelId, Lot, LotId, NaturalElement, NaturalId, NaturalKind, Node, NodeId,
    NodeKind, RoadStyle, Roundabout, RoundaboutId, TextLabel, Vec2,
};

/// Every collection the editor works on. Cloned whole for undo; serialized
/// whole for snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyState {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: BTreeMap<EdgeId, Edge>,
    pub roundabouts: BTreeMap<RoundaboutId, Roundabout>,
    pub blocks: BTreeMap<BlockId, Block>,
    pub lots: BTreeMap<LotId, Lot>,
    pub naturals: BTreeMap<NaturalId, NaturalElement>,
    pub labels: BTreeMap<LabelId, TextLabel>,
    /// Last id handed out; ids are shared across all collections.
    pub next_id: u32,
}

impl TopologyState {
    pub(crate) fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.edges.values().filter(|e| e.touches(node)).count()
    }

    fn annotation_count(&self) -> usize {
        self.naturals.len() + self.labels.len()
    }
}

/// The road graph plus derived blocks and lots, with undo history.
#[derive(Clone, Debug)]
pub struct Topology {
    pub(crate) state: TopologyState,
    pub(crate) config: KernelConfig,
    pub(crate) history: History<TopologyState>,
    version: u64,
}

impl Default for Topology {
    fn default() -> Self {
        Topology::new()
    }
}

pub(crate) fn check_point(p: Vec2, what: &'static str) -> Result<()> {
    if !p.is_finite() {
        return Err(Error::NonFinite(what));
    }
    if !in_coord_bounds(p.x) || !in_coord_bounds(p.y) {
        return Err(Error::CoordOutOfBounds(what));
    }
    Ok(())
}

pub(crate) fn check_width(w: f64) -> Result<()> {
    if !w.is_finite() {
        return Err(Error::NonFinite("width"));
    }
    if !in_width_bounds(w) {
        return Err(Error::OutOfRange { param: "width", min: 0.0, max: WIDTH_MAX, got: w });
    }
    Ok(())
}

/// Validate raw points and run them through normalization.
pub(crate) fn check_polygon(poly: &[Vec2], what: &'static str) -> Result<Vec<Vec2>> {
    if poly.len() > MAX_POLYGON_POINTS {
        return Err(Error::LimitExceeded { what: "polygon points", limit: MAX_POLYGON_POINTS });
    }
    for p in poly {
        check_point(*p, what)?;
    }
    normalize_polygon(poly).ok_or(Error::InvalidPolygon)
}

fn check_user_style(style: RoadStyle) -> Result<()> {
    if style.is_internal() {
        return Err(Error::InvalidOptions("roundabout_internal is reserved for roundabouts".into()));
    }
    Ok(())
}

impl Topology {
    pub fn new() -> Self {
        Topology::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let config = config.sanitized();
        Topology {
            state: TopologyState::default(),
            history: History::new(config.history_limit),
            config,
            version: 0,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn state(&self) -> &TopologyState {
        &self.state
    }

    /// Bumped on every state change, undo and redo included.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Run a command. On success the prior state is pushed to history (if
    /// anything changed); on failure the prior state is restored.
    pub(crate) fn commit<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let before = self.state.clone();
        match f(self) {
            Ok(r) => {
                if self.state != before {
                    self.history.record(before);
                    self.version += 1;
                }
                Ok(r)
            }
            Err(e) => {
                self.state = before;
                Err(e)
            }
        }
    }

    /// `commit` for commands that change the graph: node kinds and blocks are
    /// re-derived afterwards.
    pub(crate) fn commit_topology<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.commit(|t| {
            let r = f(t)?;
            t.refresh_node_kinds();
            t.refresh_blocks(RefreshMode::Edit);
            Ok(r)
        })
    }

    pub(crate) fn refresh_node_kinds(&mut self) {
        let mut degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for e in self.state.edges.values() {
            *degree.entry(e.from).or_default() += 1;
            *degree.entry(e.to).or_default() += 1;
        }
        for n in self.state.nodes.values_mut() {
            n.kind = if n.roundabout.is_some() {
                NodeKind::RoundaboutPort
            } else if degree.get(&n.id).copied().unwrap_or(0) >= 3 {
                NodeKind::Intersection
            } else {
                NodeKind::Endpoint
            };
        }
    }

    // Queries

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.state.edges.get(&id)
    }

    pub fn roundabout(&self, id: RoundaboutId) -> Option<&Roundabout> {
        self.state.roundabouts.get(&id)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.state.blocks.get(&id)
    }

    pub fn lot(&self, id: LotId) -> Option<&Lot> {
        self.state.lots.get(&id)
    }

    pub fn natural(&self, id: NaturalId) -> Option<&NaturalElement> {
        self.state.naturals.get(&id)
    }

    pub fn label(&self, id: LabelId) -> Option<&TextLabel> {
        self.state.labels.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.state.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.state.edges.values()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.state.blocks.values()
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.state.lots.values()
    }

    /// Lots of a block in generation order.
    pub fn lots_of(&self, block: BlockId) -> Vec<&Lot> {
        self.state
            .blocks
            .get(&block)
            .map(|b| b.lots.iter().filter_map(|id| self.state.lots.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.edges.len()
    }

    // Nodes

    fn add_node_inner(&mut self, position: Vec2) -> Result<NodeId> {
        check_point(position, "node position")?;
        if self.state.nodes.len() >= MAX_NODES {
            return Err(Error::LimitExceeded { what: "nodes", limit: MAX_NODES });
        }
        let id = self.state.alloc_id();
        self.state
            .nodes
            .insert(id, Node { id, position, kind: NodeKind::Endpoint, roundabout: None });
        Ok(id)
    }

    pub fn add_node(&mut self, position: Vec2) -> Result<NodeId> {
        self.commit(|t| t.add_node_inner(position))
    }

    fn set_node_position(&mut self, id: NodeId, position: Vec2) {
        if let Some(n) = self.state.nodes.get_mut(&id) {
            n.position = position;
        }
        for e in self.state.edges.values_mut() {
            if e.from == id {
                e.curve = e.curve.with_start(position);
            } else if e.to == id {
                e.curve = e.curve.with_end(position);
            }
        }
    }

    /// Move a node; incident edges keep their shape by dragging the adjacent
    /// control point along.
    pub fn move_node(&mut self, id: NodeId, position: Vec2) -> Result<()> {
        check_point(position, "node position")?;
        let node = self.state.nodes.get(&id).ok_or(Error::unknown("node", id))?;
        if node.roundabout.is_some() {
            return Err(Error::PortLocked(id));
        }
        if node.position.distance_sq(position) <= EPS_POS * EPS_POS {
            return Ok(());
        }
        self.commit_topology(|t| {
            t.set_node_position(id, position);
            Ok(())
        })
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.state.nodes.get(&id).ok_or(Error::unknown("node", id))?;
        if node.roundabout.is_some() {
            return Err(Error::PortLocked(id));
        }
        self.commit_topology(|t| {
            t.state.edges.retain(|_, e| !e.touches(id));
            t.state.nodes.remove(&id);
            Ok(())
        })
    }

    // Edges

    fn insert_edge(&mut self, from: NodeId, to: NodeId, curve: CubicBezier, width: f64, style: RoadStyle) -> Result<EdgeId> {
        if self.state.edges.len() >= MAX_EDGES {
            return Err(Error::LimitExceeded { what: "edges", limit: MAX_EDGES });
        }
        let id = self.state.alloc_id();
        self.state.edges.insert(id, Edge { id, from, to, curve, width, style });
        Ok(id)
    }

    fn add_edge_inner(
        &mut self,
        from: NodeId,
        to: NodeId,
        controls: Option<(Vec2, Vec2)>,
        style: RoadStyle,
        width: f64,
    ) -> Result<EdgeId> {
        if from == to {
            return Err(Error::SelfLoop(from));
        }
        let a = self.state.nodes.get(&from).ok_or(Error::unknown("node", from))?.position;
        let b = self.state.nodes.get(&to).ok_or(Error::unknown("node", to))?.position;
        check_width(width)?;
        check_user_style(style)?;
        let curve = match controls {
            Some((c1, c2)) => {
                check_point(c1, "control point")?;
                check_point(c2, "control point")?;
                CubicBezier::new(a, c1, c2, b)
            }
            None => CubicBezier::line(a, b),
        };
        self.insert_edge(from, to, curve, width, style)
    }

    /// Straight road between two existing nodes.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, style: RoadStyle, width: f64) -> Result<EdgeId> {
        self.commit_topology(|t| t.add_edge_inner(from, to, None, style, width))
    }

    pub fn add_curved_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        c1: Vec2,
        c2: Vec2,
        style: RoadStyle,
        width: f64,
    ) -> Result<EdgeId> {
        self.commit_topology(|t| t.add_edge_inner(from, to, Some((c1, c2)), style, width))
    }

    fn editable_edge(&self, id: EdgeId) -> Result<&Edge> {
        let e = self.state.edges.get(&id).ok_or(Error::unknown("edge", id))?;
        if e.style.is_internal() {
            return Err(Error::PortLocked(e.from));
        }
        Ok(e)
    }

    pub fn set_edge_curve(&mut self, id: EdgeId, c1: Vec2, c2: Vec2) -> Result<()> {
        self.editable_edge(id)?;
        check_point(c1, "control point")?;
        check_point(c2, "control point")?;
        self.commit_topology(|t| {
            if let Some(e) = t.state.edges.get_mut(&id) {
                e.curve = CubicBezier::new(e.curve.p0, c1, c2, e.curve.p3);
            }
            Ok(())
        })
    }

    pub fn set_edge_width(&mut self, id: EdgeId, width: f64) -> Result<()> {
        if !self.state.edges.contains_key(&id) {
            return Err(Error::unknown("edge", id));
        }
        check_width(width)?;
        self.commit_topology(|t| {
            if let Some(e) = t.state.edges.get_mut(&id) {
                e.width = width;
            }
            Ok(())
        })
    }

    pub fn set_edge_style(&mut self, id: EdgeId, style: RoadStyle) -> Result<()> {
        self.editable_edge(id)?;
        check_user_style(style)?;
        self.commit(|t| {
            if let Some(e) = t.state.edges.get_mut(&id) {
                e.style = style;
            }
            Ok(())
        })
    }

    fn split_edge_inner(&mut self, id: EdgeId, t: f64) -> Result<NodeId> {
        if !t.is_finite() {
            return Err(Error::NonFinite("t"));
        }
        if t <= EPS_POS || t >= 1.0 - EPS_POS {
            return Err(Error::OutOfRange { param: "t", min: 0.0, max: 1.0, got: t });
        }
        let edge = self.editable_edge(id)?.clone();
        let (left, right) = edge.curve.split_at(t);
        let mid = self.add_node_inner(left.p3)?;
        self.state.edges.remove(&id);
        let a = self.insert_edge(edge.from, mid, left, edge.width, edge.style)?;
        let b = self.insert_edge(mid, edge.to, right, edge.width, edge.style)?;
        // keep block cycles keyed on the halves so they survive the split
        for block in self.state.blocks.values_mut() {
            let Some(k) = block.edges.iter().position(|e| *e == id) else { continue };
            let n = block.edges.len();
            let prev = block.edges[(k + n - 1) % n];
            let forward = self.state.edges.get(&prev).map_or(true, |p| p.touches(edge.from));
            let halves = if forward { [a, b] } else { [b, a] };
            block.edges.splice(k..=k, halves);
            if let Some(grid) = block.grid.as_mut() {
                grid.shift_front_side_after(k);
            }
        }
        Ok(mid)
    }

    /// Split an edge at parameter `t` (exclusive of the ends). The new node
    /// is returned; both halves keep the edge's style and width.
    pub fn split_edge(&mut self, id: EdgeId, t: f64) -> Result<NodeId> {
        self.commit_topology(|tp| tp.split_edge_inner(id, t))
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        self.editable_edge(id)?;
        self.commit_topology(|t| {
            t.state.edges.remove(&id);
            Ok(())
        })
    }

    // Snapping-driven drawing

    fn resolve_inner(&mut self, position: Vec2) -> Result<NodeId> {
        check_point(position, "position")?;
        let radius = self.config.snap_radius;
        let samples = self.config.snap_flatten_samples;
        let mut query = SnapQuery::new(position, radius);
        query.skip_internal = true;
        match algorithms::snapping::snap_impl(&self.state, &query, samples) {
            Some(Snap::Node { id, .. }) => Ok(id),
            Some(Snap::Edge { id, t, .. }) => {
                let (from, to) = {
                    let e = self.state.edges.get(&id).ok_or(Error::unknown("edge", id))?;
                    (e.from, e.to)
                };
                if t <= EPS_POS {
                    Ok(from)
                } else if t >= 1.0 - EPS_POS {
                    Ok(to)
                } else {
                    self.split_edge_inner(id, t)
                }
            }
            _ => self.add_node_inner(position),
        }
    }

    /// Turn a raw pointer position into a node: an existing node within the
    /// snap radius, else a new node splitting the nearest edge, else a fresh
    /// node.
    pub fn resolve_point(&mut self, position: Vec2) -> Result<NodeId> {
        self.commit_topology(|t| t.resolve_inner(position))
    }

    /// Draw a straight road between two raw positions as one undo step.
    pub fn connect(&mut self, a: Vec2, b: Vec2, style: RoadStyle, width: f64) -> Result<EdgeId> {
        check_width(width)?;
        check_user_style(style)?;
        self.commit_topology(|t| {
            let na = t.resolve_inner(a)?;
            let nb = t.resolve_inner(b)?;
            t.add_edge_inner(na, nb, None, style, width)
        })
    }

    pub fn snap(&self, query: &SnapQuery) -> Option<Snap> {
        algorithms::snapping::snap_impl(&self.state, query, self.config.snap_flatten_samples)
    }

    pub fn snap_block_boundary(&self, position: Vec2, radius: f64) -> Option<Snap> {
        algorithms::snapping::snap_block_boundary(&self.state, position, radius)
    }

    // Roundabouts

    fn port_position(center: Vec2, radius: f64, i: usize, count: usize) -> Vec2 {
        let a = TAU * i as f64 / count as f64;
        center + Vec2::new(a.cos(), a.sin()) * radius
    }

    fn arc_between(center: Vec2, radius: f64, i: usize, count: usize, from: Vec2, to: Vec2) -> CubicBezier {
        let sweep = TAU / count as f64;
        CubicBezier::arc(center, radius, sweep * i as f64, sweep).with_start(from).with_end(to)
    }

    /// Place ports and internal arcs of a roundabout from its center/radius,
    /// dragging external roads along with their ports.
    fn layout_roundabout(&mut self, id: RoundaboutId) {
        let Some(r) = self.state.roundabouts.get(&id).cloned() else { return };
        let count = r.ports.len();
        let positions: Vec<Vec2> = (0..count).map(|i| Self::port_position(r.center, r.radius, i, count)).collect();
        for (port, pos) in r.ports.iter().zip(&positions) {
            self.set_node_position(*port, *pos);
        }
        for (i, eid) in r.edges.iter().enumerate() {
            let (from, to) = (positions[i], positions[(i + 1) % count]);
            if let Some(e) = self.state.edges.get_mut(eid) {
                e.curve = Self::arc_between(r.center, r.radius, i, count, from, to);
            }
        }
    }

    fn check_roundabout_geometry(center: Vec2, radius: f64) -> Result<()> {
        check_point(center, "roundabout center")?;
        if !radius.is_finite() {
            return Err(Error::NonFinite("radius"));
        }
        if !in_width_bounds(radius) {
            return Err(Error::OutOfRange { param: "radius", min: 0.0, max: WIDTH_MAX, got: radius });
        }
        Ok(())
    }

    /// Ring of `ports` evenly spaced nodes joined by circular-arc internal
    /// edges.
    pub fn add_roundabout(&mut self, center: Vec2, radius: f64, ports: u32) -> Result<RoundaboutId> {
        Self::check_roundabout_geometry(center, radius)?;
        if !(MIN_ROUNDABOUT_PORTS..=MAX_ROUNDABOUT_PORTS).contains(&ports) {
            return Err(Error::OutOfRange {
                param: "ports",
                min: MIN_ROUNDABOUT_PORTS as f64,
                max: MAX_ROUNDABOUT_PORTS as f64,
                got: ports as f64,
            });
        }
        self.commit_topology(|t| {
            let id = t.state.alloc_id();
            let count = ports as usize;
            let mut port_ids = Vec::with_capacity(count);
            for i in 0..count {
                let nid = t.add_node_inner(Self::port_position(center, radius, i, count))?;
                if let Some(n) = t.state.nodes.get_mut(&nid) {
                    n.roundabout = Some(id);
                }
                port_ids.push(nid);
            }
            let width = t.config.default_road_width;
            let mut edge_ids = Vec::with_capacity(count);
            for i in 0..count {
                let (a, b) = (port_ids[i], port_ids[(i + 1) % count]);
                let curve = CubicBezier::line(t.state.nodes[&a].position, t.state.nodes[&b].position);
                edge_ids.push(t.insert_edge(a, b, curve, width, RoadStyle::RoundaboutInternal)?);
            }
            t.state
                .roundabouts
                .insert(id, Roundabout { id, center, radius, ports: port_ids, edges: edge_ids });
            t.layout_roundabout(id);
            Ok(id)
        })
    }

    pub fn move_roundabout(&mut self, id: RoundaboutId, center: Vec2) -> Result<()> {
        let radius = self.state.roundabouts.get(&id).ok_or(Error::unknown("roundabout", id))?.radius;
        Self::check_roundabout_geometry(center, radius)?;
        self.commit_topology(|t| {
            if let Some(r) = t.state.roundabouts.get_mut(&id) {
                r.center = center;
            }
            t.layout_roundabout(id);
            Ok(())
        })
    }

    pub fn resize_roundabout(&mut self, id: RoundaboutId, radius: f64) -> Result<()> {
        let center = self.state.roundabouts.get(&id).ok_or(Error::unknown("roundabout", id))?.center;
        Self::check_roundabout_geometry(center, radius)?;
        self.commit_topology(|t| {
            if let Some(r) = t.state.roundabouts.get_mut(&id) {
                r.radius = radius;
            }
            t.layout_roundabout(id);
            Ok(())
        })
    }

    /// Remove a roundabout, its ports, and every road attached to them.
    pub fn remove_roundabout(&mut self, id: RoundaboutId) -> Result<()> {
        if !self.state.roundabouts.contains_key(&id) {
            return Err(Error::unknown("roundabout", id));
        }
        self.commit_topology(|t| {
            if let Some(r) = t.state.roundabouts.remove(&id) {
                let ports: BTreeSet<NodeId> = r.ports.iter().copied().collect();
                t.state.edges.retain(|_, e| !ports.contains(&e.from) && !ports.contains(&e.to));
                for p in &ports {
                    t.state.nodes.remove(p);
                }
            }
            Ok(())
        })
    }

    /// Closed outline of the paved area of an edge; `None` for roundabout
    /// internal edges.
    pub fn road_surface(&self, id: EdgeId) -> Result<Option<Vec<Vec2>>> {
        let e = self.state.edges.get(&id).ok_or(Error::unknown("edge", id))?;
        if e.style.is_internal() {
            return Ok(None);
        }
        Ok(Some(e.curve.stroke_outline(e.width, self.config.snap_flatten_samples)))
    }

    // Natural elements and labels

    fn check_annotation_room(&self) -> Result<()> {
        if self.state.annotation_count() >= MAX_ANNOTATIONS {
            return Err(Error::LimitExceeded { what: "annotations", limit: MAX_ANNOTATIONS });
        }
        Ok(())
    }

    pub fn add_natural(&mut self, kind: NaturalKind, polygon: &[Vec2], name: Option<String>) -> Result<NaturalId> {
        self.check_annotation_room()?;
        let polygon = check_polygon(polygon, "natural polygon")?;
        self.commit(|t| {
            let id = t.state.alloc_id();
            t.state.naturals.insert(id, NaturalElement { id, kind, polygon, name });
            Ok(id)
        })
    }

    pub fn set_natural_polygon(&mut self, id: NaturalId, polygon: &[Vec2]) -> Result<()> {
        if !self.state.naturals.contains_key(&id) {
            return Err(Error::unknown("natural", id));
        }
        let polygon = check_polygon(polygon, "natural polygon")?;
        self.commit(|t| {
            if let Some(n) = t.state.naturals.get_mut(&id) {
                n.polygon = polygon;
            }
            Ok(())
        })
    }

    pub fn set_natural_name(&mut self, id: NaturalId, name: Option<String>) -> Result<()> {
        if !self.state.naturals.contains_key(&id) {
            return Err(Error::unknown("natural", id));
        }
        self.commit(|t| {
            if let Some(n) = t.state.naturals.get_mut(&id) {
                n.name = name;
            }
            Ok(())
        })
    }

    pub fn remove_natural(&mut self, id: NaturalId) -> Result<()> {
        if !self.state.naturals.contains_key(&id) {
            return Err(Error::unknown("natural", id));
        }
        self.commit(|t| {
            t.state.naturals.remove(&id);
            Ok(())
        })
    }

    pub fn add_label(&mut self, text: &str, position: Vec2, rotation: f64, size: f64) -> Result<LabelId> {
        self.check_annotation_room()?;
        check_point(position, "label position")?;
        if !rotation.is_finite() {
            return Err(Error::NonFinite("rotation"));
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::OutOfRange { param: "size", min: 0.0, max: f64::MAX, got: size });
        }
        let text = text.to_string();
        self.commit(|t| {
            let id = t.state.alloc_id();
            t.state.labels.insert(id, TextLabel { id, text, position, rotation, size });
            Ok(id)
        })
    }

    pub fn move_label(&mut self, id: LabelId, position: Vec2) -> Result<()> {
        if !self.state.labels.contains_key(&id) {
            return Err(Error::unknown("label", id));
        }
        check_point(position, "label position")?;
        self.commit(|t| {
            if let Some(l) = t.state.labels.get_mut(&id) {
                l.position = position;
            }
            Ok(())
        })
    }

    pub fn set_label_text(&mut self, id: LabelId, text: &str) -> Result<()> {
        if !self.state.labels.contains_key(&id) {
            return Err(Error::unknown("label", id));
        }
        let text = text.to_string();
        self.commit(|t| {
            if let Some(l) = t.state.labels.get_mut(&id) {
                l.text = text;
            }
            Ok(())
        })
    }

    pub fn remove_label(&mut self, id: LabelId) -> Result<()> {
        if !self.state.labels.contains_key(&id) {
            return Err(Error::unknown("label", id));
        }
        self.commit(|t| {
            t.state.labels.remove(&id);
            Ok(())
        })
    }

    // History

    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo(&mut self.state);
        if changed {
            self.version += 1;
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo(&mut self.state);
        if changed {
            self.version += 1;
        }
        changed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Empty the topology (undoable). Ids keep counting from where they
    /// were.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(|t| {
            let next_id = t.state.next_id;
            t.state = TopologyState { next_id, ..TopologyState::default() };
            Ok(())
        })?;
        debug!(version = self.version, "topology cleared");
        Ok(())
    }

    // Persistence

    pub fn to_json_value(&self) -> serde_json::Value {
        json::to_json_impl(&self.state)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Replace the whole state with a snapshot. Persisted lots are kept as
    /// they are; history is cleared.
    pub fn load_json_value(&mut self, v: serde_json::Value) -> Result<()> {
        let state = json::from_json_impl(v)?;
        self.state = state;
        self.refresh_node_kinds();
        self.refresh_blocks(RefreshMode::Load);
        self.history.clear();
        self.version += 1;
        Ok(())
    }

    pub fn load_json_str(&mut self, s: &str) -> Result<()> {
        let v: serde_json::Value = serde_json::from_str(s)?;
        self.load_json_value(v)
    }

    pub fn from_json_str(s: &str, config: KernelConfig) -> Result<Topology> {
        let mut t = Topology::with_config(config);
        t.load_json_str(s)?;
        Ok(t)
    }
}
