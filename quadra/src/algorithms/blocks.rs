//! Block detection: traced faces → inset, CCW block polygons with per-edge
//! sides.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use super::faces::{trace_faces, Face};
use crate::geometry::polygon::{inset_polygon, is_simple, normalize_polygon, point_in_polygon, signed_area};
use crate::geometry::tolerance::EPS_FACE_AREA;
use crate::model::{Edge, EdgeId, Node, NodeId, Vec2};

/// Upper bound on graph nodes sampled by the outer-face heuristic.
const OUTER_NODE_SAMPLE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockOptions {
    pub samples: usize,
    pub inset: bool,
}

impl Default for BlockOptions {
    fn default() -> Self {
        BlockOptions { samples: 16, inset: true }
    }
}

/// Boundary of an edge cycle: `points` is the open ring, `sides[k]` is the
/// polyline contributed by `edges[k]` (both ends included).
#[derive(Clone, Debug, PartialEq)]
pub struct CyclePolygon {
    pub nodes: Vec<NodeId>,
    pub points: Vec<Vec2>,
    pub sides: Vec<Vec<Vec2>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectedBlock {
    /// Canonical cycle key; identifies the block across re-detections.
    pub key: Vec<EdgeId>,
    /// Cycle edges in CCW traversal order.
    pub edges: Vec<EdgeId>,
    pub polygon: Vec<Vec2>,
    pub sides: Vec<Vec<Vec2>>,
}

/// Minimum rotation of the cycle or its reverse, whichever is smaller.
pub fn cycle_key(edges: &[EdgeId]) -> Vec<EdgeId> {
    fn min_rotation(seq: &[EdgeId]) -> Vec<EdgeId> {
        let n = seq.len();
        let mut best: Vec<EdgeId> = seq.to_vec();
        for s in 1..n {
            let rot: Vec<EdgeId> = (0..n).map(|k| seq[(s + k) % n]).collect();
            if rot < best {
                best = rot;
            }
        }
        best
    }
    let fwd = min_rotation(edges);
    let mut rev = edges.to_vec();
    rev.reverse();
    let bwd = min_rotation(&rev);
    if fwd <= bwd {
        fwd
    } else {
        bwd
    }
}

/// Rebuild the boundary of an edge cycle. The walk direction comes from the
/// node shared by the first two edges. `None` if an edge is missing or
/// consecutive edges do not share a node.
pub fn cycle_polygon(
    nodes: &BTreeMap<NodeId, Node>,
    edges: &BTreeMap<EdgeId, Edge>,
    cycle: &[EdgeId],
    samples: usize,
) -> Option<CyclePolygon> {
    if cycle.len() < 2 {
        return None;
    }
    let samples = samples.max(1);
    let first = edges.get(&cycle[0])?;
    let second = edges.get(&cycle[1])?;
    let mut at = if second.touches(first.to) {
        first.from
    } else if second.touches(first.from) {
        first.to
    } else {
        return None;
    };
    let mut walk_nodes = Vec::with_capacity(cycle.len());
    let mut points = Vec::with_capacity(cycle.len() * samples);
    let mut sides = Vec::with_capacity(cycle.len());
    for id in cycle {
        let e = edges.get(id)?;
        if !nodes.contains_key(&e.from) || !nodes.contains_key(&e.to) {
            return None;
        }
        let curve = if e.from == at {
            e.curve
        } else if e.to == at {
            e.curve.reversed()
        } else {
            return None;
        };
        walk_nodes.push(at);
        let pts = curve.flatten(samples);
        // last sample is the next edge's first
        points.extend_from_slice(&pts[..samples]);
        sides.push(pts);
        at = e.other_end(at)?;
    }
    if at != walk_nodes[0] {
        return None;
    }
    Some(CyclePolygon { nodes: walk_nodes, points, sides })
}

/// Drop edges walked on both sides (dangling spurs inside or outside a
/// face), keeping the remaining order.
fn strip_spurs(face: &Face) -> Vec<EdgeId> {
    let seq = face.edges();
    let mut count: BTreeMap<EdgeId, usize> = BTreeMap::new();
    for e in &seq {
        *count.entry(*e).or_default() += 1;
    }
    seq.into_iter().filter(|e| count[e] == 1).collect()
}

struct Candidate {
    edges: Vec<EdgeId>,
    nodes: Vec<NodeId>,
    points: Vec<Vec2>,
    area: f64,
}

fn node_sample(nodes: &BTreeMap<NodeId, Node>) -> Vec<(NodeId, Vec2)> {
    let step = (nodes.len() / OUTER_NODE_SAMPLE).max(1);
    nodes
        .values()
        .step_by(step)
        .take(OUTER_NODE_SAMPLE)
        .map(|n| (n.id, n.position))
        .collect()
}

/// Indices of the unbounded face: the largest |area| face, or any face
/// strictly enclosing more than half of the node sample. Exterior windings
/// rank ahead of interior ones since a bounded face can match the outer
/// face's area up to rounding.
fn outer_faces(cands: &[Candidate], sample: &[(NodeId, Vec2)]) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    let mut largest: Option<usize> = None;
    for (i, c) in cands.iter().enumerate() {
        let better = match largest {
            None => true,
            Some(j) => {
                let rank = |k: &Candidate| (k.area > 0.0, k.area.abs());
                rank(c).partial_cmp(&rank(&cands[j])) == Some(std::cmp::Ordering::Greater)
            }
        };
        if better {
            largest = Some(i);
        }
    }
    if let Some(i) = largest {
        out.insert(i);
    }
    if !sample.is_empty() {
        for (i, c) in cands.iter().enumerate() {
            let on_boundary: HashSet<NodeId> = c.nodes.iter().copied().collect();
            let inside = sample
                .iter()
                .filter(|(id, p)| !on_boundary.contains(id) && point_in_polygon(*p, &c.points, 0.0))
                .count();
            if inside * 2 > sample.len() {
                out.insert(i);
            }
        }
    }
    out
}

fn average_half_width(edges: &BTreeMap<EdgeId, Edge>, cycle: &[EdgeId]) -> f64 {
    let widths: Vec<f64> = cycle
        .iter()
        .filter_map(|id| edges.get(id))
        .filter(|e| !e.style.is_internal())
        .map(|e| e.width)
        .collect();
    if widths.is_empty() {
        return 0.0;
    }
    0.5 * widths.iter().sum::<f64>() / widths.len() as f64
}

/// Split an inset ring back into per-edge sides. Side `k` covers ring
/// indices `k·samples ..= (k+1)·samples` (wrapping).
fn sides_from_ring(ring: &[Vec2], edge_count: usize, samples: usize) -> Vec<Vec<Vec2>> {
    let n = ring.len();
    (0..edge_count)
        .map(|k| (0..=samples).map(|j| ring[(k * samples + j) % n]).collect())
        .collect()
}

/// An inset that folds a side over itself reverses that side's chord.
fn keeps_direction(before: &[Vec<Vec2>], after: &[Vec<Vec2>]) -> bool {
    before.iter().zip(after).all(|(a, b)| {
        let (Some(a0), Some(a1), Some(b0), Some(b1)) = (a.first(), a.last(), b.first(), b.last()) else {
            return false;
        };
        (*a1 - *a0).dot(*b1 - *b0) > 0.0
    })
}

fn build_block(
    nodes: &BTreeMap<NodeId, Node>,
    edges: &BTreeMap<EdgeId, Edge>,
    cycle: &[EdgeId],
    opts: &BlockOptions,
) -> Option<DetectedBlock> {
    let samples = opts.samples.max(1);
    let mut ordered = cycle.to_vec();
    let mut ring = cycle_polygon(nodes, edges, &ordered, samples)?;
    if signed_area(&ring.points) < 0.0 {
        ordered.reverse();
        ring = cycle_polygon(nodes, edges, &ordered, samples)?;
    }
    let mut points = ring.points;
    let mut sides = ring.sides;
    if opts.inset {
        let d = average_half_width(edges, &ordered);
        if d > 0.0 {
            let inset = inset_polygon(&points, d);
            let inset_sides = sides_from_ring(&inset, ordered.len(), samples);
            if signed_area(&inset) <= EPS_FACE_AREA || !keeps_direction(&sides, &inset_sides) {
                warn!(edges = ?ordered, inset = d, "block collapsed under inset; skipped");
                return None;
            }
            points = inset;
            sides = inset_sides;
        }
    }
    let Some(polygon) = normalize_polygon(&points) else {
        warn!(edges = ?ordered, "block polygon degenerate after normalization; skipped");
        return None;
    };
    if !is_simple(&polygon) {
        warn!(edges = ?ordered, "block polygon self-intersects; skipped");
        return None;
    }
    Some(DetectedBlock { key: cycle_key(&ordered), edges: ordered, polygon, sides })
}

/// Every bounded face of the graph as a block, in deterministic trace order.
pub fn detect_blocks(
    nodes: &BTreeMap<NodeId, Node>,
    edges: &BTreeMap<EdgeId, Edge>,
    opts: &BlockOptions,
) -> Vec<DetectedBlock> {
    let faces = trace_faces(nodes, edges);
    let traced = faces.len();
    let mut cands = Vec::new();
    for face in &faces {
        let cycle = strip_spurs(face);
        if cycle.len() < 3 {
            continue;
        }
        let island = cycle.iter().all(|id| edges.get(id).map_or(false, |e| e.style.is_internal()));
        if island {
            continue;
        }
        let Some(raw) = cycle_polygon(nodes, edges, &cycle, opts.samples) else {
            debug!(edges = ?cycle, "face does not form a single cycle; skipped");
            continue;
        };
        let area = signed_area(&raw.points);
        if area.abs() < EPS_FACE_AREA {
            continue;
        }
        cands.push(Candidate { edges: cycle, nodes: raw.nodes, points: raw.points, area });
    }

    let outer = outer_faces(&cands, &node_sample(nodes));
    let mut seen: HashSet<Vec<EdgeId>> = HashSet::new();
    let mut blocks = Vec::new();
    for (i, c) in cands.iter().enumerate() {
        // bounded faces trace clockwise; counter-clockwise ones are exteriors
        if outer.contains(&i) || c.area > 0.0 {
            continue;
        }
        if !seen.insert(cycle_key(&c.edges)) {
            continue;
        }
        if let Some(b) = build_block(nodes, edges, &c.edges, opts) {
            blocks.push(b);
        }
    }
    debug!(faces = traced, candidates = cands.len(), blocks = blocks.len(), "block detection");
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::cubic::CubicBezier;
    use crate::model::{NodeKind, RoadStyle};

    fn graph(points: &[(f64, f64)], links: &[(u32, u32)], width: f64) -> (BTreeMap<NodeId, Node>, BTreeMap<EdgeId, Edge>) {
        let mut nodes = BTreeMap::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            let id = i as u32 + 1;
            nodes.insert(id, Node { id, position: Vec2::new(x, y), kind: NodeKind::Endpoint, roundabout: None });
        }
        let mut edges = BTreeMap::new();
        for (i, &(a, b)) in links.iter().enumerate() {
            let id = 100 + i as u32;
            let curve = CubicBezier::line(nodes[&a].position, nodes[&b].position);
            edges.insert(id, Edge { id, from: a, to: b, curve, width, style: RoadStyle::Asphalt });
        }
        (nodes, edges)
    }

    fn no_inset() -> BlockOptions {
        BlockOptions { samples: 16, inset: false }
    }

    #[test]
    fn cycle_key_ignores_rotation_and_direction() {
        assert_eq!(cycle_key(&[3, 1, 2]), vec![1, 2, 3]);
        assert_eq!(cycle_key(&[2, 1, 3]), vec![1, 2, 3]);
        assert_eq!(cycle_key(&[7, 5, 9, 6]), cycle_key(&[6, 9, 5, 7]));
    }

    #[test]
    fn square_yields_one_ccw_block() {
        let (n, e) = graph(&[(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)], &[(1, 2), (2, 3), (3, 4), (4, 1)], 10.0);
        let blocks = detect_blocks(&n, &e, &no_inset());
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.polygon.len(), 4);
        assert!((signed_area(&b.polygon) - 8000.0).abs() < 1e-6);
        assert_eq!(b.sides.len(), 4);
        assert!(b.sides.iter().all(|s| s.len() == 17));
    }

    #[test]
    fn inset_by_half_width() {
        let (n, e) = graph(&[(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)], &[(1, 2), (2, 3), (3, 4), (4, 1)], 10.0);
        let blocks = detect_blocks(&n, &e, &BlockOptions::default());
        assert_eq!(blocks.len(), 1);
        assert!((signed_area(&blocks[0].polygon) - 90.0 * 70.0).abs() < 1e-6);
    }

    #[test]
    fn two_adjacent_blocks() {
        let (n, e) = graph(
            &[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (100.0, 50.0), (50.0, 50.0), (0.0, 50.0)],
            &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 1), (2, 5)],
            4.0,
        );
        let blocks = detect_blocks(&n, &e, &no_inset());
        assert_eq!(blocks.len(), 2);
        for b in &blocks {
            assert!((signed_area(&b.polygon) - 2500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn spur_inside_block_is_ignored() {
        let (n, e) = graph(
            &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0), (50.0, 50.0)],
            &[(1, 2), (2, 3), (3, 4), (4, 1), (1, 5)],
            4.0,
        );
        let blocks = detect_blocks(&n, &e, &no_inset());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].edges.len(), 4);
    }

    #[test]
    fn over_inset_block_dropped() {
        let (n, e) = graph(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], &[(1, 2), (2, 3), (3, 4), (4, 1)], 30.0);
        assert!(detect_blocks(&n, &e, &BlockOptions::default()).is_empty());
    }
}
