use proptest::prelude::*;
use quadra::algorithms::lots::{generate_lots, LotOptions};
use quadra::geometry::polygon::{is_simple, point_in_polygon, signed_area};
use quadra::model::{RoadStyle, Vec2};
use quadra::Topology;

const CASES: u32 = if cfg!(feature = "long-determinism") { 5_000 } else { 200 };

#[derive(Clone, Debug)]
enum Op {
    AddNode { x: i8, y: i8 },
    MoveNode { idx: u16, dx: i8, dy: i8 },
    RemoveNode { idx: u16 },
    AddEdge { a: u16, b: u16, width: u8 },
    RemoveEdge { idx: u16 },
    SplitEdge { idx: u16, t_num: u8 },
    Generate { idx: u16, rows: u8, cols: u8 },
    DeleteLot { idx: u16 },
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<i8>(), any::<i8>()).prop_map(|(x, y)| Op::AddNode { x, y }),
        2 => (any::<u16>(), any::<i8>(), any::<i8>()).prop_map(|(idx, dx, dy)| Op::MoveNode { idx, dx, dy }),
        1 => any::<u16>().prop_map(|idx| Op::RemoveNode { idx }),
        4 => (any::<u16>(), any::<u16>(), 2u8..30).prop_map(|(a, b, width)| Op::AddEdge { a, b, width }),
        1 => any::<u16>().prop_map(|idx| Op::RemoveEdge { idx }),
        1 => (any::<u16>(), any::<u8>()).prop_map(|(idx, t_num)| Op::SplitEdge { idx, t_num }),
        2 => (any::<u16>(), 1u8..4, 1u8..6).prop_map(|(idx, rows, cols)| Op::Generate { idx, rows, cols }),
        1 => any::<u16>().prop_map(|idx| Op::DeleteLot { idx }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick<T: Copy>(items: &[T], idx: u16) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[idx as usize % items.len()])
    }
}

fn apply_op(t: &mut Topology, op: Op) {
    let nodes: Vec<u32> = t.nodes().map(|n| n.id).collect();
    let edges: Vec<u32> = t.edges().map(|e| e.id).collect();
    let blocks: Vec<u32> = t.blocks().map(|b| b.id).collect();
    let lots: Vec<u32> = t.lots().map(|l| l.id).collect();
    match op {
        Op::AddNode { x, y } => {
            let _ = t.add_node(Vec2::new(x as f64 * 4.0, y as f64 * 4.0));
        }
        Op::MoveNode { idx, dx, dy } => {
            if let Some(id) = pick(&nodes, idx) {
                let p = t.node(id).map(|n| n.position).unwrap_or_default();
                let _ = t.move_node(id, p + Vec2::new(dx as f64 * 0.5, dy as f64 * 0.5));
            }
        }
        Op::RemoveNode { idx } => {
            if let Some(id) = pick(&nodes, idx) {
                let _ = t.remove_node(id);
            }
        }
        Op::AddEdge { a, b, width } => {
            if let (Some(a), Some(b)) = (pick(&nodes, a), pick(&nodes, b)) {
                let _ = t.add_edge(a, b, RoadStyle::Asphalt, width as f64);
            }
        }
        Op::RemoveEdge { idx } => {
            if let Some(id) = pick(&edges, idx) {
                let _ = t.remove_edge(id);
            }
        }
        Op::SplitEdge { idx, t_num } => {
            if let Some(id) = pick(&edges, idx) {
                let _ = t.split_edge(id, t_num as f64 / 255.0);
            }
        }
        Op::Generate { idx, rows, cols } => {
            if let Some(id) = pick(&blocks, idx) {
                let _ = t.generate_lots(id, &LotOptions::grid(rows as u32, cols as u32, 1.0));
            }
        }
        Op::DeleteLot { idx } => {
            if let Some(id) = pick(&lots, idx) {
                let _ = t.delete_lot(id);
            }
        }
        Op::Undo => {
            t.undo();
        }
        Op::Redo => {
            t.redo();
        }
    }
}

fn assert_invariants(t: &Topology) {
    for e in t.edges() {
        let a = t.node(e.from).expect("edge start exists");
        let b = t.node(e.to).expect("edge end exists");
        assert_ne!(e.from, e.to);
        assert_eq!(e.curve.p0, a.position);
        assert_eq!(e.curve.p3, b.position);
    }
    for b in t.blocks() {
        assert!(b.polygon.len() >= 3);
        assert!(signed_area(&b.polygon) > 0.0, "block {} not CCW", b.id);
        assert!(is_simple(&b.polygon), "block {} not simple", b.id);
        assert_eq!(b.sides.len(), b.edges.len());
        for id in &b.lots {
            assert_eq!(t.lot(*id).expect("listed lot exists").block, b.id);
        }
        let generated = !b.manually_edited && b.grid.as_ref().map_or(false, |g| g.auto_regenerate());
        if generated {
            for lot in t.lots_of(b.id) {
                for v in &lot.polygon {
                    assert!(point_in_polygon(*v, &b.polygon, 1.0), "lot {} escapes block {}", lot.id, b.id);
                }
            }
        }
    }
    for l in t.lots() {
        let b = t.block(l.block).expect("lot block exists");
        assert!(b.lots.contains(&l.id));
        assert!(l.area > 0.0);
    }
    let max_id = t
        .nodes()
        .map(|n| n.id)
        .chain(t.edges().map(|e| e.id))
        .chain(t.blocks().map(|b| b.id))
        .chain(t.lots().map(|l| l.id))
        .max()
        .unwrap_or(0);
    assert!(max_id <= t.state().next_id);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: CASES, .. ProptestConfig::default() })]

    #[test]
    fn random_edits_keep_invariants(ops in prop::collection::vec(op_strategy(), 5..40)) {
        let mut t = Topology::new();
        for op in ops {
            apply_op(&mut t, op);
        }
        assert_invariants(&t);
    }

    #[test]
    fn rectangles_contain_their_lots(
        w in 20.0f64..500.0,
        h in 20.0f64..500.0,
        rows in 1u32..5,
        cols in 1u32..9,
    ) {
        let poly = vec![Vec2::new(0.0, 0.0), Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)];
        let sides: Vec<Vec<Vec2>> = (0..4).map(|i| vec![poly[i], poly[(i + 1) % 4]]).collect();
        let opts = LotOptions::grid(rows, cols, 1.0);
        let g = generate_lots(&poly, &sides, &opts, 0.5).unwrap();
        prop_assert!(!g.lots.is_empty());
        let mut total = 0.0;
        for lot in &g.lots {
            total += lot.area;
            for v in &lot.polygon {
                prop_assert!(point_in_polygon(*v, &poly, 1.0));
            }
        }
        prop_assert!(total <= w * h + 1.0);
        let again = generate_lots(&poly, &sides, &opts, 0.5).unwrap();
        prop_assert_eq!(again, g);
    }
}
