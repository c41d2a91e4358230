use quadra::model::{NodeId, RoadStyle, Vec2};
use quadra::{LotOptions, Snap, SnapQuery, Topology};

fn square(t: &mut Topology) -> [NodeId; 4] {
    let corners = [(0.0, 0.0), (200.0, 0.0), (200.0, 200.0), (0.0, 200.0)];
    let ids = corners.map(|(x, y)| t.add_node(Vec2::new(x, y)).unwrap());
    for i in 0..4 {
        t.add_edge(ids[i], ids[(i + 1) % 4], RoadStyle::Asphalt, 10.0).unwrap();
    }
    ids
}

#[test]
fn nodes_win_over_closer_edges() {
    let mut t = Topology::new();
    let nodes = square(&mut t);
    // the bottom edge passes through the query point, the node is 3 px away
    match t.snap(&SnapQuery::new(Vec2::new(3.0, 0.0), 10.0)) {
        Some(Snap::Node { id, dist, .. }) => {
            assert_eq!(id, nodes[0]);
            assert!((dist - 3.0).abs() < 1e-9);
        }
        other => panic!("expected a node, got {other:?}"),
    }
}

#[test]
fn edges_snap_with_parameter() {
    let mut t = Topology::new();
    square(&mut t);
    match t.snap(&SnapQuery::new(Vec2::new(100.0, 4.0), 10.0)) {
        Some(Snap::Edge { t: param, position, dist, .. }) => {
            assert!((param - 0.5).abs() < 0.05);
            assert!(position.y.abs() < 1e-6);
            assert!((dist - 4.0).abs() < 1e-6);
        }
        other => panic!("expected an edge, got {other:?}"),
    }
    assert!(t.snap(&SnapQuery::new(Vec2::new(100.0, 100.0), 10.0)).is_none());
}

#[test]
fn lot_vertices_only_when_asked() {
    let mut t = Topology::new();
    square(&mut t);
    let block = t.blocks().next().unwrap().id;
    t.generate_lots(block, &LotOptions::grid(1, 4, 1.0)).unwrap();

    let near_corner = Vec2::new(5.5, 5.5);
    assert!(t.snap(&SnapQuery::new(near_corner, 2.0)).is_none());

    let mut q = SnapQuery::new(near_corner, 2.0);
    q.include_lots = true;
    let Some(Snap::LotVertex { lot, index, position, .. }) = t.snap(&q) else {
        panic!("expected a lot vertex");
    };
    assert!(position.distance(Vec2::new(5.0, 5.0)) < 1e-3);
    assert_eq!(t.lot(lot).unwrap().polygon[index], position);

    // only the corner lot owns that vertex
    q.exclude_lot = Some(lot);
    assert!(t.snap(&q).is_none());
}

#[test]
fn invalid_queries_find_nothing() {
    let mut t = Topology::new();
    square(&mut t);
    assert!(t.snap(&SnapQuery::new(Vec2::new(f64::NAN, 0.0), 10.0)).is_none());
    assert!(t.snap(&SnapQuery::new(Vec2::new(0.0, 0.0), -1.0)).is_none());
}

#[test]
fn block_boundary_snap() {
    let mut t = Topology::new();
    square(&mut t);
    let block = t.blocks().next().unwrap().id;
    match t.snap_block_boundary(Vec2::new(100.0, 8.0), 5.0) {
        Some(Snap::BlockBoundary { block: b, position, dist }) => {
            assert_eq!(b, block);
            assert!(position.distance(Vec2::new(100.0, 5.0)) < 1e-6);
            assert!((dist - 3.0).abs() < 1e-6);
        }
        other => panic!("expected a block boundary, got {other:?}"),
    }
    assert!(t.snap_block_boundary(Vec2::new(100.0, 100.0), 5.0).is_none());
}

#[test]
fn resolve_point_reuses_nodes_and_splits_edges() {
    let mut t = Topology::new();
    let nodes = square(&mut t);
    let block = t.blocks().next().unwrap().id;

    assert_eq!(t.resolve_point(Vec2::new(198.0, 2.0)).unwrap(), nodes[1]);
    assert_eq!(t.node_count(), 4);

    let mid = t.resolve_point(Vec2::new(100.0, 3.0)).unwrap();
    assert_eq!(t.node_count(), 5);
    assert_eq!(t.edge_count(), 5);
    let p = t.node(mid).unwrap().position;
    assert!(p.y.abs() < 1e-6 && (p.x - 100.0).abs() < 5.0);
    assert_eq!(t.blocks().map(|b| b.id).collect::<Vec<_>>(), vec![block]);

    let free = t.resolve_point(Vec2::new(500.0, 500.0)).unwrap();
    assert_eq!(t.node(free).unwrap().position, Vec2::new(500.0, 500.0));
}

#[test]
fn connect_draws_one_undo_step() {
    let mut t = Topology::new();
    square(&mut t);
    let edges = t.edge_count();
    t.connect(Vec2::new(1.0, 1.0), Vec2::new(199.0, 199.0), RoadStyle::Dirt, 8.0).unwrap();
    assert_eq!(t.edge_count(), edges + 1);
    assert_eq!(t.node_count(), 4);
    assert_eq!(t.blocks().count(), 2);

    assert!(t.undo());
    assert_eq!(t.edge_count(), edges);
    assert_eq!(t.blocks().count(), 1);
}
