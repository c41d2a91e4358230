use quadra::geometry::clip::{clip_half_plane, clip_polygon, HalfPlane};
use quadra::geometry::polygon::{is_simple, normalize_polygon, point_in_polygon, signed_area};
use quadra::model::Vec2;

fn square(x0: f64, y0: f64, s: f64) -> Vec<Vec2> {
    vec![Vec2::new(x0, y0), Vec2::new(x0 + s, y0), Vec2::new(x0 + s, y0 + s), Vec2::new(x0, y0 + s)]
}

const X: Vec2 = Vec2::new(1.0, 0.0);

#[test]
fn half_plane_keeps_right_half() {
    let out = clip_half_plane(&square(0.0, 0.0, 10.0), &HalfPlane::at_least(X, 5.0));
    assert!((signed_area(&out).abs() - 50.0).abs() < 1e-9);
    assert!(out.iter().all(|p| p.x >= 4.99));
}

#[test]
fn half_plane_outside_is_empty() {
    let out = clip_half_plane(&square(0.0, 0.0, 5.0), &HalfPlane::at_least(X, 10.0));
    assert!(out.len() < 3);
}

#[test]
fn half_plane_containing_polygon_is_identity() {
    let sq = square(0.0, 0.0, 10.0);
    let out = clip_half_plane(&sq, &HalfPlane::at_most(X, 50.0));
    assert_eq!(out.len(), 4);
    assert!((signed_area(&out) - 100.0).abs() < 1e-9);
}

#[test]
fn four_planes_cut_a_cell() {
    let sq = square(0.0, 0.0, 10.0);
    let y = Vec2::new(0.0, 1.0);
    let planes = [
        HalfPlane::at_least(X, 2.0),
        HalfPlane::at_most(X, 6.0),
        HalfPlane::at_least(y, 1.0),
        HalfPlane::at_most(y, 4.0),
    ];
    let cell = clip_polygon(&sq, &planes);
    assert!((signed_area(&cell) - 12.0).abs() < 1e-9);
    assert!(cell.iter().all(|p| point_in_polygon(*p, &sq, 1e-9)));
}

#[test]
fn clip_of_missing_cell_is_empty() {
    let planes = [HalfPlane::at_least(X, 20.0), HalfPlane::at_most(X, 30.0)];
    assert!(clip_polygon(&square(0.0, 0.0, 10.0), &planes).is_empty());
}

#[test]
fn near_duplicate_vertex_collapses() {
    let poly = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(10.0, 0.0),
        Vec2::new(10.005, 0.002),
        Vec2::new(10.0, 10.0),
        Vec2::new(0.0, 10.0),
    ];
    let n = normalize_polygon(&poly).unwrap();
    assert_eq!(n.len(), 4);
}

#[test]
fn clockwise_square_becomes_ccw() {
    let mut cw = square(0.0, 0.0, 10.0);
    cw.reverse();
    assert!(signed_area(&cw) < 0.0);
    let n = normalize_polygon(&cw).unwrap();
    assert!(signed_area(&n) > 0.0);
    assert!(is_simple(&n));
}

#[test]
fn two_points_are_not_a_polygon() {
    assert!(normalize_polygon(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)]).is_none());
}

#[test]
fn non_finite_points_rejected() {
    let mut sq = square(0.0, 0.0, 10.0);
    sq[2].x = f64::NAN;
    assert!(normalize_polygon(&sq).is_none());
}
