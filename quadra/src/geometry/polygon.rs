//! Polygon normalization and predicates.
//!
//! Polygons are open vertex rings (the closing edge is implicit). The
//! canonical orientation is counter-clockwise, i.e. positive shoelace area.
//! `normalize_polygon` is the gate every block or lot polygon passes before
//! it is stored.

use super::intersect::{intersect_segments, SegIntersection};
use super::math::seg_distance_sq;
use super::tolerance::{round_to, EPS_COLLINEAR, EPS_DEDUP, EPS_DENOM, EPS_FACE_AREA, MITER_LIMIT};
use crate::model::Vec2;

/// Shoelace area; positive for CCW rings.
pub fn signed_area(poly: &[Vec2]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut a = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        a += poly[i].cross(poly[j]);
    }
    0.5 * a
}

/// Area-weighted centroid; vertex average for degenerate rings.
pub fn centroid(poly: &[Vec2]) -> Vec2 {
    if poly.is_empty() {
        return Vec2::ZERO;
    }
    let mut c = Vec2::ZERO;
    let mut a = 0.0;
    for i in 0..poly.len() {
        let j = (i + 1) % poly.len();
        let cross = poly[i].cross(poly[j]);
        a += cross;
        c = c + (poly[i] + poly[j]) * cross;
    }
    let a = a * 0.5;
    if a.abs() < EPS_FACE_AREA {
        let sum = poly.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        return sum * (1.0 / poly.len() as f64);
    }
    c * (1.0 / (6.0 * a))
}

/// Drop consecutive vertices closer than `eps`, including the wrap-around
/// pair.
pub fn dedup_vertices(poly: &[Vec2], eps: f64) -> Vec<Vec2> {
    let eps2 = eps * eps;
    let mut out: Vec<Vec2> = Vec::with_capacity(poly.len());
    for &p in poly {
        if out.last().map_or(true, |q| q.distance_sq(p) >= eps2) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance_sq(out[out.len() - 1]) < eps2 {
        out.pop();
    }
    out
}

/// Drop vertices whose incoming and outgoing edges are collinear, including
/// zero-width spikes. Repeats until stable.
pub fn remove_collinear(poly: &[Vec2]) -> Vec<Vec2> {
    let mut out = poly.to_vec();
    loop {
        let n = out.len();
        if n < 3 {
            return out;
        }
        let mut removed = false;
        let mut i = 0;
        while i < out.len() && out.len() >= 3 {
            let n = out.len();
            let prev = out[(i + n - 1) % n];
            let cur = out[i];
            let next = out[(i + 1) % n];
            let a = cur - prev;
            let b = next - cur;
            let scale = a.length() * b.length();
            if scale <= EPS_DENOM || a.cross(b).abs() <= EPS_COLLINEAR * scale {
                out.remove(i);
                removed = true;
            } else {
                i += 1;
            }
        }
        if !removed {
            return out;
        }
    }
}

/// Reverse the ring if it is clockwise.
pub fn ensure_ccw(poly: &mut Vec<Vec2>) {
    if signed_area(poly) < 0.0 {
        poly.reverse();
    }
}

/// Brute-force O(n²) self-intersection test; adjacent edges are allowed to
/// share their common vertex.
pub fn is_simple(poly: &[Vec2]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        for j in (i + 1)..n {
            // skip the edge itself and its two neighbours
            if j == i || j == (i + 1) % n || (j + 1) % n == i {
                continue;
            }
            let c = poly[j];
            let d = poly[(j + 1) % n];
            if !intersect_segments(a, b, c, d, 1e-9, 1e-12).is_none() {
                return false;
            }
        }
    }
    true
}

/// Even-odd ray cast, with points within `tol` of any edge counted inside.
pub fn point_in_polygon(p: Vec2, poly: &[Vec2], tol: f64) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = poly[i];
        let b = poly[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    if inside {
        return true;
    }
    distance_to_boundary_sq(p, poly) <= tol * tol
}

pub fn distance_to_boundary_sq(p: Vec2, poly: &[Vec2]) -> f64 {
    let n = poly.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let (d2, _) = seg_distance_sq(p, poly[i], poly[(i + 1) % n]);
        best = best.min(d2);
    }
    best
}

/// dedup → CCW → decollinearize; `None` when fewer than 3 vertices survive.
pub fn normalize_polygon(poly: &[Vec2]) -> Option<Vec<Vec2>> {
    if poly.iter().any(|p| !p.is_finite()) {
        return None;
    }
    let mut out = dedup_vertices(poly, EPS_DEDUP);
    if out.len() < 3 {
        return None;
    }
    ensure_ccw(&mut out);
    let out = remove_collinear(&out);
    if out.len() < 3 || signed_area(&out).abs() < EPS_FACE_AREA {
        return None;
    }
    Some(out)
}

pub fn round_polygon(poly: &mut [Vec2], decimals: i32) {
    for p in poly.iter_mut() {
        p.x = round_to(p.x, decimals);
        p.y = round_to(p.y, decimals);
    }
}

pub fn translate_polygon(poly: &[Vec2], d: Vec2) -> Vec<Vec2> {
    poly.iter().map(|p| *p + d).collect()
}

/// Miter inset of a CCW ring by `distance`. Each vertex moves along the
/// bisector of its two edges' inward normals; the displacement is capped at
/// `MITER_LIMIT · distance`. Output has exactly one vertex per input vertex.
pub fn inset_polygon(poly: &[Vec2], distance: f64) -> Vec<Vec2> {
    let n = poly.len();
    if n < 3 || distance == 0.0 {
        return poly.to_vec();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = poly[(i + n - 1) % n];
        let cur = poly[i];
        let next = poly[(i + 1) % n];
        // interior of a CCW ring lies to the left of each edge
        let n1 = (cur - prev).normalize().perp();
        let n2 = (next - cur).normalize().perp();
        let (n1, n2) = match (n1 == Vec2::ZERO, n2 == Vec2::ZERO) {
            (true, true) => {
                out.push(cur);
                continue;
            }
            (true, false) => (n2, n2),
            (false, true) => (n1, n1),
            (false, false) => (n1, n2),
        };
        let bis = (n1 + n2).normalize();
        let offset = if bis == Vec2::ZERO {
            // hairpin: edges fold back on each other
            n1 * distance
        } else {
            let cos_half = bis.dot(n1).max(1.0 / MITER_LIMIT);
            bis * (distance / cos_half)
        };
        out.push(cur + offset);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(s: f64) -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(s, 0.0), Vec2::new(s, s), Vec2::new(0.0, s)]
    }

    #[test]
    fn area_and_centroid() {
        let sq = square(10.0);
        assert!((signed_area(&sq) - 100.0).abs() < 1e-12);
        let c = centroid(&sq);
        assert!(c.distance(Vec2::new(5.0, 5.0)) < 1e-12);
    }

    #[test]
    fn collinear_midpoints_removed() {
        let poly = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(remove_collinear(&poly).len(), 4);
    }

    #[test]
    fn spike_removed() {
        let poly = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(5.0, 15.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let n = normalize_polygon(&poly).unwrap();
        assert_eq!(n.len(), 4);
    }

    #[test]
    fn bowtie_is_not_simple() {
        let bow = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)];
        assert!(!is_simple(&bow));
        assert!(is_simple(&square(3.0)));
    }

    #[test]
    fn boundary_tolerance() {
        let sq = square(10.0);
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &sq, 0.0));
        assert!(!point_in_polygon(Vec2::new(10.5, 5.0), &sq, 0.0));
        assert!(point_in_polygon(Vec2::new(10.5, 5.0), &sq, 1.0));
    }

    #[test]
    fn inset_square_shrinks() {
        let inner = inset_polygon(&square(10.0), 1.0);
        assert_eq!(inner.len(), 4);
        assert!(inner[0].distance(Vec2::new(1.0, 1.0)) < 1e-12);
        assert!(inner[2].distance(Vec2::new(9.0, 9.0)) < 1e-12);
        assert!((signed_area(&inner) - 64.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_normalizes_negative_zero() {
        let mut p = vec![Vec2::new(-0.00001, 1.234567)];
        round_polygon(&mut p, 4);
        assert_eq!(p[0].x.to_bits(), 0.0f64.to_bits());
        assert_eq!(p[0].y, 1.2346);
    }
}
