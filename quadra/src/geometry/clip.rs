//! Sutherland–Hodgman clipping against half-planes.
//!
//! A single half-plane clip is exact for any simple polygon, convex or not;
//! strips, cells and arbitrary convex windows are built by composing them.

use super::tolerance::EPS_CLIP;
use crate::model::Vec2;

/// The closed half-plane `{p : (p - point) · normal <= 0}`; `normal` points
/// outward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfPlane {
    pub point: Vec2,
    pub normal: Vec2,
}

impl HalfPlane {
    pub fn new(point: Vec2, normal: Vec2) -> Self {
        Self { point, normal }
    }

    /// Keep `{p : p · axis >= value}`.
    pub fn at_least(axis: Vec2, value: f64) -> Self {
        Self::new(axis * value, -axis)
    }

    /// Keep `{p : p · axis <= value}`.
    pub fn at_most(axis: Vec2, value: f64) -> Self {
        Self::new(axis * value, axis)
    }

    #[inline]
    pub fn signed_distance(&self, p: Vec2) -> f64 {
        (p - self.point).dot(self.normal)
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.signed_distance(p) <= EPS_CLIP
    }
}

/// Clip `poly` to one half-plane. The result may have fewer than 3 vertices
/// when the polygon lies outside.
pub fn clip_half_plane(poly: &[Vec2], plane: &HalfPlane) -> Vec<Vec2> {
    let n = poly.len();
    let mut out = Vec::with_capacity(n + 2);
    if n == 0 {
        return out;
    }
    for i in 0..n {
        let s = poly[i];
        let e = poly[(i + 1) % n];
        let ds = plane.signed_distance(s);
        let de = plane.signed_distance(e);
        let s_in = ds <= EPS_CLIP;
        let e_in = de <= EPS_CLIP;
        if s_in {
            out.push(s);
        }
        if s_in != e_in {
            let t = ds / (ds - de);
            out.push(s.lerp(e, t));
        }
    }
    out
}

/// Clip against every plane in order; stops early once the polygon vanishes.
pub fn clip_polygon(poly: &[Vec2], planes: &[HalfPlane]) -> Vec<Vec2> {
    let mut cur = poly.to_vec();
    for plane in planes {
        cur = clip_half_plane(&cur, plane);
        if cur.len() < 3 {
            return Vec::new();
        }
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon::signed_area;

    fn square(s: f64) -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(s, 0.0), Vec2::new(s, s), Vec2::new(0.0, s)]
    }

    #[test]
    fn keeps_right_half() {
        let out = clip_half_plane(&square(10.0), &HalfPlane::at_least(Vec2::new(1.0, 0.0), 5.0));
        assert!((signed_area(&out) - 50.0).abs() < 1e-9);
        assert!(out.iter().all(|p| p.x >= 4.99));
    }

    #[test]
    fn concave_clip_stays_exact() {
        // U shape; cut through both arms
        let u = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(30.0, 0.0),
            Vec2::new(30.0, 30.0),
            Vec2::new(20.0, 30.0),
            Vec2::new(20.0, 10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(10.0, 30.0),
            Vec2::new(0.0, 30.0),
        ];
        let out = clip_half_plane(&u, &HalfPlane::at_least(Vec2::new(0.0, 1.0), 20.0));
        // two 10x10 arm tops joined along y=20 by a zero-area bridge
        assert!((signed_area(&out) - 200.0).abs() < 1e-9);
    }
}
