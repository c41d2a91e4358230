use std::ops::{Add, Mul, Neg, Sub};

use super::tolerance::EPS_LEN;
use crate::model::Vec2;

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
    #[inline]
    pub fn dot(self, o: Vec2) -> f64 {
        self.x * o.x + self.y * o.y
    }
    /// z-component of the 3D cross product; positive when `o` is CCW of `self`.
    #[inline]
    pub fn cross(self, o: Vec2) -> f64 {
        self.x * o.y - self.y * o.x
    }
    #[inline]
    pub fn length_sq(self) -> f64 {
        self.dot(self)
    }
    #[inline]
    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }
    #[inline]
    pub fn distance(self, o: Vec2) -> f64 {
        (self - o).length()
    }
    #[inline]
    pub fn distance_sq(self, o: Vec2) -> f64 {
        (self - o).length_sq()
    }
    /// Unit vector, or zero for vectors shorter than `EPS_LEN`.
    #[inline]
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len > EPS_LEN {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }
    /// Left perpendicular (CCW quarter turn).
    #[inline]
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }
    pub fn rotate(self, radians: f64) -> Vec2 {
        let (s, c) = radians.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
    #[inline]
    pub fn lerp(self, o: Vec2, t: f64) -> Vec2 {
        Vec2::new(self.x + t * (o.x - self.x), self.y + t * (o.y - self.y))
    }
    #[inline]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Squared distance from `p` to segment `ab` and the clamped parameter of the
/// closest point.
pub fn seg_distance_sq(p: Vec2, a: Vec2, b: Vec2) -> (f64, f64) {
    let v = b - a;
    let w = p - a;
    let vv = v.length_sq();
    let mut t = if vv > 0.0 { w.dot(v) / vv } else { 0.0 };
    if t < 0.0 {
        t = 0.0;
    } else if t > 1.0 {
        t = 1.0;
    }
    let proj = a + v * t;
    (p.distance_sq(proj), t)
}

/// Arc length of an open polyline.
pub fn polyline_length(points: &[Vec2]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point at `distance` along an open polyline, clamped to its ends.
pub fn point_along(points: &[Vec2], distance: f64) -> Option<Vec2> {
    let first = *points.first()?;
    if distance <= 0.0 {
        return Some(first);
    }
    let mut acc = 0.0;
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        if acc + len >= distance && len > 0.0 {
            return Some(w[0].lerp(w[1], (distance - acc) / len));
        }
        acc += len;
    }
    points.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perp_is_ccw() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(v.perp(), Vec2::new(0.0, 1.0));
        assert!(v.cross(v.perp()) > 0.0);
    }

    #[test]
    fn rotate_quarter_turn_matches_perp() {
        let v = Vec2::new(3.0, 4.0);
        let r = v.rotate(std::f64::consts::FRAC_PI_2);
        assert!((r.x - v.perp().x).abs() < 1e-12);
        assert!((r.y - v.perp().y).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
        assert!((Vec2::new(0.0, 5.0).normalize().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn seg_distance_clamps() {
        let (d2, t) = seg_distance_sq(Vec2::new(-5.0, 0.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(t, 0.0);
        assert!((d2 - 25.0).abs() < 1e-12);
        let (d2, t) = seg_distance_sq(Vec2::new(5.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((t - 0.5).abs() < 1e-12);
        assert!((d2 - 9.0).abs() < 1e-12);
    }

    #[test]
    fn point_along_midpoint() {
        let pts = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert_eq!(polyline_length(&pts), 20.0);
        let m = point_along(&pts, 10.0).unwrap();
        assert!((m.x - 10.0).abs() < 1e-12 && m.y.abs() < 1e-12);
        let q = point_along(&pts, 15.0).unwrap();
        assert!((q.y - 5.0).abs() < 1e-12);
    }
}
