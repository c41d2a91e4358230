//! Cubic Bézier curve utilities.
//!
//! Every road edge is a cubic; straight roads are cubics whose control points
//! sit at thirds of the chord. These helpers evaluate, split, measure and
//! sample curves, and build road-surface outlines by offsetting the
//! centerline.

use serde::{Deserialize, Serialize};

use super::math::seg_distance_sq;
use super::tolerance::{clamp01, EPS_LEN};
use crate::model::Vec2;

/// Control points of a cubic Bézier curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub p0: Vec2, // Start point
    pub p1: Vec2, // First control point
    pub p2: Vec2, // Second control point
    pub p3: Vec2, // End point
}

impl CubicBezier {
    pub fn new(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Straight segment from `a` to `b` with controls at the chord thirds.
    pub fn line(a: Vec2, b: Vec2) -> Self {
        Self::new(a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b)
    }

    /// Evaluate the curve at parameter t ∈ [0, 1].
    pub fn eval(&self, t: f64) -> Vec2 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        Vec2 {
            x: mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x,
            y: mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y,
        }
    }

    /// Evaluate the tangent (derivative) at parameter t.
    pub fn tangent(&self, t: f64) -> Vec2 {
        let t2 = t * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;

        Vec2 {
            x: 3.0 * mt2 * (self.p1.x - self.p0.x)
                + 6.0 * mt * t * (self.p2.x - self.p1.x)
                + 3.0 * t2 * (self.p3.x - self.p2.x),
            y: 3.0 * mt2 * (self.p1.y - self.p0.y)
                + 6.0 * mt * t * (self.p2.y - self.p1.y)
                + 3.0 * t2 * (self.p3.y - self.p2.y),
        }
    }

    /// Split the curve at parameter t using de Casteljau subdivision.
    ///
    /// Returns two cubic curves: the first from 0..t, the second from t..1.
    pub fn split_at(&self, t: f64) -> (CubicBezier, CubicBezier) {
        let p01 = self.p0.lerp(self.p1, t);
        let p12 = self.p1.lerp(self.p2, t);
        let p23 = self.p2.lerp(self.p3, t);

        let p012 = p01.lerp(p12, t);
        let p123 = p12.lerp(p23, t);

        let p0123 = p012.lerp(p123, t); // The split point

        (
            CubicBezier::new(self.p0, p01, p012, p0123),
            CubicBezier::new(p0123, p123, p23, self.p3),
        )
    }

    /// Same curve traversed from `p3` to `p0`.
    pub fn reversed(&self) -> CubicBezier {
        CubicBezier::new(self.p3, self.p2, self.p1, self.p0)
    }

    /// Arc length approximated by a chord sum over `samples` uniform steps.
    pub fn arc_length(&self, samples: usize) -> f64 {
        let n = samples.max(1);
        let mut len = 0.0;
        let mut prev = self.p0;
        for i in 1..=n {
            let p = self.eval(i as f64 / n as f64);
            len += prev.distance(p);
            prev = p;
        }
        len
    }

    /// Uniform-parameter polyline with `samples` segments, both endpoints
    /// included exactly.
    pub fn flatten(&self, samples: usize) -> Vec<Vec2> {
        let n = samples.max(1);
        let mut pts = Vec::with_capacity(n + 1);
        pts.push(self.p0);
        for i in 1..n {
            pts.push(self.eval(i as f64 / n as f64));
        }
        pts.push(self.p3);
        pts
    }

    /// Unit normal (left of travel direction) at t. Falls back to the chord
    /// normal where the derivative vanishes.
    pub fn normal(&self, t: f64) -> Vec2 {
        let d = self.tangent(t);
        if d.length() > EPS_LEN {
            return d.normalize().perp();
        }
        (self.p3 - self.p0).normalize().perp()
    }

    /// Samples offset perpendicular to the curve by `distance` (positive to
    /// the left of travel).
    pub fn offset(&self, distance: f64, samples: usize) -> Vec<Vec2> {
        let n = samples.max(1);
        (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                self.eval(t) + self.normal(t) * distance
            })
            .collect()
    }

    /// Closed outline of a road of `width` centered on this curve.
    pub fn stroke_outline(&self, width: f64, samples: usize) -> Vec<Vec2> {
        let half = 0.5 * width;
        let mut out = self.offset(half, samples);
        let mut right = self.offset(-half, samples);
        right.reverse();
        out.extend(right);
        out
    }

    /// Direction in which the curve leaves `p0`: first non-degenerate control
    /// leg, else the chord.
    pub fn departure(&self) -> Vec2 {
        for c in [self.p1, self.p2, self.p3] {
            let d = c - self.p0;
            if d.length() > EPS_LEN {
                return d;
            }
        }
        Vec2::ZERO
    }

    /// Closest point on the curve to `p` by sampling the uniform polyline.
    /// Returns (t, point, squared distance).
    pub fn closest_point(&self, p: Vec2, samples: usize) -> (f64, Vec2, f64) {
        let n = samples.max(1);
        let pts = self.flatten(n);
        let mut best = (0.0, self.p0, f64::INFINITY);
        for (i, w) in pts.windows(2).enumerate() {
            let (d2, local) = seg_distance_sq(p, w[0], w[1]);
            if d2 < best.2 {
                let t = clamp01((i as f64 + local) / n as f64);
                best = (t, w[0].lerp(w[1], local), d2);
            }
        }
        best
    }

    /// Move the start point, carrying the first control point along.
    pub fn with_start(&self, p: Vec2) -> CubicBezier {
        let d = p - self.p0;
        CubicBezier::new(p, self.p1 + d, self.p2, self.p3)
    }

    /// Move the end point, carrying the second control point along.
    pub fn with_end(&self, p: Vec2) -> CubicBezier {
        let d = p - self.p3;
        CubicBezier::new(self.p0, self.p1, self.p2 + d, p)
    }

    /// Circular arc approximation from `start_angle` sweeping `sweep` radians
    /// (≤ π/2 keeps the error below 0.03% of the radius).
    pub fn arc(center: Vec2, radius: f64, start_angle: f64, sweep: f64) -> CubicBezier {
        let k = 4.0 / 3.0 * (sweep / 4.0).tan() * radius;
        let a0 = start_angle;
        let a1 = start_angle + sweep;
        let p0 = center + Vec2::new(a0.cos(), a0.sin()) * radius;
        let p3 = center + Vec2::new(a1.cos(), a1.sin()) * radius;
        let t0 = Vec2::new(-a0.sin(), a0.cos());
        let t1 = Vec2::new(-a1.sin(), a1.cos());
        CubicBezier::new(p0, p0 + t0 * k, p3 - t1 * k, p3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> CubicBezier {
        CubicBezier::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 50.0),
            Vec2::new(100.0, 50.0),
            Vec2::new(100.0, 0.0),
        )
    }

    #[test]
    fn eval_hits_endpoints() {
        let c = curve();
        assert_eq!(c.eval(0.0), c.p0);
        assert_eq!(c.eval(1.0), c.p3);
    }

    #[test]
    fn split_halves_meet() {
        let c = curve();
        let (a, b) = c.split_at(0.3);
        assert_eq!(a.p3, b.p0);
        let m = c.eval(0.3);
        assert!(a.p3.distance(m) < 1e-9);
        // second half at local 0.5 equals original at 0.65
        assert!(b.eval(0.5).distance(c.eval(0.65)) < 1e-9);
    }

    #[test]
    fn line_length_is_chord() {
        let l = CubicBezier::line(Vec2::new(0.0, 0.0), Vec2::new(30.0, 40.0));
        assert!((l.arc_length(16) - 50.0).abs() < 1e-9);
        let pts = l.flatten(16);
        assert_eq!(pts.len(), 17);
        assert_eq!(pts[0], l.p0);
        assert_eq!(pts[16], l.p3);
    }

    #[test]
    fn offset_line_is_parallel() {
        let l = CubicBezier::line(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        for p in l.offset(5.0, 8) {
            assert!((p.y - 5.0).abs() < 1e-9);
        }
        let outline = l.stroke_outline(10.0, 4);
        assert_eq!(outline.len(), 10);
    }

    #[test]
    fn quarter_arc_stays_on_circle() {
        let c = CubicBezier::arc(Vec2::ZERO, 10.0, 0.0, std::f64::consts::FRAC_PI_2);
        for i in 0..=8 {
            let r = c.eval(i as f64 / 8.0).length();
            assert!((r - 10.0).abs() < 0.01, "radius drift {}", r);
        }
    }

    #[test]
    fn closest_point_on_line() {
        let l = CubicBezier::line(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        let (t, p, d2) = l.closest_point(Vec2::new(25.0, 4.0), 32);
        assert!((t - 0.25).abs() < 1e-9);
        assert!((p.x - 25.0).abs() < 1e-9);
        assert!((d2 - 16.0).abs() < 1e-9);
    }
}
