// Robust segment-segment intersection with tolerances.
// Classifies proper crossings, endpoint touches, and collinear overlaps.

use crate::model::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegIntersection {
    None,
    // Proper interior intersection (not at endpoints within tolerance)
    Proper { t: f64, u: f64, point: Vec2 },
    // Touch at endpoints (may be both endpoints). t/u may be 0 or 1 within tolerance
    Touch { t: f64, u: f64, point: Vec2 },
    // Collinear overlapping span: parameter ranges on each segment (inclusive, ordered)
    CollinearOverlap { t0: f64, t1: f64, u0: f64, u1: f64 },
}

impl SegIntersection {
    pub fn is_none(&self) -> bool {
        matches!(self, SegIntersection::None)
    }
}

#[inline]
fn orient(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b - a).cross(c - a)
}

#[inline]
fn within_eps(x: f64, eps: f64) -> bool { x.abs() <= eps }

#[inline]
fn clamp01(x: f64) -> f64 { if x < 0.0 { 0.0 } else if x > 1.0 { 1.0 } else { x } }

// Project segment AB and CD onto the dominant axis and compute parameter ranges for overlap.
fn collinear_overlap(a: Vec2, b: Vec2, c: Vec2, d: Vec2, eps: f64) -> SegIntersection {
    let dxab = (b.x - a.x).abs();
    let dyab = (b.y - a.y).abs();
    let (pa1, pa2, pc1, pc2) = if dxab >= dyab {
        (a.x, b.x, c.x, d.x)
    } else {
        (a.y, b.y, c.y, d.y)
    };
    let len_ab = pa2 - pa1;
    if within_eps(len_ab, eps) {
        // AB is a point: touch if it lies within CD's span
        let len_cd = pc2 - pc1;
        let u = if within_eps(len_cd, eps) { 0.0 } else { (pa1 - pc1) / len_cd };
        if u < -eps || u > 1.0 + eps {
            return SegIntersection::None;
        }
        return SegIntersection::Touch { t: 0.0, u: clamp01(u), point: a };
    }
    let t_c1 = (pc1 - pa1) / len_ab;
    let t_c2 = (pc2 - pa1) / len_ab;
    let mut lo = t_c1.min(t_c2);
    let mut hi = t_c1.max(t_c2);
    if hi < -eps || lo > 1.0 + eps { return SegIntersection::None; }
    lo = lo.max(0.0);
    hi = hi.min(1.0);
    if hi < lo { return SegIntersection::None; }
    let len_cd = pc2 - pc1;
    let u0 = if within_eps(len_cd, eps) { 0.0 } else { (pa1 + lo * len_ab - pc1) / len_cd };
    let u1 = if within_eps(len_cd, eps) { 0.0 } else { (pa1 + hi * len_ab - pc1) / len_cd };
    let (u0, u1) = if u0 <= u1 { (u0, u1) } else { (u1, u0) };
    SegIntersection::CollinearOverlap { t0: lo, t1: hi, u0, u1 }
}

pub fn intersect_segments(a: Vec2, b: Vec2, c: Vec2, d: Vec2, eps_pos: f64, eps_denom: f64) -> SegIntersection {
    let eps = eps_pos;

    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if within_eps(o1, eps) && within_eps(o2, eps) && within_eps(o3, eps) && within_eps(o4, eps) {
        return collinear_overlap(a, b, c, d, eps);
    }

    // o1/o2 straddle AB and o3/o4 straddle CD (zero counts as touching)
    let inter1 = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0) || within_eps(o1, eps) || within_eps(o2, eps);
    let inter2 = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0) || within_eps(o3, eps) || within_eps(o4, eps);
    if !(inter1 && inter2) {
        return SegIntersection::None;
    }

    let r = b - a;
    let s = d - c;
    let rxs = r.cross(s);
    let qp = c - a;

    if within_eps(rxs, eps_denom) {
        return SegIntersection::None;
    }

    let t = qp.cross(s) / rxs;
    let u = qp.cross(r) / rxs;
    let point = a + r * t;

    if t < -eps || t > 1.0 + eps || u < -eps || u > 1.0 + eps {
        return SegIntersection::None;
    }
    let is_touch = within_eps(t, eps) || within_eps(1.0 - t, eps) || within_eps(u, eps) || within_eps(1.0 - u, eps);
    if is_touch {
        SegIntersection::Touch { t: clamp01(t), u: clamp01(u), point }
    } else {
        SegIntersection::Proper { t, u, point }
    }
}
