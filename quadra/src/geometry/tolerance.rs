// Centralized tolerances and helpers for robust geometry

pub const EPS_CLIP: f64 = 1e-8;           // half-plane signed distance slack (px)
pub const EPS_DEDUP: f64 = 1e-2;          // consecutive vertex coincidence (px)
pub const EPS_LEN: f64 = 1e-9;            // zero-length vector threshold
pub const EPS_DENOM: f64 = 1e-12;         // denominator guard for ratios
pub const EPS_COLLINEAR: f64 = 1e-9;      // |cross| relative to |a||b|
pub const EPS_FACE_AREA: f64 = 1e-2;      // tiny face area threshold (px^2)
pub const EPS_ANG: f64 = 1e-9;            // angle compare slack (radians)
pub const EPS_POS: f64 = 1e-6;            // point coincidence for edits (px)

// Lot post-processing
pub const ROUND_DECIMALS: i32 = 4;
pub const ROW_FRONT_PAD: f64 = 1.0;       // first row starts this far before the frontage
pub const ROW_BACK_PAD: f64 = 1.0;        // last row ends this far past the back
pub const GRID_DEPTH_MARGIN: f64 = 0.98;  // grid mode uses 98% of available depth

// Inset
pub const MITER_LIMIT: f64 = 4.0;         // max vertex displacement as multiple of distance

#[inline] pub fn clamp01(x: f64) -> f64 { x.max(0.0).min(1.0) }

#[inline]
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let k = 10f64.powi(decimals);
    let r = (x * k).round() / k;
    // normalize -0.0 so hashes of equal polygons agree
    if r == 0.0 { 0.0 } else { r }
}
