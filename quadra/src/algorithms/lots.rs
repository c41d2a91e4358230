//! Deterministic lot subdivision of a block.
//!
//! The block is sliced in a local frame anchored on its longest side: columns
//! run along the frontage, rows run into the block. Each cell is the original
//! block polygon clipped by four half-planes, so every lot vertex lies on or
//! inside the block boundary by construction.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geometry::clip::{clip_polygon, HalfPlane};
use crate::geometry::limits::{MAX_GRID_COLS, MAX_GRID_ROWS};
use crate::geometry::math::{point_along, polyline_length};
use crate::geometry::polygon::{centroid, dedup_vertices, ensure_ccw, round_polygon, signed_area};
use crate::geometry::tolerance::{
    EPS_DEDUP, EPS_LEN, GRID_DEPTH_MARGIN, ROUND_DECIMALS, ROW_BACK_PAD, ROW_FRONT_PAD,
};
use crate::model::{GenerationMode, GridParams, Vec2};

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// Generation request. Lengths are in meters; `pixels_per_meter` converts
/// them to graph units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotOptions {
    pub mode: GenerationMode,
    /// Target lot frontage (dimensions mode).
    #[serde(default)]
    pub frontage: f64,
    /// Target row depth (dimensions mode).
    #[serde(default)]
    pub depth: f64,
    #[serde(default = "one")]
    pub rows: u32,
    #[serde(default)]
    pub cols: Option<u32>,
    pub pixels_per_meter: f64,
    #[serde(default = "yes")]
    pub auto_regenerate: bool,
    /// Front side index to reuse instead of picking the longest side.
    #[serde(default)]
    pub front_side: Option<usize>,
    /// Per-row depths overriding `depth` (dimensions mode).
    #[serde(default)]
    pub row_depths: Option<Vec<f64>>,
}

impl LotOptions {
    pub fn grid(rows: u32, cols: u32, pixels_per_meter: f64) -> Self {
        LotOptions {
            mode: GenerationMode::Grid,
            frontage: 0.0,
            depth: 0.0,
            rows,
            cols: Some(cols),
            pixels_per_meter,
            auto_regenerate: true,
            front_side: None,
            row_depths: None,
        }
    }

    pub fn dimensions(frontage: f64, depth: f64, rows: u32, pixels_per_meter: f64) -> Self {
        LotOptions {
            mode: GenerationMode::Dimensions,
            frontage,
            depth,
            rows,
            cols: None,
            pixels_per_meter,
            auto_regenerate: true,
            front_side: None,
            row_depths: None,
        }
    }

    /// Options that reproduce a persisted layout.
    pub fn from_params(params: &GridParams) -> Self {
        match params {
            GridParams::Dimensions {
                front_side,
                target_frontage_m,
                depth_m,
                row_depths_m,
                cols,
                fixed_cols,
                pixels_per_meter,
                auto_regenerate,
                ..
            } => LotOptions {
                mode: GenerationMode::Dimensions,
                frontage: *target_frontage_m,
                depth: *depth_m,
                rows: row_depths_m.len() as u32,
                cols: fixed_cols.then_some(*cols),
                pixels_per_meter: *pixels_per_meter,
                auto_regenerate: *auto_regenerate,
                front_side: Some(*front_side),
                row_depths: Some(row_depths_m.clone()),
            },
            GridParams::Grid { front_side, rows, cols, pixels_per_meter, auto_regenerate } => LotOptions {
                mode: GenerationMode::Grid,
                frontage: 0.0,
                depth: 0.0,
                rows: *rows,
                cols: Some(*cols),
                pixels_per_meter: *pixels_per_meter,
                auto_regenerate: *auto_regenerate,
                front_side: Some(*front_side),
                row_depths: None,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pixels_per_meter.is_finite() {
            return Err(Error::NonFinite("pixels_per_meter"));
        }
        if self.pixels_per_meter <= 0.0 {
            return Err(Error::InvalidOptions("pixels_per_meter must be positive".into()));
        }
        if self.rows == 0 || self.rows > MAX_GRID_ROWS {
            return Err(Error::OutOfRange { param: "rows", min: 1.0, max: MAX_GRID_ROWS as f64, got: self.rows as f64 });
        }
        if let Some(c) = self.cols {
            if c == 0 || c > MAX_GRID_COLS {
                return Err(Error::OutOfRange { param: "cols", min: 1.0, max: MAX_GRID_COLS as f64, got: c as f64 });
            }
        }
        if self.mode == GenerationMode::Dimensions {
            if !self.frontage.is_finite() || !self.depth.is_finite() {
                return Err(Error::NonFinite("frontage/depth"));
            }
            if self.frontage <= 0.0 || self.depth <= 0.0 {
                return Err(Error::InvalidOptions("frontage and depth must be positive".into()));
            }
            if let Some(d) = &self.row_depths {
                if d.len() != self.rows as usize {
                    return Err(Error::InvalidOptions(format!(
                        "{} row depths for {} rows",
                        d.len(),
                        self.rows
                    )));
                }
                if d.iter().any(|x| !x.is_finite() || *x <= 0.0) {
                    return Err(Error::InvalidOptions("row depths must be positive".into()));
                }
            }
        }
        Ok(())
    }
}

/// One generated lot before it is given an id.
#[derive(Clone, Debug, PartialEq)]
pub struct LotShape {
    pub polygon: Vec<Vec2>,
    /// m²
    pub area: f64,
    /// m
    pub frontage: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub lots: Vec<LotShape>,
    /// `None` when no frame could be built for the block.
    pub params: Option<GridParams>,
}

/// Slicing frame of a block. `u` coordinates run along `front_dir`, `v`
/// along `depth_dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub front_side: usize,
    pub front_dir: Vec2,
    pub depth_dir: Vec2,
    pub min_u: f64,
    pub max_u: f64,
    pub min_v: f64,
    pub max_v: f64,
    /// Smallest depth among the front side's own points.
    pub front_min_v: f64,
}

/// Longest side by arc length; the first one wins ties.
pub fn select_front_side(sides: &[Vec<Vec2>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in sides.iter().enumerate() {
        let len = polyline_length(s);
        if best.map_or(true, |(_, b)| len > b) {
            best = Some((i, len));
        }
    }
    best.map(|(i, _)| i)
}

pub fn build_frame(polygon: &[Vec2], sides: &[Vec<Vec2>], front_side: Option<usize>) -> Option<Frame> {
    if polygon.len() < 3 {
        warn!(vertices = polygon.len(), "block polygon has fewer than 3 vertices");
        return None;
    }
    let index = match front_side {
        Some(i) if i < sides.len() => i,
        Some(i) => {
            debug!(index = i, sides = sides.len(), "persisted front side out of range; reselecting");
            select_front_side(sides)?
        }
        None => select_front_side(sides)?,
    };
    let side = &sides[index];
    let (first, last) = (*side.first()?, *side.last()?);
    let chord = last - first;
    if chord.length() <= EPS_LEN {
        warn!(side = index, "front side has near-zero length");
        return None;
    }
    let front_dir = chord.normalize();
    let mut depth_dir = front_dir.perp();
    let mid = point_along(side, 0.5 * polyline_length(side)).unwrap_or(first);
    if depth_dir.dot(centroid(polygon) - mid) < 0.0 {
        depth_dir = -depth_dir;
    }
    let mut frame = Frame {
        front_side: index,
        front_dir,
        depth_dir,
        min_u: f64::INFINITY,
        max_u: f64::NEG_INFINITY,
        min_v: f64::INFINITY,
        max_v: f64::NEG_INFINITY,
        front_min_v: f64::INFINITY,
    };
    for p in polygon {
        let (u, v) = (p.dot(front_dir), p.dot(depth_dir));
        frame.min_u = frame.min_u.min(u);
        frame.max_u = frame.max_u.max(u);
        frame.min_v = frame.min_v.min(v);
        frame.max_v = frame.max_v.max(v);
    }
    for p in side {
        frame.front_min_v = frame.front_min_v.min(p.dot(depth_dir));
    }
    Some(frame)
}

/// Column count: the requested one, or as many target frontages as fit.
fn resolve_cols(frame: &Frame, opts: &LotOptions) -> u32 {
    match (opts.mode, opts.cols) {
        (_, Some(c)) => c,
        (GenerationMode::Grid, None) => 1,
        (GenerationMode::Dimensions, None) => {
            let frontage_px = opts.frontage * opts.pixels_per_meter;
            let fit = ((frame.max_u - frame.min_u) / frontage_px).floor();
            if fit > MAX_GRID_COLS as f64 {
                warn!(fit = fit, "column count capped");
            }
            (fit as u32).clamp(1, MAX_GRID_COLS)
        }
    }
}

fn column_bounds(frame: &Frame, cols: u32) -> Vec<f64> {
    let width = (frame.max_u - frame.min_u) / cols as f64;
    let mut bounds: Vec<f64> = (0..=cols).map(|i| frame.min_u + width * i as f64).collect();
    bounds[0] -= ROW_FRONT_PAD;
    bounds[cols as usize] = frame.max_u + ROW_BACK_PAD;
    bounds
}

fn row_bounds(frame: &Frame, opts: &LotOptions) -> Option<Vec<f64>> {
    let available = frame.max_v - frame.front_min_v;
    if available <= EPS_LEN {
        warn!(available = available, "block has near-zero available depth");
        return None;
    }
    let start = frame.front_min_v - ROW_FRONT_PAD;
    let depths: Vec<f64> = match opts.mode {
        GenerationMode::Grid => {
            let d = available * GRID_DEPTH_MARGIN / opts.rows as f64;
            vec![d; opts.rows as usize]
        }
        GenerationMode::Dimensions => match &opts.row_depths {
            Some(ds) => ds.iter().map(|d| d * opts.pixels_per_meter).collect(),
            None => vec![opts.depth * opts.pixels_per_meter; opts.rows as usize],
        },
    };
    let mut bounds = Vec::with_capacity(depths.len() + 1);
    let mut v = start;
    bounds.push(v);
    for d in &depths {
        v += d;
        bounds.push(v);
    }
    if let Some(last) = bounds.last_mut() {
        *last = last.max(frame.max_v + ROW_BACK_PAD);
    }
    Some(bounds)
}

fn finish_cell(cell: Vec<Vec2>, frame: &Frame, ppm: f64, min_area_px: f64) -> Option<LotShape> {
    let mut poly = dedup_vertices(&cell, EPS_DEDUP);
    round_polygon(&mut poly, ROUND_DECIMALS);
    let mut poly = dedup_vertices(&poly, EPS_DEDUP);
    if poly.len() < 3 {
        return None;
    }
    let area_px = signed_area(&poly).abs();
    if area_px < min_area_px || area_px == 0.0 {
        return None;
    }
    ensure_ccw(&mut poly);
    let (lo, hi) = poly.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let u = p.dot(frame.front_dir);
        (lo.min(u), hi.max(u))
    });
    Some(LotShape { polygon: poly, area: area_px / (ppm * ppm), frontage: (hi - lo) / ppm })
}

fn params_for(frame: &Frame, opts: &LotOptions, cols: u32) -> GridParams {
    match opts.mode {
        GenerationMode::Grid => GridParams::Grid {
            front_side: frame.front_side,
            rows: opts.rows,
            cols,
            pixels_per_meter: opts.pixels_per_meter,
            auto_regenerate: opts.auto_regenerate,
        },
        GenerationMode::Dimensions => GridParams::Dimensions {
            front_side: frame.front_side,
            frontage_m: (frame.max_u - frame.min_u) / cols as f64 / opts.pixels_per_meter,
            target_frontage_m: opts.frontage,
            depth_m: opts.depth,
            row_depths_m: opts.row_depths.clone().unwrap_or_else(|| vec![opts.depth; opts.rows as usize]),
            cols,
            fixed_cols: opts.cols.is_some(),
            pixels_per_meter: opts.pixels_per_meter,
            auto_regenerate: opts.auto_regenerate,
        },
    }
}

/// Slice a block into lots. Invalid options are an error; degenerate
/// geometry yields an empty generation.
pub fn generate_lots(
    polygon: &[Vec2],
    sides: &[Vec<Vec2>],
    opts: &LotOptions,
    min_lot_area_m2: f64,
) -> Result<Generation> {
    opts.validate()?;
    let Some(frame) = build_frame(polygon, sides, opts.front_side) else {
        return Ok(Generation { lots: Vec::new(), params: None });
    };
    let col_count = resolve_cols(&frame, opts);
    let params = params_for(&frame, opts, col_count);
    let Some(rows) = row_bounds(&frame, opts) else {
        return Ok(Generation { lots: Vec::new(), params: Some(params) });
    };
    let cols = column_bounds(&frame, col_count);
    let ppm = opts.pixels_per_meter;
    let min_area_px = min_lot_area_m2 * ppm * ppm;

    let mut lots = Vec::new();
    let mut fragments = 0usize;
    for r in rows.windows(2) {
        for c in cols.windows(2) {
            let planes = [
                HalfPlane::at_least(frame.front_dir, c[0]),
                HalfPlane::at_most(frame.front_dir, c[1]),
                HalfPlane::at_least(frame.depth_dir, r[0]),
                HalfPlane::at_most(frame.depth_dir, r[1]),
            ];
            let cell = clip_polygon(polygon, &planes);
            if cell.len() < 3 {
                continue;
            }
            match finish_cell(cell, &frame, ppm, min_area_px) {
                Some(lot) => lots.push(lot),
                None => fragments += 1,
            }
        }
    }
    debug!(
        front_side = frame.front_side,
        cols = cols.len() - 1,
        rows = rows.len() - 1,
        lots = lots.len(),
        fragments = fragments,
        "lot generation"
    );
    Ok(Generation { lots, params: Some(params) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon::point_in_polygon;

    fn rect(w: f64, h: f64) -> (Vec<Vec2>, Vec<Vec<Vec2>>) {
        let p = vec![Vec2::new(0.0, 0.0), Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)];
        let sides = (0..4).map(|i| vec![p[i], p[(i + 1) % 4]]).collect();
        (p, sides)
    }

    #[test]
    fn longest_side_first_wins() {
        let (_, sides) = rect(100.0, 100.0);
        assert_eq!(select_front_side(&sides), Some(0));
        let (_, sides) = rect(50.0, 80.0);
        assert_eq!(select_front_side(&sides), Some(1));
    }

    #[test]
    fn depth_axis_points_inward() {
        let (p, sides) = rect(100.0, 80.0);
        let f = build_frame(&p, &sides, Some(2)).unwrap();
        // top side runs right-to-left; interior is below it
        assert!(f.depth_dir.y < 0.0);
        let f = build_frame(&p, &sides, None).unwrap();
        assert_eq!(f.front_side, 0);
        assert!(f.depth_dir.y > 0.0);
        assert_eq!(f.front_min_v, 0.0);
    }

    #[test]
    fn grid_five_columns() {
        let (p, sides) = rect(100.0, 80.0);
        let g = generate_lots(&p, &sides, &LotOptions::grid(1, 5, 1.0), 0.5).unwrap();
        assert_eq!(g.lots.len(), 5);
        for lot in &g.lots {
            assert!((lot.area - 1600.0).abs() < 1e-6);
            assert!((lot.frontage - 20.0).abs() < 1e-6);
            assert!(signed_area(&lot.polygon) > 0.0);
            for v in &lot.polygon {
                assert!(point_in_polygon(*v, &p, 1.0));
            }
        }
        assert!(matches!(g.params, Some(GridParams::Grid { front_side: 0, rows: 1, cols: 5, .. })));
    }

    #[test]
    fn dimensions_mode_fits_columns_and_rows() {
        let (p, sides) = rect(100.0, 80.0);
        // 2 px per meter: frontage 10 m = 20 px, depth 20 m = 40 px
        let g = generate_lots(&p, &sides, &LotOptions::dimensions(10.0, 20.0, 2, 2.0), 0.5).unwrap();
        assert_eq!(g.lots.len(), 10);
        let first = &g.lots[0];
        assert!((first.frontage - 10.0).abs() < 1e-6);
        // first row spans v in [0, 39] after the 1 px front pad
        assert!((first.area - 20.0 * 39.0 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn dimensions_params_record_resolved_layout() {
        let (p, sides) = rect(110.0, 40.0);
        let g = generate_lots(&p, &sides, &LotOptions::dimensions(15.0, 20.0, 1, 1.0), 0.5).unwrap();
        assert_eq!(g.lots.len(), 7);
        match g.params {
            Some(GridParams::Dimensions { cols, frontage_m, target_frontage_m, fixed_cols, row_depths_m, .. }) => {
                assert_eq!(cols, 7);
                assert!((frontage_m - 110.0 / 7.0).abs() < 1e-9);
                assert_eq!(target_frontage_m, 15.0);
                assert!(!fixed_cols);
                assert_eq!(row_depths_m, vec![20.0]);
            }
            other => panic!("expected dimensions params, got {other:?}"),
        }
    }

    #[test]
    fn narrow_block_still_gets_one_column() {
        let (p, sides) = rect(30.0, 20.0);
        let g = generate_lots(&p, &sides, &LotOptions::dimensions(50.0, 10.0, 1, 1.0), 0.5).unwrap();
        assert_eq!(g.lots.len(), 1);
    }

    #[test]
    fn invalid_options_rejected() {
        let (p, sides) = rect(30.0, 20.0);
        assert!(generate_lots(&p, &sides, &LotOptions::grid(0, 2, 1.0), 0.5).is_err());
        assert!(generate_lots(&p, &sides, &LotOptions::grid(1, 2, 0.0), 0.5).is_err());
        assert!(generate_lots(&p, &sides, &LotOptions::dimensions(f64::NAN, 1.0, 1, 1.0), 0.5).is_err());
    }

    #[test]
    fn zero_length_front_is_empty() {
        let p = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(5.0, 5.0)];
        let sides = vec![vec![Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)]];
        let g = generate_lots(&p, &sides, &LotOptions::grid(1, 1, 1.0), 0.5).unwrap();
        assert!(g.lots.is_empty());
        assert!(g.params.is_none());
    }

    #[test]
    fn persisted_params_reproduce_layout() {
        let (p, sides) = rect(120.0, 60.0);
        let g = generate_lots(&p, &sides, &LotOptions::dimensions(15.0, 30.0, 2, 1.0), 0.5).unwrap();
        let params = g.params.clone().unwrap();
        let again = generate_lots(&p, &sides, &LotOptions::from_params(&params), 0.5).unwrap();
        assert_eq!(g, again);
    }
}
