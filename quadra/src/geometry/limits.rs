// Centralized ingestion limits to harden against untrusted snapshots

// Scene size caps
pub const MAX_NODES: usize = 200_000;
pub const MAX_EDGES: usize = 300_000;
pub const MAX_BLOCKS: usize = 100_000;
pub const MAX_LOTS: usize = 1_000_000;
pub const MAX_ANNOTATIONS: usize = 100_000;

// Polygons
pub const MAX_POLYGON_POINTS: usize = 20_000;
pub const MAX_POLYGON_POINTS_TOTAL: usize = 5_000_000;

// Roundabouts
pub const MIN_ROUNDABOUT_PORTS: u32 = 3;
pub const MAX_ROUNDABOUT_PORTS: u32 = 64;

// Lot generation
pub const MAX_GRID_ROWS: u32 = 1_000;
pub const MAX_GRID_COLS: u32 = 10_000;

// Numeric bounds
pub const COORD_MIN: f64 = -10_000_000.0;
pub const COORD_MAX: f64 = 10_000_000.0;
pub const WIDTH_MAX: f64 = 10_000.0;

#[inline]
pub fn in_coord_bounds(x: f64) -> bool { x.is_finite() && x >= COORD_MIN && x <= COORD_MAX }

#[inline]
pub fn in_width_bounds(w: f64) -> bool { w.is_finite() && w > 0.0 && w <= WIDTH_MAX }
