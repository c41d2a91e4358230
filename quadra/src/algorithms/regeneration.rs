//! Block bookkeeping after graph edits, and the block/lot commands.
//!
//! Blocks are matched across re-detections by their canonical edge-cycle
//! key. A matched block whose boundary moved gets its lots regenerated only
//! when it was never hand-edited and its persisted parameters ask for it.
//! Snapshot loads never regenerate.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use super::blocks::{cycle_key, detect_blocks, BlockOptions};
use super::lots::{build_frame, generate_lots, LotOptions, LotShape};
use crate::error::{Error, Result};
use crate::geometry::limits::MAX_LOTS;
use crate::geometry::polygon::{is_simple, point_in_polygon, signed_area, translate_polygon};
use crate::model::{Block, BlockId, BlockStatus, GridParams, Lot, LotId, LotStatus, LotUpdate, Vec2};
use crate::{check_point, check_polygon, Topology};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    /// After an interactive edit: regenerate eligible blocks, drop blocks
    /// whose cycle vanished.
    Edit,
    /// After a snapshot load: persisted lots and blocks are authoritative.
    Load,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub kept: usize,
    pub added: usize,
    pub removed: usize,
    pub regenerated: usize,
}

impl Topology {
    pub(crate) fn block_options(&self) -> BlockOptions {
        BlockOptions { samples: self.config.block_flatten_samples, inset: self.config.inset_blocks }
    }

    /// Re-detect blocks and reconcile them with the stored ones.
    pub(crate) fn refresh_blocks(&mut self, mode: RefreshMode) -> RefreshSummary {
        let detected = detect_blocks(&self.state.nodes, &self.state.edges, &self.block_options());
        let mut by_key: HashMap<Vec<u32>, BlockId> = HashMap::new();
        for b in self.state.blocks.values() {
            by_key.entry(cycle_key(&b.edges)).or_insert(b.id);
        }
        let mut summary = RefreshSummary::default();
        let mut matched: BTreeSet<BlockId> = BTreeSet::new();
        let mut to_regenerate = Vec::new();
        for d in detected {
            match by_key.get(&d.key).copied().filter(|id| !matched.contains(id)) {
                Some(id) => {
                    matched.insert(id);
                    summary.kept += 1;
                    let Some(block) = self.state.blocks.get_mut(&id) else { continue };
                    let moved = block.polygon != d.polygon;
                    // re-detection may start the cycle at another edge
                    let front_edge = block.grid.as_ref().and_then(|g| block.edges.get(g.front_side()).copied());
                    block.edges = d.edges;
                    block.polygon = d.polygon;
                    block.sides = d.sides;
                    if let (Some(edge), Some(grid)) = (front_edge, block.grid.as_mut()) {
                        if let Some(i) = block.edges.iter().position(|e| *e == edge) {
                            grid.set_front_side(i);
                        }
                    }
                    let eligible = !block.manually_edited
                        && block.grid.as_ref().map_or(false, |g| g.auto_regenerate());
                    if mode == RefreshMode::Edit && moved && eligible {
                        to_regenerate.push(id);
                    }
                }
                None => {
                    let id = self.state.alloc_id();
                    matched.insert(id);
                    summary.added += 1;
                    self.state.blocks.insert(
                        id,
                        Block {
                            id,
                            edges: d.edges,
                            polygon: d.polygon,
                            sides: d.sides,
                            status: BlockStatus::Detected,
                            lots: Vec::new(),
                            grid: None,
                            manually_edited: false,
                        },
                    );
                }
            }
        }
        if mode == RefreshMode::Edit {
            let stale: Vec<BlockId> =
                self.state.blocks.keys().copied().filter(|id| !matched.contains(id)).collect();
            for id in stale {
                self.remove_block_inner(id);
                summary.removed += 1;
            }
        }
        for id in to_regenerate {
            if self.regenerate_inner(id).is_ok() {
                summary.regenerated += 1;
            }
        }
        debug!(
            mode = ?mode,
            kept = summary.kept,
            added = summary.added,
            removed = summary.removed,
            regenerated = summary.regenerated,
            "blocks refreshed"
        );
        summary
    }

    fn remove_block_inner(&mut self, id: BlockId) {
        if let Some(b) = self.state.blocks.remove(&id) {
            for lot in b.lots {
                self.state.lots.remove(&lot);
            }
        }
    }

    /// Swap a block's lots for freshly generated ones.
    fn replace_lots(&mut self, block: BlockId, shapes: Vec<LotShape>) -> Result<Vec<LotId>> {
        let old: Vec<LotId> = self.state.blocks.get(&block).map(|b| b.lots.clone()).unwrap_or_default();
        if self.state.lots.len().saturating_sub(old.len()) + shapes.len() > MAX_LOTS {
            return Err(Error::LimitExceeded { what: "lots", limit: MAX_LOTS });
        }
        for id in &old {
            self.state.lots.remove(id);
        }
        let mut ids = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let id = self.state.alloc_id();
            self.state.lots.insert(
                id,
                Lot {
                    id,
                    block,
                    polygon: shape.polygon,
                    area: shape.area,
                    frontage: shape.frontage,
                    status: LotStatus::Available,
                    price: None,
                    conditions: None,
                    notes: None,
                    label: None,
                },
            );
            ids.push(id);
        }
        if let Some(b) = self.state.blocks.get_mut(&block) {
            b.lots = ids.clone();
            b.status = if ids.is_empty() { BlockStatus::Detected } else { BlockStatus::LotsGenerated };
        }
        Ok(ids)
    }

    /// Regenerate from the persisted parameters. An empty result leaves the
    /// block detected but keeps its parameters.
    fn regenerate_inner(&mut self, id: BlockId) -> Result<Vec<LotId>> {
        let block = self.state.blocks.get(&id).ok_or(Error::unknown("block", id))?;
        let params = block.grid.clone().ok_or(Error::NoGridParams(id))?;
        let opts = LotOptions::from_params(&params);
        let generation = match generate_lots(&block.polygon, &block.sides, &opts, self.config.min_lot_area_m2) {
            Ok(g) => g,
            Err(e) => {
                warn!(block = id, error = %e, "persisted grid parameters rejected");
                return Err(e);
            }
        };
        let ids = self.replace_lots(id, generation.lots)?;
        if let Some(b) = self.state.blocks.get_mut(&id) {
            if let Some(p) = generation.params {
                b.grid = Some(p);
            }
            b.manually_edited = false;
        }
        Ok(ids)
    }

    /// Generate lots for a block, replacing any it has. Persisted front side
    /// and row depths are reused when the request does not override them.
    /// Returns the new lot ids; an empty vector means nothing was generated
    /// and the block was left as it was.
    pub fn generate_lots(&mut self, block: BlockId, opts: &LotOptions) -> Result<Vec<LotId>> {
        let b = self.state.blocks.get(&block).ok_or(Error::unknown("block", block))?;
        let mut opts = opts.clone();
        opts.validate()?;
        if let Some(params) = &b.grid {
            if opts.front_side.is_none() && params.front_side() < b.sides.len() {
                opts.front_side = Some(params.front_side());
            }
            if let GridParams::Dimensions { depth_m, row_depths_m, .. } = params {
                let same_request = *depth_m == opts.depth && row_depths_m.len() == opts.rows as usize;
                if opts.row_depths.is_none() && same_request {
                    opts.row_depths = Some(row_depths_m.clone());
                }
            }
        }
        let generation = generate_lots(&b.polygon, &b.sides, &opts, self.config.min_lot_area_m2)?;
        if generation.lots.is_empty() {
            warn!(block = block, "no lots generated");
            return Ok(Vec::new());
        }
        self.commit(|t| {
            let ids = t.replace_lots(block, generation.lots)?;
            if let Some(b) = t.state.blocks.get_mut(&block) {
                b.grid = generation.params;
                b.manually_edited = false;
            }
            Ok(ids)
        })
    }

    /// Reproduce a block's layout from its persisted parameters.
    pub fn regenerate_lots(&mut self, block: BlockId) -> Result<Vec<LotId>> {
        let b = self.state.blocks.get(&block).ok_or(Error::unknown("block", block))?;
        if b.grid.is_none() {
            return Err(Error::NoGridParams(block));
        }
        self.commit(|t| t.regenerate_inner(block))
    }

    /// Set the depth of one row of a dimensions-mode block and regenerate.
    pub fn resize_row(&mut self, block: BlockId, row: usize, depth_m: f64) -> Result<Vec<LotId>> {
        let b = self.state.blocks.get(&block).ok_or(Error::unknown("block", block))?;
        let Some(params) = &b.grid else {
            return Err(Error::NoGridParams(block));
        };
        let GridParams::Dimensions { row_depths_m, .. } = params else {
            return Err(Error::InvalidOptions("row resize needs a dimensions-mode block".into()));
        };
        if row >= row_depths_m.len() {
            return Err(Error::OutOfRange {
                param: "row",
                min: 0.0,
                max: row_depths_m.len() as f64 - 1.0,
                got: row as f64,
            });
        }
        if !depth_m.is_finite() {
            return Err(Error::NonFinite("depth_m"));
        }
        if depth_m <= 0.0 {
            return Err(Error::InvalidOptions("row depth must be positive".into()));
        }
        self.commit(|t| {
            if let Some(GridParams::Dimensions { row_depths_m, .. }) =
                t.state.blocks.get_mut(&block).and_then(|b| b.grid.as_mut())
            {
                row_depths_m[row] = depth_m;
            }
            t.regenerate_inner(block)
        })
    }

    /// Delete a block and its lots. The face is detected again as a fresh
    /// block on the next graph edit.
    pub fn delete_block(&mut self, block: BlockId) -> Result<()> {
        if !self.state.blocks.contains_key(&block) {
            return Err(Error::unknown("block", block));
        }
        self.commit(|t| {
            t.remove_block_inner(block);
            Ok(())
        })
    }

    /// Normalize a hand-drawn lot polygon and check it lies in the block.
    fn check_lot_polygon(&self, block: &Block, polygon: &[Vec2]) -> Result<Vec<Vec2>> {
        let poly = check_polygon(polygon, "lot polygon")?;
        if !is_simple(&poly) {
            return Err(Error::InvalidPolygon);
        }
        let tol = self.config.containment_tolerance;
        if poly.iter().any(|p| !point_in_polygon(*p, &block.polygon, tol)) {
            return Err(Error::LotOutsideBlock(block.id));
        }
        Ok(poly)
    }

    /// Area (m²) and frontage (m) of a lot measured in its block's frame.
    fn measure_lot(&self, block: &Block, polygon: &[Vec2]) -> (f64, f64) {
        let ppm = block
            .grid
            .as_ref()
            .map(|g| g.pixels_per_meter())
            .unwrap_or(self.config.default_pixels_per_meter);
        let area = signed_area(polygon).abs() / (ppm * ppm);
        let front_side = block.grid.as_ref().map(|g| g.front_side());
        let frontage = build_frame(&block.polygon, &block.sides, front_side).map_or(0.0, |f| {
            let (lo, hi) = polygon.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                let u = p.dot(f.front_dir);
                (lo.min(u), hi.max(u))
            });
            (hi - lo) / ppm
        });
        (area, frontage)
    }

    fn insert_manual_lot(&mut self, block: BlockId, polygon: Vec<Vec2>, template: Option<&Lot>) -> Result<LotId> {
        if self.state.lots.len() >= MAX_LOTS {
            return Err(Error::LimitExceeded { what: "lots", limit: MAX_LOTS });
        }
        let b = self.state.blocks.get(&block).ok_or(Error::unknown("block", block))?;
        let (area, frontage) = self.measure_lot(b, &polygon);
        let id = self.state.alloc_id();
        self.state.lots.insert(
            id,
            Lot {
                id,
                block,
                polygon,
                area,
                frontage,
                status: LotStatus::Available,
                price: template.and_then(|l| l.price),
                conditions: template.and_then(|l| l.conditions.clone()),
                notes: template.and_then(|l| l.notes.clone()),
                label: None,
            },
        );
        if let Some(b) = self.state.blocks.get_mut(&block) {
            b.lots.push(id);
            b.status = BlockStatus::LotsGenerated;
            b.manually_edited = true;
        }
        Ok(id)
    }

    /// Add a hand-drawn lot to a block.
    pub fn add_lot(&mut self, block: BlockId, polygon: &[Vec2]) -> Result<LotId> {
        let b = self.state.blocks.get(&block).ok_or(Error::unknown("block", block))?;
        let poly = self.check_lot_polygon(b, polygon)?;
        self.commit(|t| t.insert_manual_lot(block, poly, None))
    }

    /// Replace a lot's polygon; the block is marked hand-edited.
    pub fn set_lot_polygon(&mut self, lot: LotId, polygon: &[Vec2]) -> Result<()> {
        let l = self.state.lots.get(&lot).ok_or(Error::unknown("lot", lot))?;
        let b = self.state.blocks.get(&l.block).ok_or(Error::unknown("block", l.block))?;
        let poly = self.check_lot_polygon(b, polygon)?;
        let (area, frontage) = self.measure_lot(b, &poly);
        let block = b.id;
        self.commit(|t| {
            if let Some(l) = t.state.lots.get_mut(&lot) {
                l.polygon = poly;
                l.area = area;
                l.frontage = frontage;
            }
            if let Some(b) = t.state.blocks.get_mut(&block) {
                b.manually_edited = true;
            }
            Ok(())
        })
    }

    /// Copy a lot shifted by `offset`; the copy must still lie in the block.
    pub fn duplicate_lot(&mut self, lot: LotId, offset: Vec2) -> Result<LotId> {
        check_point(offset, "offset")?;
        let l = self.state.lots.get(&lot).ok_or(Error::unknown("lot", lot))?;
        let b = self.state.blocks.get(&l.block).ok_or(Error::unknown("block", l.block))?;
        let poly = self.check_lot_polygon(b, &translate_polygon(&l.polygon, offset))?;
        let template = l.clone();
        self.commit(|t| t.insert_manual_lot(template.block, poly, Some(&template)))
    }

    /// Update commercial fields; `None` fields are left unchanged.
    pub fn update_lot(&mut self, lot: LotId, update: LotUpdate) -> Result<()> {
        if !self.state.lots.contains_key(&lot) {
            return Err(Error::unknown("lot", lot));
        }
        if let Some(price) = update.price {
            if !price.is_finite() {
                return Err(Error::NonFinite("price"));
            }
            if price < 0.0 {
                return Err(Error::OutOfRange { param: "price", min: 0.0, max: f64::MAX, got: price });
            }
        }
        self.commit(|t| {
            if let Some(l) = t.state.lots.get_mut(&lot) {
                if let Some(s) = update.status {
                    l.status = s;
                }
                if update.price.is_some() {
                    l.price = update.price;
                }
                if update.conditions.is_some() {
                    l.conditions = update.conditions;
                }
                if update.notes.is_some() {
                    l.notes = update.notes;
                }
                if update.label.is_some() {
                    l.label = update.label;
                }
            }
            Ok(())
        })
    }

    /// Delete a lot. Emptying a block resets it to detected and forgets its
    /// grid parameters.
    pub fn delete_lot(&mut self, lot: LotId) -> Result<()> {
        let block = self.state.lots.get(&lot).ok_or(Error::unknown("lot", lot))?.block;
        self.commit(|t| {
            t.state.lots.remove(&lot);
            if let Some(b) = t.state.blocks.get_mut(&block) {
                b.lots.retain(|id| *id != lot);
                if b.lots.is_empty() {
                    b.status = BlockStatus::Detected;
                    b.grid = None;
                    b.manually_edited = false;
                }
            }
            Ok(())
        })
    }
}
