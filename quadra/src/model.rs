use serde::{Deserialize, Serialize};

use crate::geometry::cubic::CubicBezier;

pub type NodeId = u32;
pub type EdgeId = u32;
pub type RoundaboutId = u32;
pub type BlockId = u32;
pub type LotId = u32;
pub type NaturalId = u32;
pub type LabelId = u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Endpoint,
    Intersection,
    RoundaboutPort,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec2,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roundabout: Option<RoundaboutId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadStyle {
    Asphalt,
    Dirt,
    Cobblestone,
    Boulevard,
    Wall,
    RoundaboutInternal,
}

impl RoadStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RoadStyle::Asphalt => "asphalt",
            RoadStyle::Dirt => "dirt",
            RoadStyle::Cobblestone => "cobblestone",
            RoadStyle::Boulevard => "boulevard",
            RoadStyle::Wall => "wall",
            RoadStyle::RoundaboutInternal => "roundabout_internal",
        }
    }

    pub fn is_internal(self) -> bool {
        matches!(self, RoadStyle::RoundaboutInternal)
    }
}

/// A road or wall segment. `curve.p0`/`curve.p3` always equal the positions
/// of `from`/`to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub curve: CubicBezier,
    pub width: f64,
    pub style: RoadStyle,
}

impl Edge {
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roundabout {
    pub id: RoundaboutId,
    pub center: Vec2,
    pub radius: f64,
    /// Port nodes in angular order, evenly spaced on the perimeter.
    pub ports: Vec<NodeId>,
    /// Internal arc edges; `edges[i]` joins `ports[i]` and `ports[i + 1]`.
    pub edges: Vec<EdgeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Detected,
    LotsGenerated,
}

impl BlockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockStatus::Detected => "detected",
            BlockStatus::LotsGenerated => "lots_generated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Dimensions,
    Grid,
}

/// Persisted generation parameters of a block, enough to reproduce a layout
/// without re-deriving the front side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GridParams {
    Dimensions {
        front_side: usize,
        /// Frontage each column actually got.
        frontage_m: f64,
        /// Frontage requested in the generation dialog.
        target_frontage_m: f64,
        /// Depth requested in the generation dialog.
        depth_m: f64,
        /// Resolved per-row depths; differs from `depth_m` after row resizes.
        row_depths_m: Vec<f64>,
        /// Resolved column count.
        cols: u32,
        /// The column count was requested rather than fitted from the
        /// target frontage; refits keep it.
        #[serde(default)]
        fixed_cols: bool,
        pixels_per_meter: f64,
        auto_regenerate: bool,
    },
    Grid {
        front_side: usize,
        rows: u32,
        cols: u32,
        pixels_per_meter: f64,
        auto_regenerate: bool,
    },
}

impl GridParams {
    pub fn front_side(&self) -> usize {
        match self {
            GridParams::Dimensions { front_side, .. } | GridParams::Grid { front_side, .. } => {
                *front_side
            }
        }
    }

    pub fn set_front_side(&mut self, index: usize) {
        match self {
            GridParams::Dimensions { front_side, .. } | GridParams::Grid { front_side, .. } => {
                *front_side = index;
            }
        }
    }

    /// Keep the front side pointing at the same road after side `k` was
    /// split in two.
    pub fn shift_front_side_after(&mut self, k: usize) {
        match self {
            GridParams::Dimensions { front_side, .. } | GridParams::Grid { front_side, .. } => {
                if *front_side > k {
                    *front_side += 1;
                }
            }
        }
    }

    pub fn auto_regenerate(&self) -> bool {
        match self {
            GridParams::Dimensions { auto_regenerate, .. }
            | GridParams::Grid { auto_regenerate, .. } => *auto_regenerate,
        }
    }

    pub fn pixels_per_meter(&self) -> f64 {
        match self {
            GridParams::Dimensions { pixels_per_meter, .. }
            | GridParams::Grid { pixels_per_meter, .. } => *pixels_per_meter,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Bounding edge cycle in traversal order.
    pub edges: Vec<EdgeId>,
    /// Simple, CCW, inset boundary.
    pub polygon: Vec<Vec2>,
    /// One boundary polyline per edge of the cycle.
    pub sides: Vec<Vec<Vec2>>,
    pub status: BlockStatus,
    pub lots: Vec<LotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridParams>,
    #[serde(default)]
    pub manually_edited: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Available,
    Reserved,
    Sold,
}

impl LotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LotStatus::Available => "available",
            LotStatus::Reserved => "reserved",
            LotStatus::Sold => "sold",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub block: BlockId,
    pub polygon: Vec<Vec2>,
    /// Square meters.
    pub area: f64,
    /// Meters along the block's front axis.
    pub frontage: f64,
    pub status: LotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Partial update of a lot's commercial fields. `None` leaves a field as is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LotUpdate {
    #[serde(default)]
    pub status: Option<LotStatus>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaturalKind {
    Lake,
    Green,
    Institutional,
}

impl NaturalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NaturalKind::Lake => "lake",
            NaturalKind::Green => "green",
            NaturalKind::Institutional => "institutional",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaturalElement {
    pub id: NaturalId,
    pub kind: NaturalKind,
    pub polygon: Vec<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    pub id: LabelId,
    pub text: String,
    pub position: Vec2,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_label_size")]
    pub size: f64,
}

fn default_label_size() -> f64 {
    14.0
}
