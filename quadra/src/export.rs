//! Flat map-element records for bulk upserts: one record per road, block,
//! lot, natural element and label.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::Vec2;
use crate::Topology;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Road,
    Block,
    Lot,
    Natural,
    Label,
}

/// GeoJSON-shaped geometry; polygon rings are closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    Point { coordinates: [f64; 2] },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapElement {
    pub id: String,
    pub element_type: ElementType,
    pub geometry: Geometry,
    pub style: String,
    pub metadata: Value,
}

fn coord(p: Vec2) -> [f64; 2] {
    [p.x, p.y]
}

fn ring(poly: &[Vec2]) -> Geometry {
    let mut r: Vec<[f64; 2]> = poly.iter().copied().map(coord).collect();
    if let Some(first) = r.first().copied() {
        r.push(first);
    }
    Geometry::Polygon { coordinates: vec![r] }
}

impl Topology {
    pub fn map_elements(&self) -> Vec<MapElement> {
        let s = &self.state;
        let samples = self.config.snap_flatten_samples;
        let mut out = Vec::with_capacity(s.edges.len() + s.blocks.len() + s.lots.len());
        for e in s.edges.values() {
            out.push(MapElement {
                id: format!("road-{}", e.id),
                element_type: ElementType::Road,
                geometry: Geometry::LineString { coordinates: e.curve.flatten(samples).into_iter().map(coord).collect() },
                style: e.style.as_str().to_string(),
                metadata: json!({ "width": e.width, "from": e.from, "to": e.to }),
            });
        }
        for b in s.blocks.values() {
            out.push(MapElement {
                id: format!("block-{}", b.id),
                element_type: ElementType::Block,
                geometry: ring(&b.polygon),
                style: b.status.as_str().to_string(),
                metadata: json!({
                    "status": b.status.as_str(),
                    "lot_count": b.lots.len(),
                    "manually_edited": b.manually_edited,
                }),
            });
        }
        for l in s.lots.values() {
            out.push(MapElement {
                id: format!("lot-{}", l.id),
                element_type: ElementType::Lot,
                geometry: ring(&l.polygon),
                style: l.status.as_str().to_string(),
                metadata: json!({
                    "block": l.block,
                    "status": l.status.as_str(),
                    "area": l.area,
                    "frontage": l.frontage,
                    "price": l.price,
                    "label": l.label,
                    "conditions": l.conditions,
                    "notes": l.notes,
                }),
            });
        }
        for n in s.naturals.values() {
            out.push(MapElement {
                id: format!("natural-{}", n.id),
                element_type: ElementType::Natural,
                geometry: ring(&n.polygon),
                style: n.kind.as_str().to_string(),
                metadata: json!({ "name": n.name }),
            });
        }
        for l in s.labels.values() {
            out.push(MapElement {
                id: format!("label-{}", l.id),
                element_type: ElementType::Label,
                geometry: Geometry::Point { coordinates: coord(l.position) },
                style: "label".to_string(),
                metadata: json!({ "text": l.text, "rotation": l.rotation, "size": l.size }),
            });
        }
        out
    }
}
