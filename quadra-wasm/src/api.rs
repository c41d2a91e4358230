use crate::Topology;
use js_sys::Float64Array;
use quadra::model::{LotUpdate, NaturalKind, RoadStyle, Vec2};
use quadra::{KernelConfig, LotOptions, SnapQuery};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;
use crate::error;
use crate::interop::{arr_f64, arr_u32, arr_u8, from_points, new_obj, set_kv, to_js, to_points};

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn id_value(id: u32) -> JsValue {
    JsValue::from_f64(id as f64)
}

fn ids_value(ids: Vec<u32>) -> JsValue {
    arr_u32(&ids).into()
}

/// Enum names travel as their snake_case serde names.
fn parse_name<T: DeserializeOwned>(s: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::from(s)).ok()
}

fn parse_js<T: DeserializeOwned>(v: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(v).map_err(|e| error::invalid_options(format!("{}: {}", what, e)))
}

fn check_xy(x: f64, y: f64) -> Result<Vec2, JsValue> {
    if !x.is_finite() {
        return Err(error::non_finite("x"));
    }
    if !y.is_finite() {
        return Err(error::non_finite("y"));
    }
    Ok(Vec2::new(x, y))
}

fn style_of(s: &str) -> Result<RoadStyle, JsValue> {
    parse_name(s).ok_or_else(|| error::invalid_options(format!("unknown road style '{}'", s)))
}

#[wasm_bindgen]
impl Topology {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Topology {
        crate::Topology::rs_new()
    }
    /// Build with a partial config object; unknown or bad configs fall back
    /// to defaults with a console warning.
    pub fn with_config(config: JsValue) -> Topology {
        match serde_wasm_bindgen::from_value::<KernelConfig>(config) {
            Ok(cfg) => crate::Topology::rs_with_config(cfg),
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!("quadra: bad config ({}); using defaults", e)));
                crate::Topology::rs_new()
            }
        }
    }
    pub fn version(&self) -> u64 {
        self.rs_version()
    }

    // Nodes
    pub fn add_node(&mut self, x: f64, y: f64) -> Option<u32> {
        self.inner.add_node(Vec2::new(x, y)).ok()
    }
    pub fn add_node_res(&mut self, x: f64, y: f64) -> JsValue {
        let p = match check_xy(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::result(self.inner.add_node(p), id_value)
    }
    pub fn move_node(&mut self, id: u32, x: f64, y: f64) -> bool {
        self.inner.move_node(id, Vec2::new(x, y)).is_ok()
    }
    pub fn move_node_res(&mut self, id: u32, x: f64, y: f64) -> JsValue {
        let p = match check_xy(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::result(self.inner.move_node(id, p), |_| JsValue::TRUE)
    }
    pub fn remove_node(&mut self, id: u32) -> bool {
        self.inner.remove_node(id).is_ok()
    }
    pub fn remove_node_res(&mut self, id: u32) -> JsValue {
        error::result(self.inner.remove_node(id), |_| JsValue::TRUE)
    }
    pub fn get_node(&self, id: u32) -> JsValue {
        match self.inner.node(id) {
            Some(n) => to_js(n),
            None => JsValue::NULL,
        }
    }
    pub fn node_count(&self) -> u32 {
        self.inner.node_count() as u32
    }

    // Edges
    pub fn add_edge(&mut self, a: u32, b: u32, style: &str, width: f64) -> Option<u32> {
        let style = parse_name(style)?;
        self.inner.add_edge(a, b, style, width).ok()
    }
    pub fn add_edge_res(&mut self, a: u32, b: u32, style: &str, width: f64) -> JsValue {
        let style = match style_of(style) {
            Ok(s) => s,
            Err(e) => return e,
        };
        error::result(self.inner.add_edge(a, b, style, width), id_value)
    }
    #[allow(clippy::too_many_arguments)]
    pub fn add_curved_edge_res(
        &mut self,
        a: u32,
        b: u32,
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        style: &str,
        width: f64,
    ) -> JsValue {
        let style = match style_of(style) {
            Ok(s) => s,
            Err(e) => return e,
        };
        let r = self.inner.add_curved_edge(a, b, Vec2::new(c1x, c1y), Vec2::new(c2x, c2y), style, width);
        error::result(r, id_value)
    }
    pub fn set_edge_curve_res(&mut self, id: u32, c1x: f64, c1y: f64, c2x: f64, c2y: f64) -> JsValue {
        error::result(self.inner.set_edge_curve(id, Vec2::new(c1x, c1y), Vec2::new(c2x, c2y)), |_| JsValue::TRUE)
    }
    pub fn set_edge_width_res(&mut self, id: u32, width: f64) -> JsValue {
        error::result(self.inner.set_edge_width(id, width), |_| JsValue::TRUE)
    }
    pub fn set_edge_style_res(&mut self, id: u32, style: &str) -> JsValue {
        let style = match style_of(style) {
            Ok(s) => s,
            Err(e) => return e,
        };
        error::result(self.inner.set_edge_style(id, style), |_| JsValue::TRUE)
    }
    pub fn split_edge(&mut self, id: u32, t: f64) -> Option<u32> {
        self.inner.split_edge(id, t).ok()
    }
    pub fn split_edge_res(&mut self, id: u32, t: f64) -> JsValue {
        error::result(self.inner.split_edge(id, t), id_value)
    }
    pub fn remove_edge(&mut self, id: u32) -> bool {
        self.inner.remove_edge(id).is_ok()
    }
    pub fn remove_edge_res(&mut self, id: u32) -> JsValue {
        error::result(self.inner.remove_edge(id), |_| JsValue::TRUE)
    }
    pub fn edge_count(&self) -> u32 {
        self.inner.edge_count() as u32
    }
    /// Paved outline of a road as interleaved coordinates; null for
    /// roundabout arcs and unknown ids.
    pub fn road_surface(&self, id: u32) -> JsValue {
        match self.inner.road_surface(id) {
            Ok(Some(poly)) => from_points(&poly).into(),
            _ => JsValue::NULL,
        }
    }

    // Typed arrays getters
    pub fn get_node_data(&self) -> JsValue {
        let mut ids = Vec::new();
        let mut pos = Vec::new();
        let mut kinds = Vec::new();
        for n in self.inner.nodes() {
            ids.push(n.id);
            pos.extend([n.position.x, n.position.y]);
            kinds.push(n.kind as u8);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "positions", &arr_f64(&pos).into());
        set_kv(&obj, "kinds", &arr_u8(&kinds).into());
        obj.into()
    }
    pub fn get_edge_data(&self) -> JsValue {
        let mut ids = Vec::new();
        let mut endpoints = Vec::new();
        let mut controls = Vec::new();
        let mut widths = Vec::new();
        let mut styles = Vec::new();
        for e in self.inner.edges() {
            ids.push(e.id);
            endpoints.extend([e.from, e.to]);
            let c = &e.curve;
            controls.extend([c.p0.x, c.p0.y, c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y]);
            widths.push(e.width);
            styles.push(e.style as u8);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "endpoints", &arr_u32(&endpoints).into());
        set_kv(&obj, "controls", &arr_f64(&controls).into());
        set_kv(&obj, "widths", &arr_f64(&widths).into());
        set_kv(&obj, "styles", &arr_u8(&styles).into());
        obj.into()
    }

    // Drawing + snapping
    pub fn resolve_point_res(&mut self, x: f64, y: f64) -> JsValue {
        let p = match check_xy(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::result(self.inner.resolve_point(p), id_value)
    }
    pub fn connect_res(&mut self, ax: f64, ay: f64, bx: f64, by: f64, style: &str, width: f64) -> JsValue {
        let style = match style_of(style) {
            Ok(s) => s,
            Err(e) => return e,
        };
        error::result(self.inner.connect(Vec2::new(ax, ay), Vec2::new(bx, by), style, width), id_value)
    }
    pub fn snap(&self, x: f64, y: f64, radius: f64, include_lots: bool, exclude_lot: Option<u32>) -> JsValue {
        let mut q = SnapQuery::new(Vec2::new(x, y), radius);
        q.include_lots = include_lots;
        q.exclude_lot = exclude_lot;
        match self.inner.snap(&q) {
            Some(hit) => to_js(&hit),
            None => JsValue::NULL,
        }
    }
    pub fn snap_res(&self, x: f64, y: f64, radius: f64, include_lots: bool, exclude_lot: Option<u32>) -> JsValue {
        if let Err(e) = check_xy(x, y) {
            return e;
        }
        if !radius.is_finite() {
            return error::non_finite("radius");
        }
        if radius < 0.0 {
            return error::from_error(&quadra::Error::OutOfRange {
                param: "radius",
                min: 0.0,
                max: f64::INFINITY,
                got: radius,
            });
        }
        error::ok(self.snap(x, y, radius, include_lots, exclude_lot))
    }
    pub fn snap_block_boundary(&self, x: f64, y: f64, radius: f64) -> JsValue {
        match self.inner.snap_block_boundary(Vec2::new(x, y), radius) {
            Some(hit) => to_js(&hit),
            None => JsValue::NULL,
        }
    }

    // Roundabouts
    pub fn add_roundabout_res(&mut self, cx: f64, cy: f64, radius: f64, ports: u32) -> JsValue {
        error::result(self.inner.add_roundabout(Vec2::new(cx, cy), radius, ports), id_value)
    }
    pub fn move_roundabout_res(&mut self, id: u32, cx: f64, cy: f64) -> JsValue {
        error::result(self.inner.move_roundabout(id, Vec2::new(cx, cy)), |_| JsValue::TRUE)
    }
    pub fn resize_roundabout_res(&mut self, id: u32, radius: f64) -> JsValue {
        error::result(self.inner.resize_roundabout(id, radius), |_| JsValue::TRUE)
    }
    pub fn remove_roundabout_res(&mut self, id: u32) -> JsValue {
        error::result(self.inner.remove_roundabout(id), |_| JsValue::TRUE)
    }
    pub fn get_roundabout(&self, id: u32) -> JsValue {
        match self.inner.roundabout(id) {
            Some(r) => to_js(r),
            None => JsValue::NULL,
        }
    }

    // Blocks + lots
    pub fn get_blocks(&self) -> JsValue {
        let blocks: Vec<_> = self.inner.blocks().collect();
        to_js(&blocks)
    }
    pub fn get_block(&self, id: u32) -> JsValue {
        match self.inner.block(id) {
            Some(b) => to_js(b),
            None => JsValue::NULL,
        }
    }
    pub fn get_lots(&self, block: u32) -> JsValue {
        to_js(&self.inner.lots_of(block))
    }
    pub fn get_lot(&self, id: u32) -> JsValue {
        match self.inner.lot(id) {
            Some(l) => to_js(l),
            None => JsValue::NULL,
        }
    }
    /// `opts` is a `LotOptions` object; the value is the new lot ids.
    pub fn generate_lots_res(&mut self, block: u32, opts: JsValue) -> JsValue {
        let opts: LotOptions = match parse_js(opts, "lot options") {
            Ok(o) => o,
            Err(e) => return e,
        };
        error::result(self.inner.generate_lots(block, &opts), ids_value)
    }
    pub fn regenerate_lots_res(&mut self, block: u32) -> JsValue {
        error::result(self.inner.regenerate_lots(block), ids_value)
    }
    pub fn resize_row_res(&mut self, block: u32, row: u32, depth_m: f64) -> JsValue {
        error::result(self.inner.resize_row(block, row as usize, depth_m), ids_value)
    }
    pub fn delete_block_res(&mut self, block: u32) -> JsValue {
        error::result(self.inner.delete_block(block), |_| JsValue::TRUE)
    }
    pub fn add_lot_res(&mut self, block: u32, points: &Float64Array) -> JsValue {
        error::result(self.inner.add_lot(block, &to_points(points)), id_value)
    }
    pub fn set_lot_polygon_res(&mut self, lot: u32, points: &Float64Array) -> JsValue {
        error::result(self.inner.set_lot_polygon(lot, &to_points(points)), |_| JsValue::TRUE)
    }
    pub fn duplicate_lot_res(&mut self, lot: u32, dx: f64, dy: f64) -> JsValue {
        error::result(self.inner.duplicate_lot(lot, Vec2::new(dx, dy)), id_value)
    }
    /// `update` is a partial `{ status, price, conditions, notes, label }`.
    pub fn update_lot_res(&mut self, lot: u32, update: JsValue) -> JsValue {
        let update: LotUpdate = match parse_js(update, "lot update") {
            Ok(u) => u,
            Err(e) => return e,
        };
        error::result(self.inner.update_lot(lot, update), |_| JsValue::TRUE)
    }
    pub fn delete_lot_res(&mut self, lot: u32) -> JsValue {
        error::result(self.inner.delete_lot(lot), |_| JsValue::TRUE)
    }

    // Annotations
    pub fn add_natural_res(&mut self, kind: &str, points: &Float64Array, name: Option<String>) -> JsValue {
        let Some(kind) = parse_name::<NaturalKind>(kind) else {
            return error::invalid_options(format!("unknown natural kind '{}'", kind));
        };
        error::result(self.inner.add_natural(kind, &to_points(points), name), id_value)
    }
    pub fn set_natural_polygon_res(&mut self, id: u32, points: &Float64Array) -> JsValue {
        error::result(self.inner.set_natural_polygon(id, &to_points(points)), |_| JsValue::TRUE)
    }
    pub fn set_natural_name_res(&mut self, id: u32, name: Option<String>) -> JsValue {
        error::result(self.inner.set_natural_name(id, name), |_| JsValue::TRUE)
    }
    pub fn remove_natural_res(&mut self, id: u32) -> JsValue {
        error::result(self.inner.remove_natural(id), |_| JsValue::TRUE)
    }
    pub fn add_label_res(&mut self, text: &str, x: f64, y: f64, rotation: f64, size: f64) -> JsValue {
        error::result(self.inner.add_label(text, Vec2::new(x, y), rotation, size), id_value)
    }
    pub fn move_label_res(&mut self, id: u32, x: f64, y: f64) -> JsValue {
        error::result(self.inner.move_label(id, Vec2::new(x, y)), |_| JsValue::TRUE)
    }
    pub fn set_label_text_res(&mut self, id: u32, text: &str) -> JsValue {
        error::result(self.inner.set_label_text(id, text), |_| JsValue::TRUE)
    }
    pub fn remove_label_res(&mut self, id: u32) -> JsValue {
        error::result(self.inner.remove_label(id), |_| JsValue::TRUE)
    }

    // History
    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }
    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }
    pub fn clear(&mut self) -> bool {
        self.inner.clear().is_ok()
    }

    // JSON + export
    pub fn to_json(&self) -> JsValue {
        to_js(&self.inner.to_json_value())
    }
    pub fn to_json_string(&self) -> String {
        self.inner.to_json_string()
    }
    pub fn from_json(&mut self, v: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => self.inner.load_json_value(val).is_ok(),
            Err(_) => false,
        }
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => error::result(self.inner.load_json_value(val), |_| JsValue::TRUE),
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
    pub fn from_json_string_res(&mut self, s: &str) -> JsValue {
        error::result(self.inner.load_json_str(s), |_| JsValue::TRUE)
    }
    pub fn map_elements(&self) -> JsValue {
        to_js(&self.inner.map_elements())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Topology::new()
    }
}
