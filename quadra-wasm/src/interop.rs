use js_sys::{Float64Array, Object, Reflect, Uint32Array, Uint8Array};
use quadra::model::Vec2;
use serde::Serialize;
use wasm_bindgen::JsValue;

pub fn new_obj() -> Object { Object::new() }
pub fn set_kv(obj: &Object, k: &str, v: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(k), v);
}
pub fn arr_u32(slice: &[u32]) -> Uint32Array {
    let arr = Uint32Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}
pub fn arr_f64(slice: &[f64]) -> Float64Array {
    let arr = Float64Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}
pub fn arr_u8(slice: &[u8]) -> Uint8Array {
    let arr = Uint8Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}

/// Interleaved `[x0, y0, x1, y1, ...]`; a trailing odd value is ignored.
pub fn to_points(arr: &Float64Array) -> Vec<Vec2> {
    let v = arr.to_vec();
    v.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect()
}

pub fn from_points(points: &[Vec2]) -> Float64Array {
    let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    arr_f64(&flat)
}

/// Serialize with plain JS objects for maps so `serde_json::Value` payloads
/// come out as ordinary objects.
pub fn to_js<T: Serialize + ?Sized>(v: &T) -> JsValue {
    v.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).unwrap_or(JsValue::NULL)
}
