use js_sys::{Object, Reflect};
use quadra::Error;
use wasm_bindgen::prelude::*;

fn set_kv(obj: &Object, k: &str, v: &JsValue) { let _ = Reflect::set(obj, &JsValue::from_str(k), v); }

fn new_obj() -> Object { Object::new() }

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

#[inline]
pub fn non_finite(param: &str) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("non_finite", format!("parameter '{}' must be finite", param), Some(d.into()))
}

#[inline]
pub fn invalid_options(message: impl Into<String>) -> JsValue {
    err("invalid_options", message, None)
}

/// Kernel error to envelope; the code is the kernel's stable code.
pub fn from_error(e: &Error) -> JsValue {
    let data = match e {
        Error::UnknownId { kind, id } => {
            let d = new_obj();
            set_kv(&d, "kind", &JsValue::from_str(kind));
            set_kv(&d, "id", &JsValue::from_f64(*id as f64));
            Some(d)
        }
        Error::NonFinite(param) => {
            let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
            Some(d)
        }
        Error::OutOfRange { param, min, max, got } => {
            let d = new_obj();
            set_kv(&d, "param", &JsValue::from_str(param));
            set_kv(&d, "min", &JsValue::from_f64(*min));
            set_kv(&d, "max", &JsValue::from_f64(*max));
            set_kv(&d, "got", &JsValue::from_f64(*got));
            Some(d)
        }
        Error::SelfLoop(node) | Error::PortLocked(node) => {
            let d = new_obj(); set_kv(&d, "node", &JsValue::from_f64(*node as f64));
            Some(d)
        }
        Error::LotOutsideBlock(block) | Error::NoGridParams(block) => {
            let d = new_obj(); set_kv(&d, "block", &JsValue::from_f64(*block as f64));
            Some(d)
        }
        Error::LimitExceeded { what, limit } => {
            let d = new_obj();
            set_kv(&d, "what", &JsValue::from_str(what));
            set_kv(&d, "limit", &JsValue::from_f64(*limit as f64));
            Some(d)
        }
        _ => None,
    };
    err(e.code(), e.to_string(), data.map(Into::into))
}

/// `Ok` → `{ ok: true, value }`, `Err` → typed error envelope.
pub fn result<T>(r: quadra::Result<T>, f: impl FnOnce(T) -> JsValue) -> JsValue {
    match r {
        Ok(v) => ok(f(v)),
        Err(e) => from_error(&e),
    }
}
