use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

#[wasm_bindgen]
pub struct Topology { pub(crate) inner: quadra::Topology }

impl Topology {
    pub fn rs_new() -> Topology { Topology { inner: quadra::Topology::new() } }
    pub fn rs_with_config(config: quadra::KernelConfig) -> Topology { Topology { inner: quadra::Topology::with_config(config) } }
    pub fn rs_version(&self) -> u64 { self.inner.version() }
    pub fn rs_inner(&self) -> &quadra::Topology { &self.inner }
}
