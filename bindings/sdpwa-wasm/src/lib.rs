mod wire;

pub use wire::{WireConfig, WireEvent};

use sdpwa::{Aggregator, SdpwaError};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

fn map_core(err: SdpwaError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn map_serialize(err: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WasmAggregator {
    inner: Aggregator,
}

#[wasm_bindgen]
impl WasmAggregator {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, seed: &[u8]) -> Result<WasmAggregator, JsValue> {
        let config: WireConfig = from_value(config)?;
        let inner = Aggregator::new(config.into(), seed).map_err(map_core)?;
        Ok(WasmAggregator { inner })
    }

    #[wasm_bindgen]
    pub fn ingest(&mut self, event: JsValue) -> Result<JsValue, JsValue> {
        let event: WireEvent = from_value(event)?;
        let admission = self.inner.ingest(event.into()).map_err(map_core)?;
        to_value(&admission).map_err(map_serialize)
    }

    #[wasm_bindgen]
    pub fn release(&mut self, up_to_ms: i64) -> Result<JsValue, JsValue> {
        let snapshots = self.inner.release(up_to_ms).map_err(map_core)?;
        to_value(&snapshots).map_err(map_serialize)
    }

    #[wasm_bindgen]
    pub fn ledger(&self) -> Result<JsValue, JsValue> {
        to_value(&self.inner.ledger()).map_err(map_serialize)
    }

    #[wasm_bindgen(js_name = widenTargetDelta)]
    pub fn widen_target_delta(&mut self, new_target: f64) -> Result<(), JsValue> {
        self.inner.widen_target_delta(new_target).map_err(map_core)
    }

    #[wasm_bindgen(js_name = openWindowCount)]
    pub fn open_window_count(&self) -> u32 {
        self.inner.open_window_count() as u32
    }
}
