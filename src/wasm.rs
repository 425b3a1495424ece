//! Browser bindings
//!
//! The host page owns the render loop and the WebGL/WebGPU side; it drives
//! the simulation through [`SwarmHandle`] and uploads the instance buffers
//! as raw bytes.

use wasm_bindgen::prelude::*;

use crate::settings::{Properties, Theme};
use crate::sim::BlocksManager;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger already installed by another module instance
        return;
    }
    log::info!("Block Swarm wasm module loaded");
}

fn to_js_error(err: crate::SwarmError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct SwarmHandle {
    manager: BlocksManager,
}

#[wasm_bindgen]
impl SwarmHandle {
    /// `theme` is "light" or "dark"; anything else falls back to dark
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, theme: &str) -> SwarmHandle {
        let theme = Theme::from_str(theme).unwrap_or_default();
        Self {
            manager: BlocksManager::new(seed, Properties::from_theme(theme)),
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.manager.update(dt);
    }

    /// Host intent, e.g. `set_animation_state("success2", false)`
    pub fn set_animation_state(&mut self, name: &str, flag: bool) -> Result<(), JsValue> {
        self.manager.set(name, flag).map_err(to_js_error)
    }

    /// JSON array of `{ "property": ..., "value": ... }` overrides
    pub fn set_properties(&mut self, json: &str) -> Result<(), JsValue> {
        self.manager.set_properties(json).map_err(to_js_error)
    }

    pub fn set_theme(&mut self, theme: &str) {
        let theme = Theme::from_str(theme).unwrap_or_default();
        self.manager.ctx.properties.apply_theme(theme);
    }

    /// Current properties as JSON
    pub fn properties(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.manager.ctx.properties)
            .map_err(|e| to_js_error(e.into()))
    }

    pub fn status(&self) -> String {
        format!("{:?}", self.manager.status())
    }

    pub fn result(&self) -> String {
        format!("{:?}", self.manager.result())
    }

    /// False until the host sends `showVisual`
    pub fn is_visible(&self) -> bool {
        self.manager.is_visible()
    }

    pub fn cycle_index(&self) -> u64 {
        self.manager.cycle_index()
    }

    pub fn tile_count(&self) -> usize {
        self.manager.grid.tiles.len()
    }

    pub fn block_count(&self) -> usize {
        self.manager.live_count()
    }

    /// Packed `TileInstance` records
    pub fn tile_buffer(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.manager.tile_instances()).to_vec()
    }

    /// Packed `BlockInstance` records
    pub fn block_buffer(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.manager.block_instances()).to_vec()
    }

    /// Result animation sub-ratios, in the order
    /// `[complete spawn, floating, push down, stop push down, hide, error shake, fail colour, fall]`
    pub fn animation_ratios(&self) -> Vec<f32> {
        let complete = &self.manager.complete_animation;
        let stop = &self.manager.stop_animation;
        let error = &self.manager.error_animation;
        vec![
            complete.spawn_ratio,
            complete.floating_cubes_ratio,
            complete.push_down_ratio,
            stop.push_down_ratio,
            stop.hide_ratio,
            error.shake_ratio,
            error.fail_color_ratio,
            error.fall_ratio,
        ]
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.manager.snapshot()).map_err(|e| to_js_error(e.into()))
    }
}
