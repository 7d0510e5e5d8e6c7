pub mod engine;
pub mod error;
pub mod game;
#[cfg(target_arch = "wasm32")]
mod web;

pub use error::GameError;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Runs when the module loads, before `init_game` is called from JS.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger was already initialized".into());
    }
    log::info!("Polonez drive module loaded");
}
