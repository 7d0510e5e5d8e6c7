pub mod mesh;
pub mod models;
#[cfg(target_arch = "wasm32")]
pub mod renderer;
pub mod scene;
pub mod timing;
