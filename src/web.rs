use crate::engine::models::Model;
use crate::engine::renderer::{Frame, Renderer};
use crate::error::GameError;
use crate::game::config::ModelConfig;
use crate::game::{AppConfig, Game, Key};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, HtmlCanvasElement, KeyboardEvent, MouseEvent, Request, RequestInit, RequestMode, Response,
    WebGlRenderingContext, Window,
};

const CONFIG_PATH: &str = "/assets/config.json";
/// Radians of orbit per pixel of mouse drag.
const ORBIT_SENSITIVITY: f32 = 0.005;

struct App {
    game: Game,
    renderer: Renderer,
}

thread_local! {
    static APP: RefCell<Option<App>> = RefCell::new(None);
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn with_game(f: impl FnOnce(&mut Game)) {
    APP.with(|app| {
        if let Some(app) = app.borrow_mut().as_mut() {
            f(&mut app.game);
        }
    });
}

#[wasm_bindgen]
pub async fn init_game() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or(GameError::MissingReference("window"))?;
    let document = window.document().ok_or(GameError::MissingReference("document"))?;
    let canvas = document
        .get_element_by_id("canvas")
        .ok_or(GameError::MissingReference("canvas"))?
        .dyn_into::<HtmlCanvasElement>()?;

    let gl = canvas
        .get_context("webgl")?
        .ok_or("No WebGL")?
        .dyn_into::<WebGlRenderingContext>()?;

    let renderer = Renderer::new(gl)?;
    let config = fetch_config(&window).await;

    let game = Game::new(config.clone(), SmallRng::from_entropy(), now_ms());
    APP.with(|app| *app.borrow_mut() = Some(App { game, renderer }));

    for model in config.models {
        wasm_bindgen_futures::spawn_local(load_model(model));
    }

    register_input(&window, &canvas)?;

    // Game loop
    let f = Rc::new(RefCell::new(None));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        APP.with(|app| {
            if let Some(app) = app.borrow_mut().as_mut() {
                app.frame(now_ms());
            }
        });
        if let Some(callback) = f.borrow().as_ref() {
            request_animation_frame(callback);
        }
    }) as Box<dyn FnMut()>));

    if let Some(callback) = g.borrow().as_ref() {
        request_animation_frame(callback);
    }

    Ok(())
}

impl App {
    fn frame(&mut self, now: f64) {
        let game = &mut self.game;
        game.loading.poll(now);
        if !game.is_wired() && game.loading.is_complete() {
            game.wire(now);
        }
        game.update(now);

        let camera = game.minigame.camera();
        let palette = &game.palette;
        let frame = Frame {
            eye: camera.position(),
            target: camera.target(),
            scroll: game.scroll.offset(),
            sky: shade(palette.violet, 0.2),
            terrain: shade(palette.violet, 0.35),
            terrain_grid: palette.aqua,
            road: shade(palette.pink, 0.3),
            road_grid: palette.yellow,
        };
        if let Err(e) = self.renderer.draw_scene(&game.scene, &game.models, &frame) {
            log::error!("Render failed: {:?}", e);
        }

        update_ui(game);
    }
}

fn shade((r, g, b): (f32, f32, f32), factor: f32) -> (f32, f32, f32) {
    (r * factor, g * factor, b * factor)
}

fn register_input(window: &Window, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let keydown = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        let Some(key) = Key::from_code(&event.key()) else {
            return;
        };
        event.prevent_default();
        // Repeats are dropped so hold time accumulates instead of restarting
        // at base speed on every repeat.
        if event.repeat() {
            return;
        }
        with_game(|game| game.key_down(key, now_ms()));
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
    keydown.forget();

    let keyup = Closure::wrap(Box::new(move |event: KeyboardEvent| {
        if let Some(key) = Key::from_code(&event.key()) {
            with_game(|game| game.key_up(key));
        }
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
    keyup.forget();

    let drag = Closure::wrap(Box::new(move |event: MouseEvent| {
        if event.buttons() & 1 == 0 {
            return;
        }
        let yaw = -(event.movement_x() as f32) * ORBIT_SENSITIVITY;
        with_game(|game| game.minigame.camera_mut().orbit(yaw));
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("mousemove", drag.as_ref().unchecked_ref())?;
    drag.forget();

    Ok(())
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.request_animation_frame(f.as_ref().unchecked_ref()) {
        log::error!("requestAnimationFrame failed: {:?}", e);
    }
}

async fn fetch(window: &Window, path: &str) -> Result<Response, JsValue> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(path, &opts)?;
    let resp: Response = JsFuture::from(window.fetch_with_request(&request)).await?.dyn_into()?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!("HTTP {} for {}", resp.status(), path)));
    }
    Ok(resp)
}

async fn fetch_config(window: &Window) -> AppConfig {
    let json = match fetch(window, CONFIG_PATH).await {
        Ok(resp) => match resp.json() {
            Ok(promise) => JsFuture::from(promise).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    match json.map(serde_wasm_bindgen::from_value::<AppConfig>) {
        Ok(Ok(config)) => config,
        Ok(Err(e)) => {
            log::warn!("Invalid {}, using defaults: {}", CONFIG_PATH, e);
            AppConfig::default()
        }
        Err(e) => {
            log::warn!("No {}, using defaults: {:?}", CONFIG_PATH, e);
            AppConfig::default()
        }
    }
}

async fn fetch_bytes(window: &Window, path: &str) -> Result<Vec<u8>, JsValue> {
    let resp = fetch(window, path).await?;
    let buffer = JsFuture::from(resp.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Tries each candidate path in order until one parses.
async fn fetch_model(model: &ModelConfig) -> Result<Model, GameError> {
    let window = web_sys::window().ok_or(GameError::MissingReference("window"))?;
    let mut last_error = GameError::load(&model.key, "no candidate paths");
    for path in &model.paths {
        match fetch_bytes(&window, path).await {
            Ok(bytes) => match Model::from_gltf(&bytes, model.color, model.wire_color) {
                Ok(loaded) => {
                    log::info!("Loaded {} from {}", model.key, path);
                    return Ok(loaded);
                }
                Err(e) => last_error = e,
            },
            Err(e) => {
                log::warn!("Failed to fetch {}, trying next path", path);
                last_error = GameError::load(&model.key, format!("{:?}", e));
            }
        }
    }
    Err(last_error)
}

async fn load_model(model: ModelConfig) {
    let result = fetch_model(&model).await;
    with_game(|game| game.on_model_loaded(&model.key, result, now_ms()));
}

fn update_ui(game: &Game) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let hud = game.minigame.hud();

    set_html(&document, "loading-status", game.loading.status());
    set_html(&document, "loading-progress", &game.loading.progress_bar());
    set_visible(&document, "loader", !game.loading.is_complete());

    match hud.overlay_text() {
        Some(text) => {
            set_html(&document, "minigame-overlay", &text);
            set_visible(&document, "minigame-overlay", true);
        }
        None => set_visible(&document, "minigame-overlay", false),
    }
    set_visible(&document, "minigame-instructions", hud.instructions_visible());
    set_visible(&document, "minigame-escape", hud.escape_hint_visible());
    set_visible(&document, "gui", hud.gui_visible());
}

fn set_html(document: &Document, id: &str, html: &str) {
    if let Some(el) = document.get_element_by_id(id) {
        el.set_inner_html(html);
    }
}

fn set_visible(document: &Document, id: &str, visible: bool) {
    if let Some(el) = document.get_element_by_id(id) {
        let style = if visible { "display: block;" } else { "display: none;" };
        el.set_attribute("style", style).ok();
    }
}

#[wasm_bindgen]
pub fn set_palm_density(multiplier: f64) {
    with_game(|game| game.set_palm_density(multiplier));
}

#[wasm_bindgen]
pub fn set_rock_density(multiplier: f64) {
    with_game(|game| game.set_rock_density(multiplier));
}

#[wasm_bindgen]
pub fn set_palm_visibility(show_main: bool, show_wireframe: bool) {
    with_game(|game| game.set_palm_visibility(show_main, show_wireframe));
}

#[wasm_bindgen]
pub fn set_rock_visibility(show_main: bool, show_wireframe: bool) {
    with_game(|game| game.set_rock_visibility(show_main, show_wireframe));
}

#[wasm_bindgen]
pub fn set_wheel_visibility(show_main: bool, show_wireframe: bool) {
    with_game(|game| game.set_wheel_visibility(show_main, show_wireframe));
}
