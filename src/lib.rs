#![cfg(target_arch = "wasm32")]
use instant::Instant;
use sonic_core::{ResourcePool, Session, SessionConfig};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod audio;
mod constants;
mod dom;
mod events;
mod frame;
mod input;
mod keymap;
mod render;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("sonic-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas = dom::canvas_by_id(&document, constants::CANVAS_ID)?;
    let ctx2d = dom::context_2d(&canvas)?;

    let config = SessionConfig {
        surfaces: vec![constants::MAIN_SURFACE],
        ..SessionConfig::default()
    };
    let session = Rc::new(RefCell::new(Session::new(config, Box::new(ResourcePool::new()))));

    // Audio is optional: the editor still works without a context.
    let audio = match audio::AudioStage::new() {
        Ok(a) => Some(a),
        Err(e) => {
            log::warn!("[audio] disabled: {:?}", e);
            None
        }
    };

    events::wire_canvas_resize(&canvas, &session);
    events::wire_input_handlers(events::InputWiring {
        canvas: canvas.clone(),
        session: session.clone(),
        audio_ctx: audio.as_ref().map(|a| a.context().clone()),
    });
    events::wire_global_keydown(session.clone());
    events::wire_toolbar(&document, &session);

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        session,
        renderer: render::CanvasRenderer::new(ctx2d),
        audio,
        canvas,
        last_instant: Instant::now(),
    }));
    frame::start_loop(frame_ctx);
    log::info!("[init] ready");
    Ok(())
}
