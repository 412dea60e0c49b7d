use crate::audio::AudioStage;
use crate::constants::{MAIN_SURFACE, MAX_FRAME_DT_SEC};
use crate::dom;
use crate::render::CanvasRenderer;
use instant::Instant;
use sonic_core::{SceneEvent, Session};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct FrameContext {
    pub session: Rc<RefCell<Session>>,
    pub renderer: CanvasRenderer,
    pub audio: Option<AudioStage>,
    pub canvas: web::HtmlCanvasElement,
    pub last_instant: Instant,
}

impl FrameContext {
    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt_sec = (now - self.last_instant).as_secs_f32().min(MAX_FRAME_DT_SEC);
        self.last_instant = now;

        let (w, h) = dom::sync_canvas_backing_size(&self.canvas);
        self.renderer.set_size(w, h);

        let (report, camera, events) = {
            let mut session = self.session.borrow_mut();
            session.resize(MAIN_SURFACE, w, h);
            let report = session.tick(dt_sec, &mut self.renderer);
            (report, session.camera(), session.drain_events())
        };

        if let Some(sync) = &report.sync {
            if sync.failures() > 0 {
                log::warn!("[frame] {} node update(s) failed this tick", sync.failures());
            }
        }
        for event in &events {
            if let SceneEvent::SurfaceResized { key, width, height } = event {
                log::debug!("[frame] surface {} now {}x{}", key, width, height);
            }
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.sync_listener(&camera);
            audio.handle(&events);
        }
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx.borrow_mut().frame();
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let cb = tick.borrow().as_ref().map(|c| c.as_ref().clone());
    let (Some(w), Some(cb)) = (web::window(), cb) else {
        return;
    };
    _ = w.request_animation_frame(cb.unchecked_ref());
}
