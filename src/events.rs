use crate::constants::{
    ADD_CONE_BUTTON, ADD_OBJECT_BUTTON, DELETE_BUTTON, MAIN_SURFACE, VIEW_TOGGLE_BUTTON,
};
use crate::dom;
use crate::input;
use crate::keymap;
use glam::Vec2;
use sonic_core::{Session, UiCommand};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub session: Rc<RefCell<Session>>,
    pub audio_ctx: Option<web::AudioContext>,
}

const POINTER_EVENTS: [&str; 5] = [
    "pointerdown",
    "pointermove",
    "pointerup",
    "pointercancel",
    "click",
];

fn handle_pointer(
    ev: &web::MouseEvent,
    canvas: &web::HtmlCanvasElement,
    session: &Rc<RefCell<Session>>,
) {
    let Some(phase) = input::phase_for_event(&ev.type_()) else {
        return;
    };
    let client = Vec2::new(ev.client_x() as f32, ev.client_y() as f32);
    let rect = dom::css_rect(canvas);
    let Some(px) = input::client_to_canvas_px(client, rect, canvas.width(), canvas.height()) else {
        return;
    };
    let pointer = ev
        .dyn_ref::<web::PointerEvent>()
        .map_or(0, |p| p.pointer_id().max(0) as u32);
    if ev.type_() == "pointerdown" {
        _ = canvas.set_pointer_capture(pointer as i32);
    }
    // A handler may re-enter the session (e.g. a nested dispatch); drop the event then.
    let Ok(mut session) = session.try_borrow_mut() else {
        log::debug!("[input] session busy, dropped {}", ev.type_());
        return;
    };
    session.pointer(MAIN_SURFACE, pointer, phase, px);
}

pub fn wire_input_handlers(w: InputWiring) {
    for name in POINTER_EVENTS {
        let canvas = w.canvas.clone();
        let session = w.session.clone();
        let audio_ctx = w.audio_ctx.clone();
        let closure = Closure::wrap(Box::new(move |ev: web::MouseEvent| {
            if ev.type_() == "pointerdown" {
                if let Some(ctx) = &audio_ctx {
                    _ = ctx.resume();
                }
            }
            handle_pointer(&ev, &canvas, &session);
        }) as Box<dyn FnMut(_)>);
        _ = w
            .canvas
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

fn run_ui(session: &Rc<RefCell<Session>>, command: UiCommand) {
    log::info!("[ui] {:?}", command);
    match session.try_borrow_mut() {
        Ok(mut s) => s.ui(command),
        Err(_) => log::debug!("[ui] session busy, dropped {:?}", command),
    }
}

pub fn wire_global_keydown(session: Rc<RefCell<Session>>) {
    let Some(window) = web::window() else {
        return;
    };
    let closure = Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
        let key = ev.key();
        let Some(command) = keymap::ui_command_for_key(&key) else {
            return;
        };
        if keymap::should_prevent_default(&key) {
            ev.prevent_default();
        }
        run_ui(&session, command);
    }) as Box<dyn FnMut(_)>);
    _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
    closure.forget();
}

pub fn wire_toolbar(document: &web::Document, session: &Rc<RefCell<Session>>) {
    let buttons = [
        (ADD_OBJECT_BUTTON, UiCommand::AddObject),
        (ADD_CONE_BUTTON, UiCommand::AddCone),
        (DELETE_BUTTON, UiCommand::DeleteSelected),
        (VIEW_TOGGLE_BUTTON, UiCommand::ToggleView),
    ];
    for (id, command) in buttons {
        let session = session.clone();
        dom::add_click_listener(document, id, move || run_ui(&session, command));
    }
}

pub fn wire_canvas_resize(canvas: &web::HtmlCanvasElement, session: &Rc<RefCell<Session>>) {
    let resize = |canvas: &web::HtmlCanvasElement, session: &Rc<RefCell<Session>>| {
        let (w, h) = dom::sync_canvas_backing_size(canvas);
        if let Ok(mut s) = session.try_borrow_mut() {
            s.resize(MAIN_SURFACE, w, h);
        }
    };
    resize(canvas, session);
    let canvas_resize = canvas.clone();
    let session_resize = session.clone();
    let closure = Closure::wrap(
        Box::new(move || resize(&canvas_resize, &session_resize)) as Box<dyn FnMut()>
    );
    if let Some(window) = web::window() {
        _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}
