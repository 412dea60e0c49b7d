use glam::Vec2;
use sonic_core::PointerPhase;

/// Bounding rect of an element in CSS pixels, as reported by the DOM.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct CssRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert client (CSS) coordinates into canvas backing-store pixels.
///
/// The backing store is usually `css * devicePixelRatio`; scaling by the
/// rect keeps the mapping right for any ratio. `None` when the element
/// has no layout box.
#[inline]
pub fn client_to_canvas_px(
    client: Vec2,
    rect: CssRect,
    canvas_width: u32,
    canvas_height: u32,
) -> Option<Vec2> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let x_css = client.x - rect.left;
    let y_css = client.y - rect.top;
    let sx = (x_css / rect.width) * canvas_width as f32;
    let sy = (y_css / rect.height) * canvas_height as f32;
    Some(Vec2::new(sx, sy))
}

/// DOM pointer event type to gesture phase.
#[inline]
pub fn phase_for_event(event_type: &str) -> Option<PointerPhase> {
    match event_type {
        "pointerdown" => Some(PointerPhase::Down),
        "pointermove" => Some(PointerPhase::Move),
        "pointerup" | "pointercancel" => Some(PointerPhase::Up),
        "click" => Some(PointerPhase::Click),
        _ => None,
    }
}

/// Map ndc back to canvas pixels, for drawing projected points.
#[inline]
pub fn ndc_to_canvas_px(ndc: Vec2, canvas_width: u32, canvas_height: u32) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * canvas_width as f32,
        (1.0 - ndc.y) * 0.5 * canvas_height as f32,
    )
}

/// CSS colour string for a linear `[r, g, b]` in 0..1.
#[inline]
pub fn css_rgb(color: [f32; 3]) -> String {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("rgb({}, {}, {})", c(color[0]), c(color[1]), c(color[2]))
}
