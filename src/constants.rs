// Page wiring: element ids and the surface name the canvas registers under.

pub const CANVAS_ID: &str = "app-canvas";
pub const MAIN_SURFACE: &str = "main";

// Toolbar buttons
pub const ADD_OBJECT_BUTTON: &str = "add-object";
pub const ADD_CONE_BUTTON: &str = "add-cone";
pub const DELETE_BUTTON: &str = "delete";
pub const VIEW_TOGGLE_BUTTON: &str = "view-toggle";

// Key bindings (matched case-insensitively for letters)
pub const KEY_ADD_OBJECT: &str = "a";
pub const KEY_ADD_CONE: &str = "c";
pub const KEY_TOGGLE_VIEW: &str = "v";
pub const KEYS_DELETE: [&str; 2] = ["Delete", "Backspace"];
pub const KEY_ESCAPE: &str = "Escape";

// Canvas2D debug renderer
pub const BACKGROUND: &str = "#111318";
pub const POLYLINE_WIDTH_PX: f64 = 2.0;
pub const SPHERE_OUTLINE_WIDTH_PX: f64 = 1.5;

// Frame pacing: dt is clamped so a backgrounded tab doesn't jump transitions
pub const MAX_FRAME_DT_SEC: f32 = 0.1;
