use crate::constants::{KEYS_DELETE, KEY_ADD_CONE, KEY_ADD_OBJECT, KEY_ESCAPE, KEY_TOGGLE_VIEW};
use sonic_core::UiCommand;

/// Map a `KeyboardEvent.key` value to an editor command.
#[inline]
pub fn ui_command_for_key(key: &str) -> Option<UiCommand> {
    if key == KEY_ESCAPE {
        return Some(UiCommand::Escape);
    }
    if KEYS_DELETE.contains(&key) {
        return Some(UiCommand::DeleteSelected);
    }
    let lower = key.to_ascii_lowercase();
    match lower.as_str() {
        k if k == KEY_ADD_OBJECT => Some(UiCommand::AddObject),
        k if k == KEY_ADD_CONE => Some(UiCommand::AddCone),
        k if k == KEY_TOGGLE_VIEW => Some(UiCommand::ToggleView),
        _ => None,
    }
}

/// Keys we act on should not also scroll the page or navigate back.
#[inline]
pub fn should_prevent_default(key: &str) -> bool {
    KEYS_DELETE.contains(&key)
}
