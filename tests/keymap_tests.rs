// Host-side tests for the key bindings.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}
mod keymap {
    include!("../src/keymap.rs");
}

use keymap::*;
use sonic_core::UiCommand;

#[test]
fn letters_map_regardless_of_case() {
    assert_eq!(ui_command_for_key("a"), Some(UiCommand::AddObject));
    assert_eq!(ui_command_for_key("A"), Some(UiCommand::AddObject));
    assert_eq!(ui_command_for_key("c"), Some(UiCommand::AddCone));
    assert_eq!(ui_command_for_key("V"), Some(UiCommand::ToggleView));
}

#[test]
fn delete_and_backspace_delete_the_selection() {
    assert_eq!(ui_command_for_key("Delete"), Some(UiCommand::DeleteSelected));
    assert_eq!(ui_command_for_key("Backspace"), Some(UiCommand::DeleteSelected));
    assert!(should_prevent_default("Backspace"));
    assert!(!should_prevent_default("a"));
}

#[test]
fn escape_is_exact() {
    assert_eq!(ui_command_for_key("Escape"), Some(UiCommand::Escape));
    assert_eq!(ui_command_for_key("escape"), None);
}

#[test]
fn unbound_keys_are_ignored() {
    for key in ["b", "Enter", " ", "ArrowUp", "1", ""] {
        assert_eq!(ui_command_for_key(key), None, "{key:?}");
    }
}
