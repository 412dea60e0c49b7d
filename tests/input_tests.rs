// Host-side tests for pure input functions.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod input {
    include!("../src/input.rs");
}

use glam::Vec2;
use input::*;
use sonic_core::{PointerPhase, SurfaceMetrics};

fn rect(left: f32, top: f32, width: f32, height: f32) -> CssRect {
    CssRect { left, top, width, height }
}

#[test]
fn client_point_scales_to_backing_store() {
    // 400x300 css box drawn at 2x device pixel ratio
    let css = rect(10.0, 20.0, 400.0, 300.0);
    let px = client_to_canvas_px(Vec2::new(110.0, 70.0), css, 800, 600).unwrap();
    assert_eq!(px, Vec2::new(200.0, 100.0));
}

#[test]
fn collapsed_element_has_no_mapping() {
    assert!(client_to_canvas_px(Vec2::ZERO, rect(0.0, 0.0, 0.0, 300.0), 800, 600).is_none());
    assert!(client_to_canvas_px(Vec2::ZERO, CssRect::default(), 800, 600).is_none());
}

#[test]
fn canvas_center_is_ndc_origin_both_ways() {
    let metrics = SurfaceMetrics::new(800, 600);
    let ndc = metrics.to_ndc(Vec2::new(400.0, 300.0)).unwrap();
    assert!(ndc.length() < 1e-6);
    assert_eq!(ndc_to_canvas_px(Vec2::ZERO, 800, 600), Vec2::new(400.0, 300.0));
    assert_eq!(ndc_to_canvas_px(Vec2::new(-1.0, 1.0), 800, 600), Vec2::ZERO);
}

#[test]
fn dom_event_types_map_to_phases() {
    assert_eq!(phase_for_event("pointerdown"), Some(PointerPhase::Down));
    assert_eq!(phase_for_event("pointermove"), Some(PointerPhase::Move));
    assert_eq!(phase_for_event("pointerup"), Some(PointerPhase::Up));
    assert_eq!(phase_for_event("pointercancel"), Some(PointerPhase::Up));
    assert_eq!(phase_for_event("click"), Some(PointerPhase::Click));
    assert_eq!(phase_for_event("wheel"), None);
}

#[test]
fn css_colours_clamp_and_round() {
    assert_eq!(css_rgb([1.0, 0.5, 0.0]), "rgb(255, 128, 0)");
    assert_eq!(css_rgb([2.0, -1.0, 0.2]), "rgb(255, 0, 51)");
}
