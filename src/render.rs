use crate::constants::{BACKGROUND, POLYLINE_WIDTH_PX, SPHERE_OUTLINE_WIDTH_PX};
use crate::input::{css_rgb, ndc_to_canvas_px};
use glam::{Affine3A, Vec2, Vec3};
use sonic_core::{Camera, Renderer, SceneGraph, Shape};
use wasm_bindgen::JsValue;
use web_sys as web;

const CONE_RIM_SEGMENTS: usize = 16;

/// Wireframe Canvas2D view of the reconciled scene. Debug quality only:
/// shapes are projected point by point with no depth sorting.
pub struct CanvasRenderer {
    ctx: web::CanvasRenderingContext2d,
    width: u32,
    height: u32,
}

impl CanvasRenderer {
    pub fn new(ctx: web::CanvasRenderingContext2d) -> Self {
        Self { ctx, width: 1, height: 1 }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn to_px(&self, camera: &Camera, world: Vec3) -> Option<Vec2> {
        camera.project(world).map(|ndc| ndc_to_canvas_px(ndc, self.width, self.height))
    }

    fn stroke_path(&self, camera: &Camera, points: &[Vec3], closed: bool, fill: bool) {
        let projected: Option<Vec<Vec2>> = points.iter().map(|p| self.to_px(camera, *p)).collect();
        let Some(projected) = projected else {
            return;
        };
        let Some((first, rest)) = projected.split_first() else {
            return;
        };
        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            self.ctx.line_to(p.x as f64, p.y as f64);
        }
        if closed {
            self.ctx.close_path();
        }
        if fill {
            self.ctx.fill();
        }
        self.ctx.stroke();
    }

    fn draw_shape(&self, camera: &Camera, world: &Affine3A, shape: &Shape) {
        let at = |x: f32, y: f32, z: f32| world.transform_point3(Vec3::new(x, y, z));
        match shape {
            Shape::Sphere { radius } => {
                let center = world.transform_point3(Vec3::ZERO);
                let forward = (camera.target - camera.eye).normalize_or_zero();
                let right = forward.cross(camera.up).normalize_or_zero();
                let edge = self.to_px(camera, center + right * *radius);
                let (Some(c), Some(edge)) = (self.to_px(camera, center), edge) else {
                    return;
                };
                self.ctx.set_line_width(SPHERE_OUTLINE_WIDTH_PX);
                self.ctx.begin_path();
                let r = c.distance(edge) as f64;
                _ = self.ctx.arc(c.x as f64, c.y as f64, r, 0.0, std::f64::consts::TAU);
                self.ctx.fill();
                self.ctx.stroke();
            }
            Shape::Cone { radius, height } => {
                let apex = at(0.0, -height / 2.0, 0.0);
                let rim: Vec<Vec3> = (0..CONE_RIM_SEGMENTS)
                    .map(|i| {
                        let a = i as f32 / CONE_RIM_SEGMENTS as f32 * std::f32::consts::TAU;
                        at(a.cos() * radius, height / 2.0, a.sin() * radius)
                    })
                    .collect();
                self.stroke_path(camera, &rim, true, false);
                for p in rim.iter().step_by(CONE_RIM_SEGMENTS / 4) {
                    self.stroke_path(camera, &[apex, *p], false, false);
                }
            }
            Shape::Plane { width, depth } => {
                let (w, d) = (width / 2.0, depth / 2.0);
                let corners = [at(-w, 0.0, -d), at(w, 0.0, -d), at(w, 0.0, d), at(-w, 0.0, d)];
                self.stroke_path(camera, &corners, true, true);
            }
            Shape::Quad { width, height } => {
                let (w, h) = (width / 2.0, height / 2.0);
                let corners = [at(-w, -h, 0.0), at(w, -h, 0.0), at(w, h, 0.0), at(-w, h, 0.0)];
                self.stroke_path(camera, &corners, true, true);
            }
            Shape::Polyline { points } => {
                let world_points: Vec<Vec3> =
                    points.iter().map(|p| world.transform_point3(*p)).collect();
                self.ctx.set_line_width(POLYLINE_WIDTH_PX);
                self.stroke_path(camera, &world_points, false, false);
            }
        }
    }
}

impl Renderer for CanvasRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) {
        let (w, h) = (self.width as f64, self.height as f64);
        self.ctx.set_fill_style(&JsValue::from_str(BACKGROUND));
        self.ctx.fill_rect(0.0, 0.0, w, h);

        for id in scene.descendants(scene.root()) {
            let Some(node) = scene.get(id) else {
                continue;
            };
            let (Some(shape), Some(color)) = (node.shape(), node.color()) else {
                continue;
            };
            let css = JsValue::from_str(&css_rgb(color));
            self.ctx.set_stroke_style(&css);
            self.ctx.set_fill_style(&JsValue::from_str(&css_rgb(color.map(|c| c * 0.35))));
            self.ctx.set_line_width(1.0);
            self.draw_shape(camera, &scene.world_transform(id), shape);
        }
    }
}
