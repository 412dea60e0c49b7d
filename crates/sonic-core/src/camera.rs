//! Camera description and the rig that moves it between views.

use crate::constants::{
    CAMERA_DISTANCE, CAMERA_FOVY_RADIANS, CAMERA_PITCH_MAX, CAMERA_PITCH_MIN, CAMERA_PITCH_RADIANS,
    CAMERA_ZFAR, CAMERA_ZNEAR, ORBIT_RADIANS_PER_NDC, TRANSITION_SECS,
};
use crate::picking::Ray;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point given in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_projection().inverse();
        let p_far = inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let far: Vec3 = p_far.truncate() / p_far.w;
        Ray::new(self.eye, far - self.eye)
    }

    /// Project a world point to ndc. `None` when the point is behind the eye.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * world.extend(1.0);
        (clip.w > 0.0).then(|| Vec2::new(clip.x / clip.w, clip.y / clip.w))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraView {
    Perspective,
    TopDown,
}

#[derive(Clone, Debug)]
struct Transition {
    from: Camera,
    to: CameraView,
    elapsed: f32,
}

/// Orbiting camera with an animated switch between perspective and top-down views.
///
/// A view request arriving mid-transition starts a new transition from the
/// current interpolated pose; the newest request always wins.
#[derive(Clone, Debug)]
pub struct CameraRig {
    view: CameraView,
    transition: Option<Transition>,
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    aspect: f32,
    duration: f32,
}

impl CameraRig {
    pub fn new(aspect: f32) -> Self {
        Self {
            view: CameraView::Perspective,
            transition: None,
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: CAMERA_PITCH_RADIANS,
            distance: CAMERA_DISTANCE,
            aspect: aspect.max(1e-3),
            duration: TRANSITION_SECS,
        }
    }

    /// Length of a view transition. Zero switches views on the next tick.
    pub fn with_transition_secs(mut self, secs: f32) -> Self {
        self.duration = secs.max(0.0);
        self
    }

    /// Jump straight to `view` with no transition.
    pub fn snap_to(&mut self, view: CameraView) {
        self.transition = None;
        self.view = view;
    }

    /// View the rig is in, or heading to while a transition runs.
    pub fn view(&self) -> CameraView {
        self.transition.as_ref().map_or(self.view, |t| t.to)
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// True only once the top-down view has fully settled.
    pub fn is_top_down(&self) -> bool {
        self.transition.is_none() && self.view == CameraView::TopDown
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(1e-3);
        if let Some(t) = self.transition.as_mut() {
            t.from.aspect = self.aspect;
        }
    }

    /// Returns false when the request is already satisfied.
    pub fn request(&mut self, view: CameraView) -> bool {
        if self.view() == view {
            return false;
        }
        let from = self.camera();
        log::info!("[camera] transition to {:?}", view);
        self.transition = Some(Transition { from, to: view, elapsed: 0.0 });
        true
    }

    /// Advance a running transition. Returns true when the pose changed.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(t) = self.transition.as_mut() else {
            return false;
        };
        t.elapsed += dt.max(0.0);
        if t.elapsed >= self.duration {
            self.view = t.to;
            self.transition = None;
            log::debug!("[camera] settled in {:?}", self.view);
        }
        true
    }

    /// Orbit around the target. Ignored unless settled in perspective.
    pub fn orbit(&mut self, ndc_delta: Vec2) {
        if self.transition.is_some() || self.view != CameraView::Perspective {
            return;
        }
        self.yaw -= ndc_delta.x * ORBIT_RADIANS_PER_NDC;
        let pitch = self.pitch - ndc_delta.y * ORBIT_RADIANS_PER_NDC;
        self.pitch = pitch.clamp(CAMERA_PITCH_MIN, CAMERA_PITCH_MAX);
    }

    /// Slide the target across the floor. Ignored unless settled top-down.
    pub fn pan(&mut self, world_delta: Vec3) {
        if !self.is_top_down() {
            return;
        }
        self.target += Vec3::new(world_delta.x, 0.0, world_delta.z);
    }

    pub fn camera(&self) -> Camera {
        let settled = self.pose(self.view());
        let Some(t) = &self.transition else {
            return settled;
        };
        let s = if self.duration > 0.0 {
            (t.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let s = s * s * (3.0 - 2.0 * s);
        let up = t.from.up.lerp(settled.up, s);
        Camera {
            eye: t.from.eye.lerp(settled.eye, s),
            target: t.from.target.lerp(settled.target, s),
            up: if up.length_squared() > 1e-8 { up.normalize() } else { settled.up },
            ..settled
        }
    }

    fn pose(&self, view: CameraView) -> Camera {
        let horizontal = Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos());
        let (eye, up) = match view {
            CameraView::Perspective => {
                let offset = horizontal * self.pitch.cos() + Vec3::Y * self.pitch.sin();
                (self.target + offset * self.distance, Vec3::Y)
            }
            // looking straight down: "up" on screen is the horizontal forward direction
            CameraView::TopDown => (self.target + Vec3::Y * self.distance * 1.5, -horizontal),
        };
        Camera {
            eye,
            target: self.target,
            up,
            aspect: self.aspect,
            fovy_radians: CAMERA_FOVY_RADIANS,
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
        }
    }
}
