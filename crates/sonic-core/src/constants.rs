use glam::Vec3;

// Shared tuning constants for the scene, picking and camera.

// Target groups
pub const FLOOR_GROUP: &str = "floor";
pub const OBJECTS_GROUP: &str = "sound_objects";

// Scene containers (children of the scene root)
pub const ROOM_CONTAINER: &str = "room";
pub const OBJECTS_CONTAINER: &str = "objects";
pub const TRAJECTORIES_CONTAINER: &str = "trajectories";
pub const CAMERAS_CONTAINER: &str = "cameras";
pub const SURFACES_CONTAINER: &str = "surfaces";
pub const CONES_CONTAINER: &str = "cones";

// Room
pub const FLOOR_WIDTH: f32 = 20.0;
pub const FLOOR_DEPTH: f32 = 20.0;

// Sound objects
pub const OBJECT_RADIUS: f32 = 0.5;
pub const CONE_HEIGHT: f32 = 1.2;
pub const CONE_SPREAD_RADIANS: f32 = std::f32::consts::FRAC_PI_4;
pub const CONE_SPREAD_MAX_RADIANS: f32 = 179.0 * std::f32::consts::PI / 180.0;
pub const CONE_DEFAULT_AIM: [f32; 3] = [0.0, 0.0, 1.0]; // object-local direction of a new cone

// Palette
pub const OBJECT_COLOR: [f32; 3] = [0.35, 0.55, 0.9];
pub const OBJECT_SELECTED_COLOR: [f32; 3] = [0.95, 0.75, 0.2];
pub const CONE_COLOR: [f32; 3] = [0.4, 0.8, 0.6];
pub const CONE_SELECTED_COLOR: [f32; 3] = [0.95, 0.45, 0.3];
pub const FLOOR_COLOR: [f32; 3] = [0.18, 0.18, 0.2];
pub const SCREEN_COLOR: [f32; 3] = [0.8, 0.8, 0.85];
pub const TRAJECTORY_COLOR: [f32; 3] = [0.6, 0.6, 0.6];

// Camera
pub const CAMERA_FOVY_RADIANS: f32 = std::f32::consts::FRAC_PI_4;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 200.0;
pub const CAMERA_DISTANCE: f32 = 14.0;
pub const CAMERA_PITCH_RADIANS: f32 = 0.5;
pub const CAMERA_PITCH_MIN: f32 = 0.05;
pub const CAMERA_PITCH_MAX: f32 = 1.5;
pub const ORBIT_RADIANS_PER_NDC: f32 = 1.5; // full ndc sweep (2 units) ~ 3 radians
pub const TRANSITION_SECS: f32 = 0.6;

// Geometry tolerances
pub const RAY_EPSILON: f32 = 1e-6;

#[inline]
pub fn cone_default_aim() -> Vec3 {
    Vec3::from(CONE_DEFAULT_AIM)
}
