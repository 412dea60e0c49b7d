//! Application model: plain data describing the desired scene.
//!
//! The model is never mutated by the scene side. Commands are folded into it
//! with [`Model::apply`], which consumes one snapshot and returns the next.

use crate::camera::CameraView;
use crate::constants::{
    cone_default_aim, CONE_HEIGHT, CONE_SPREAD_MAX_RADIANS, CONE_SPREAD_RADIANS, FLOOR_DEPTH,
    FLOOR_WIDTH, OBJECT_RADIUS,
};
use crate::keyed::{Key, Keyed};
use glam::{Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_3;

/// Directional emission cone attached to a sound object.
#[derive(Clone, Debug, PartialEq)]
pub struct Cone {
    pub key: Key,
    /// Point the cone opens toward, in the owning object's local frame.
    pub aim: Vec3,
    pub height: f32,
    /// Full opening angle in radians.
    pub spread: f32,
    pub file: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoundObject {
    pub key: Key,
    pub position: Vec3,
    pub radius: f32,
    pub cones: Keyed<Cone>,
    pub trajectory: Vec<Vec3>,
}

impl SoundObject {
    pub fn new(key: Key, position: Vec3) -> Self {
        Self {
            key,
            position,
            radius: OBJECT_RADIUS,
            cones: Keyed::new(),
            trajectory: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Floor {
    pub width: f32,
    pub depth: f32,
}

impl Default for Floor {
    fn default() -> Self {
        Self {
            width: FLOOR_WIDTH,
            depth: FLOOR_DEPTH,
        }
    }
}

/// Flat panel standing in the room (projection screen, wall marker).
#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    pub key: Key,
    pub position: Vec3,
    pub look_at: Vec3,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub object: Option<Key>,
    pub cone: Option<Key>,
}

impl Selection {
    pub fn object(key: Key) -> Self {
        Self {
            object: Some(key),
            cone: None,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub objects: Keyed<SoundObject>,
    pub screens: Keyed<Screen>,
    pub floor: Floor,
    pub selection: Selection,
}

impl Default for Model {
    fn default() -> Self {
        let floor = Floor::default();
        let screen = Screen {
            key: 1,
            position: Vec3::new(0.0, 2.0, -floor.depth * 0.5),
            look_at: Vec3::new(0.0, 2.0, 0.0),
            width: 6.0,
            height: 3.0,
        };
        Self {
            objects: Keyed::new(),
            screens: [(screen.key, screen)].into_iter().collect(),
            floor,
            selection: Selection::none(),
        }
    }
}

/// Semantic commands produced by the interaction layer.
///
/// Camera variants are routed to the camera rig and leave the model untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Select(Selection),
    AddObject { position: Vec3 },
    MoveObject { key: Key, position: Vec3 },
    DeleteObject { key: Key },
    AddCone { object: Key },
    DeleteCone { object: Key, cone: Key },
    AimCone { object: Key, cone: Key, aim: Vec3 },
    SetConeFile { object: Key, cone: Key, file: Option<String> },
    SetTrajectory { object: Key, points: Vec<Vec3> },
    RequestView(CameraView),
    OrbitCamera(Vec2),
    PanCamera(Vec3),
}

impl Command {
    pub fn is_camera(&self) -> bool {
        matches!(
            self,
            Command::RequestView(_) | Command::OrbitCamera(_) | Command::PanCamera(_)
        )
    }
}

impl Model {
    pub fn empty() -> Self {
        Self {
            screens: Keyed::new(),
            ..Self::default()
        }
    }

    pub fn object(&self, key: Key) -> Option<&SoundObject> {
        self.objects.get(key)
    }

    pub fn is_selected(&self, key: Key) -> bool {
        self.selection.object == Some(key)
    }

    /// Fold one command into the model, producing the next snapshot.
    pub fn apply(mut self, command: &Command) -> Model {
        match command {
            Command::Select(selection) => {
                self.selection = match selection.object {
                    Some(k) if self.objects.contains(k) => *selection,
                    _ => Selection::none(),
                };
            }
            Command::AddObject { position } => match self.objects.next_key() {
                Ok(key) => {
                    self.objects.insert(key, SoundObject::new(key, *position));
                    self.selection = Selection::object(key);
                    log::info!(
                        "[model] added object {} at ({:.2},{:.2},{:.2})",
                        key,
                        position.x,
                        position.y,
                        position.z
                    );
                }
                Err(e) => log::warn!("[model] object not added: {}", e),
            },
            Command::MoveObject { key, position } => {
                if let Some(o) = self.objects.get_mut(*key) {
                    o.position = *position;
                }
            }
            Command::DeleteObject { key } => {
                if self.objects.remove(*key).is_some() {
                    log::info!("[model] deleted object {}", key);
                }
                if self.selection.object == Some(*key) {
                    self.selection = Selection::none();
                }
            }
            Command::AddCone { object } => {
                let Some(o) = self.objects.get_mut(*object) else {
                    return self;
                };
                match o.cones.next_key() {
                    Ok(key) => {
                        // fan new cones out around the vertical axis
                        let turn = Quat::from_rotation_y(o.cones.len() as f32 * FRAC_PI_3);
                        o.cones.insert(
                            key,
                            Cone {
                                key,
                                aim: turn * cone_default_aim(),
                                height: CONE_HEIGHT,
                                spread: CONE_SPREAD_RADIANS,
                                file: None,
                            },
                        );
                        self.selection = Selection {
                            object: Some(*object),
                            cone: Some(key),
                        };
                    }
                    Err(e) => log::warn!("[model] cone not added to object {}: {}", object, e),
                }
            }
            Command::DeleteCone { object, cone } => {
                if let Some(o) = self.objects.get_mut(*object) {
                    o.cones.remove(*cone);
                }
                if self.selection.object == Some(*object) && self.selection.cone == Some(*cone) {
                    self.selection.cone = None;
                }
            }
            Command::AimCone { object, cone, aim } => {
                if let Some(c) = self.cone_mut(*object, *cone) {
                    c.aim = *aim;
                }
            }
            Command::SetConeFile { object, cone, file } => {
                if let Some(c) = self.cone_mut(*object, *cone) {
                    c.file = file.clone();
                }
            }
            Command::SetTrajectory { object, points } => {
                if let Some(o) = self.objects.get_mut(*object) {
                    o.trajectory = points.clone();
                }
            }
            Command::RequestView(_) | Command::OrbitCamera(_) | Command::PanCamera(_) => {}
        }
        self
    }

    fn cone_mut(&mut self, object: Key, cone: Key) -> Option<&mut Cone> {
        self.objects.get_mut(object)?.cones.get_mut(cone)
    }
}

/// Clamp a cone's opening angle to the range the geometry can represent.
pub fn clamp_spread(spread: f32) -> f32 {
    spread.clamp(1e-3, CONE_SPREAD_MAX_RADIANS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_object_allocates_next_key_and_selects_it() {
        let m = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddObject { position: Vec3::X });
        assert_eq!(m.objects.sorted_keys(), vec![1, 2]);
        assert_eq!(m.selection, Selection::object(2));
    }

    #[test]
    fn add_object_is_refused_once_keys_run_out() {
        let mut m = Model::empty();
        m.objects.insert(Key::MAX, SoundObject::new(Key::MAX, Vec3::ZERO));
        let after = m.clone().apply(&Command::AddObject { position: Vec3::X });
        assert_eq!(after, m);
    }

    #[test]
    fn deleting_selected_object_clears_selection() {
        let m = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::DeleteObject { key: 1 });
        assert!(m.objects.is_empty());
        assert_eq!(m.selection, Selection::none());
    }

    #[test]
    fn deleting_other_object_keeps_selection() {
        let m = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddObject { position: Vec3::X })
            .apply(&Command::DeleteObject { key: 1 });
        assert_eq!(m.selection, Selection::object(2));
    }

    #[test]
    fn move_object_only_changes_position() {
        let m = Model::empty().apply(&Command::AddObject { position: Vec3::ZERO });
        let moved = m.clone().apply(&Command::MoveObject {
            key: 1,
            position: Vec3::new(2.0, 0.0, 3.0),
        });
        assert_eq!(moved.objects.get(1).map(|o| o.position), Some(Vec3::new(2.0, 0.0, 3.0)));
        assert_eq!(moved.objects.get(1).map(|o| o.radius), m.objects.get(1).map(|o| o.radius));
    }

    #[test]
    fn cones_get_distinct_keys_and_aims() {
        let m = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddCone { object: 1 })
            .apply(&Command::AddCone { object: 1 });
        let o = m.object(1).unwrap();
        assert_eq!(o.cones.sorted_keys(), vec![1, 2]);
        assert_ne!(o.cones.get(1).unwrap().aim, o.cones.get(2).unwrap().aim);
        assert_eq!(m.selection.cone, Some(2));
    }

    #[test]
    fn selecting_unknown_object_clears_selection() {
        let m = Model::empty().apply(&Command::Select(Selection::object(42)));
        assert_eq!(m.selection, Selection::none());
    }

    #[test]
    fn camera_commands_leave_model_untouched() {
        let m = Model::default();
        let same = m.clone().apply(&Command::OrbitCamera(Vec2::ONE));
        assert_eq!(m, same);
    }
}
