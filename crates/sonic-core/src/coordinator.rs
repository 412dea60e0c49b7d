//! Turns gestures and UI commands into model and camera commands.
//!
//! Owns the mode state. "Add object" arms `ready_to_add`; the next
//! `dragstart` always disarms it. Placement (`adding`) only starts when the
//! camera is already settled top-down at that `dragstart`. Otherwise a
//! top-down transition is requested and the gesture does nothing else: the
//! user issues "add object" again once the camera has arrived.

use crate::camera::{Camera, CameraView};
use crate::gesture::{GestureEvent, GestureKind};
use crate::keyed::Key;
use crate::model::{Command, Model, Selection};
use crate::scene::{NodeId, NodeKind, SceneGraph};
use glam::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeState {
    pub ready_to_add: bool,
    pub adding: bool,
    pub camera_is_top_down: bool,
}

/// Commands coming from buttons and keys rather than the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    AddObject,
    AddCone,
    DeleteSelected,
    ToggleView,
    Escape,
}

/// Model item owning an intersected node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Object(Key),
    Cone { object: Key, cone: Key },
}

impl Target {
    pub fn object(&self) -> Key {
        match self {
            Target::Object(key) => *key,
            Target::Cone { object, .. } => *object,
        }
    }

    pub fn selection(&self) -> Selection {
        match self {
            Target::Object(key) => Selection::object(*key),
            Target::Cone { object, cone } => Selection {
                object: Some(*object),
                cone: Some(*cone),
            },
        }
    }
}

/// Walk from `node` toward the root to the nearest tagged ancestor.
///
/// A sound object resolves to itself; a cone resolves together with the
/// object two levels up (cone, cones container, object). Nodes with no
/// recognised ancestor resolve to nothing.
pub fn resolve_target(graph: &SceneGraph, node: NodeId) -> Option<Target> {
    for id in graph.ancestors(node) {
        let n = graph.get(id)?;
        match (n.kind(), n.key()) {
            (Some(NodeKind::SoundObject), Some(key)) => return Some(Target::Object(key)),
            (Some(NodeKind::Cone), Some(cone)) => {
                let owner = graph
                    .parent(id)
                    .and_then(|c| graph.parent(c))
                    .and_then(|o| graph.get(o))?;
                return match (owner.kind(), owner.key()) {
                    (Some(NodeKind::SoundObject), Some(object)) => {
                        Some(Target::Cone { object, cone })
                    }
                    _ => None,
                };
            }
            (Some(_), _) => return None,
            (None, _) => continue,
        }
    }
    None
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DragIntent {
    Placing,
    Moving { key: Key },
    Camera,
    Ignored,
}

#[derive(Clone, Debug)]
pub struct Coordinator {
    mode: ModeState,
    heading: CameraView,
    intent: Option<DragIntent>,
    floor_group: &'static str,
    objects_group: &'static str,
}

impl Coordinator {
    pub fn new(floor_group: &'static str, objects_group: &'static str) -> Self {
        Self {
            mode: ModeState::default(),
            heading: CameraView::Perspective,
            intent: None,
            floor_group,
            objects_group,
        }
    }

    pub fn mode(&self) -> ModeState {
        self.mode
    }

    /// `heading` is where the camera is going; `top_down` is true only once
    /// it has settled in the birds-eye view.
    pub fn set_camera_state(&mut self, heading: CameraView, top_down: bool) {
        self.heading = heading;
        if self.mode.camera_is_top_down != top_down {
            log::debug!("[mode] camera top-down: {}", top_down);
        }
        self.mode.camera_is_top_down = top_down;
    }

    pub fn ui(&mut self, command: UiCommand, model: &Model) -> Vec<Command> {
        match command {
            UiCommand::AddObject => {
                self.mode.ready_to_add = true;
                log::info!("[mode] add object armed");
                Vec::new()
            }
            UiCommand::AddCone => match model.selection.object {
                Some(object) => vec![Command::AddCone { object }],
                None => Vec::new(),
            },
            UiCommand::DeleteSelected => match model.selection {
                Selection {
                    object: Some(object),
                    cone: Some(cone),
                } => vec![Command::DeleteCone { object, cone }],
                Selection {
                    object: Some(key), ..
                } => vec![Command::DeleteObject { key }],
                _ => Vec::new(),
            },
            UiCommand::ToggleView => {
                let next = match self.heading {
                    CameraView::Perspective => CameraView::TopDown,
                    CameraView::TopDown => CameraView::Perspective,
                };
                vec![Command::RequestView(next)]
            }
            UiCommand::Escape => {
                self.mode.ready_to_add = false;
                self.mode.adding = false;
                vec![Command::Select(Selection::none())]
            }
        }
    }

    /// Handle a `dragstart`. Any other event kind is ignored.
    pub fn begin_drag(&mut self, event: &GestureEvent, graph: &SceneGraph) -> Vec<Command> {
        if event.kind != GestureKind::DragStart {
            return Vec::new();
        }
        let armed = std::mem::take(&mut self.mode.ready_to_add);
        self.mode.adding = false;

        if armed {
            if self.mode.camera_is_top_down {
                self.mode.adding = true;
                self.intent = Some(DragIntent::Placing);
                log::debug!("[mode] placing");
                return Vec::new();
            }
            log::info!("[mode] add object needs the top-down view; requesting it");
            self.intent = Some(DragIntent::Ignored);
            return vec![Command::RequestView(CameraView::TopDown)];
        }

        let target = event
            .current
            .pick
            .first(self.objects_group)
            .and_then(|hit| resolve_target(graph, hit.node));
        match target {
            Some(target) => {
                self.intent = Some(if self.mode.camera_is_top_down {
                    DragIntent::Moving { key: target.object() }
                } else {
                    DragIntent::Ignored
                });
                vec![Command::Select(target.selection())]
            }
            None => {
                self.intent = Some(DragIntent::Camera);
                Vec::new()
            }
        }
    }

    /// Handle `drag` and `dragend` events of the active drag.
    ///
    /// `camera` is the live camera pose. Top-down pans cast both pointer
    /// positions through it, so a pan already applied earlier in the drag is
    /// not counted again.
    pub fn continue_drag(
        &mut self,
        event: &GestureEvent,
        model: &Model,
        camera: &Camera,
    ) -> Vec<Command> {
        let Some(intent) = self.intent else {
            return Vec::new();
        };
        let ending = event.kind == GestureKind::DragEnd;
        if ending {
            self.intent = None;
            self.mode.adding = false;
        } else if event.kind != GestureKind::Drag {
            return Vec::new();
        }

        match intent {
            DragIntent::Placing if ending => match event.current.floor_point(self.floor_group) {
                Some(p) => vec![Command::AddObject {
                    position: Vec3::new(p.x, 0.0, p.z),
                }],
                None => {
                    log::debug!("[mode] placement ended off the floor");
                    Vec::new()
                }
            },
            DragIntent::Moving { key } if !ending => {
                let delta = event.floor_delta(self.floor_group);
                let (Some(object), Some(delta)) = (model.object(key), delta) else {
                    return Vec::new();
                };
                let position = object.position - Vec3::new(delta.x, 0.0, delta.z);
                vec![Command::MoveObject { key, position }]
            }
            DragIntent::Camera if !ending => {
                if self.mode.camera_is_top_down {
                    pan_delta(event, self.floor_group, camera)
                        .map(|d| vec![Command::PanCamera(d)])
                        .unwrap_or_default()
                } else {
                    event
                        .screen_delta()
                        .map(|d| vec![Command::OrbitCamera(d)])
                        .unwrap_or_default()
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Ground travel from the previous to the current pointer position, both
/// cast through the same `camera`. Only drags over the floor pan.
fn pan_delta(event: &GestureEvent, floor_group: &str, camera: &Camera) -> Option<Vec3> {
    event.floor_delta(floor_group)?;
    let previous = camera.ray_from_ndc(event.previous.as_ref()?.ndc).ground_hit()?;
    let current = camera.ray_from_ndc(event.current.ndc).ground_hit()?;
    Some(previous - current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraRig;
    use crate::constants::{CONES_CONTAINER, FLOOR_GROUP, OBJECTS_GROUP};
    use crate::gesture::GesturePoint;
    use crate::picking::{Intersection, PickResult};
    use std::rc::Rc;

    fn tagged(
        graph: &mut SceneGraph,
        parent: NodeId,
        name: &'static str,
        kind: NodeKind,
        key: Key,
    ) -> NodeId {
        let n = graph.spawn(name);
        graph.attach(parent, n).unwrap();
        graph.set_tag(n, kind, key).unwrap();
        n
    }

    fn point_hitting(group: &'static str, node: NodeId, at: Vec3) -> GesturePoint {
        let mut pick = PickResult::default();
        pick.groups.insert(
            group,
            [Intersection {
                distance: 1.0,
                point: at,
                node,
                group,
            }]
            .into_iter()
            .collect(),
        );
        GesturePoint {
            pointer: 1,
            ndc: glam::Vec2::ZERO,
            pick: Rc::new(pick),
        }
    }

    fn top_down_camera() -> Camera {
        let mut rig = CameraRig::new(1.0);
        rig.snap_to(CameraView::TopDown);
        rig.camera()
    }

    fn start(point: GesturePoint) -> GestureEvent {
        GestureEvent {
            kind: GestureKind::DragStart,
            current: point.clone(),
            start: Some(point),
            previous: None,
        }
    }

    #[test]
    fn cone_resolves_through_its_grandparent() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let object = tagged(&mut g, root, "sound_object", NodeKind::SoundObject, 7);
        let cones = g.find_or_spawn_child(object, CONES_CONTAINER).unwrap();
        let cone = tagged(&mut g, cones, "cone", NodeKind::Cone, 2);
        assert_eq!(resolve_target(&g, cone), Some(Target::Cone { object: 7, cone: 2 }));
        assert_eq!(resolve_target(&g, object), Some(Target::Object(7)));
    }

    #[test]
    fn untagged_chain_resolves_to_nothing() {
        let mut g = SceneGraph::new();
        let loose = g.find_or_spawn_child(g.root(), "loose").unwrap();
        assert_eq!(resolve_target(&g, loose), None);
    }

    #[test]
    fn armed_add_is_cleared_by_next_dragstart() {
        let g = SceneGraph::new();
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        c.ui(UiCommand::AddObject, &Model::empty());
        assert!(c.mode().ready_to_add);
        let cmds = c.begin_drag(&start(point_hitting(FLOOR_GROUP, g.root(), Vec3::ZERO)), &g);
        assert_eq!(cmds, vec![Command::RequestView(CameraView::TopDown)]);
        assert!(!c.mode().ready_to_add);
        assert!(!c.mode().adding);
    }

    #[test]
    fn dragstart_on_object_selects_it() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let object = tagged(&mut g, root, "sound_object", NodeKind::SoundObject, 3);
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        let cmds = c.begin_drag(&start(point_hitting(OBJECTS_GROUP, object, Vec3::ZERO)), &g);
        assert_eq!(cmds, vec![Command::Select(Selection::object(3))]);
    }

    #[test]
    fn top_down_drag_moves_selected_object_on_the_floor_plane() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let object = tagged(&mut g, root, "sound_object", NodeKind::SoundObject, 1);
        let floor = tagged(&mut g, root, "floor", NodeKind::Floor, 0);
        let model = Model::empty().apply(&Command::AddObject {
            position: Vec3::new(1.0, 0.0, 1.0),
        });
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        c.set_camera_state(CameraView::TopDown, true);

        let mut down = point_hitting(OBJECTS_GROUP, object, Vec3::ZERO);
        let floor_hits = point_hitting(FLOOR_GROUP, floor, Vec3::new(1.0, 0.0, 1.0));
        Rc::make_mut(&mut down.pick)
            .groups
            .extend(floor_hits.pick.groups.clone());
        c.begin_drag(&start(down.clone()), &g);

        let drag = GestureEvent {
            kind: GestureKind::Drag,
            current: point_hitting(FLOOR_GROUP, floor, Vec3::new(2.0, 0.5, 3.0)),
            start: Some(down.clone()),
            previous: Some(down),
        };
        let cmds = c.continue_drag(&drag, &model, &top_down_camera());
        assert_eq!(
            cmds,
            vec![Command::MoveObject {
                key: 1,
                position: Vec3::new(2.0, 0.0, 3.0),
            }]
        );
    }

    #[test]
    fn top_down_pan_depends_only_on_pointer_travel() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let floor = tagged(&mut g, root, "floor", NodeKind::Floor, 0);
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        c.set_camera_state(CameraView::TopDown, true);

        let at = |ndc: glam::Vec2| GesturePoint {
            ndc,
            ..point_hitting(FLOOR_GROUP, floor, Vec3::ZERO)
        };
        let drag = GestureEvent {
            kind: GestureKind::Drag,
            current: at(glam::Vec2::new(0.2, 0.0)),
            start: Some(at(glam::Vec2::ZERO)),
            previous: Some(at(glam::Vec2::ZERO)),
        };

        let mut rig = CameraRig::new(1.0);
        rig.snap_to(CameraView::TopDown);
        c.begin_drag(&start(at(glam::Vec2::ZERO)), &g);
        let first = c.continue_drag(&drag, &Model::empty(), &rig.camera());
        let [Command::PanCamera(first)] = first.as_slice() else {
            panic!("expected one pan, got {first:?}");
        };
        assert!(first.x < 0.0, "pan {first:?}");
        assert!(first.z.abs() < 1e-4);

        // the same pointer travel after an earlier pan yields the same delta
        rig.pan(Vec3::new(-3.0, 0.0, 2.0));
        let again = c.continue_drag(&drag, &Model::empty(), &rig.camera());
        let [Command::PanCamera(again)] = again.as_slice() else {
            panic!("expected one pan, got {again:?}");
        };
        assert!((*again - *first).length() < 1e-4, "{again:?} vs {first:?}");
    }

    #[test]
    fn perspective_drag_on_empty_space_orbits() {
        let g = SceneGraph::new();
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        let p = GesturePoint {
            pointer: 1,
            ndc: glam::Vec2::ZERO,
            pick: Rc::new(PickResult::default()),
        };
        c.begin_drag(&start(p.clone()), &g);
        let moved = GesturePoint {
            ndc: glam::Vec2::new(0.1, 0.0),
            ..p.clone()
        };
        let drag = GestureEvent {
            kind: GestureKind::Drag,
            current: moved,
            start: Some(p.clone()),
            previous: Some(p),
        };
        assert_eq!(
            c.continue_drag(&drag, &Model::empty(), &CameraRig::new(1.0).camera()),
            vec![Command::OrbitCamera(glam::Vec2::new(0.1, 0.0))]
        );
    }

    #[test]
    fn delete_prefers_selected_cone() {
        let mut c = Coordinator::new(FLOOR_GROUP, OBJECTS_GROUP);
        let model = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddCone { object: 1 });
        assert_eq!(
            c.ui(UiCommand::DeleteSelected, &model),
            vec![Command::DeleteCone { object: 1, cone: 1 }]
        );
    }
}
