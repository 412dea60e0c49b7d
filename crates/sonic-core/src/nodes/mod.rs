//! Per-kind node builders and the pass that syncs a model snapshot into the scene.
//!
//! Every builder keeps a typed copy of the parameters it last applied in the
//! node's [`CachedParams`]. Fields start as `None`, so the first update on a
//! fresh node writes everything, and each later write happens only when the
//! requested value differs from the cached one (exact equality).

pub mod cone;
pub mod object;
pub mod room;
pub mod trajectory;
pub mod viewpoint;
pub mod viewport;

use crate::camera::Camera;
use crate::constants::{
    CAMERAS_CONTAINER, OBJECTS_CONTAINER, ROOM_CONTAINER, SURFACES_CONTAINER,
    TRAJECTORIES_CONTAINER,
};
use crate::error::SceneError;
use crate::model::Model;
use crate::reconcile::{reconcile, Builders, ReconcileReport};
use crate::resources::GpuResources;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use glam::{Quat, Vec3};

pub use cone::{ConeBuilder, ConeParams, ConeView};
pub use object::{ObjectBuilder, ObjectParams, ObjectView};
pub use room::{FloorBuilder, FloorParams, RoomItem, ScreenBuilder, ScreenParams};
pub use trajectory::{TrajectoryBuilder, TrajectoryParams, TrajectoryView};
pub use viewpoint::{CameraBuilder, CameraItem, CameraParams};
pub use viewport::{SurfaceBuilder, SurfaceItem, SurfaceParams};

/// Parameters a node was last built or updated from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CachedParams {
    #[default]
    Empty,
    Object(ObjectParams),
    Cone(ConeParams),
    Trajectory(TrajectoryParams),
    Floor(FloorParams),
    Screen(ScreenParams),
    Camera(CameraParams),
    Surface(SurfaceParams),
}

/// Load the node's cached params of one variant (default when absent or of
/// another variant), run `apply` on them and store the result back.
///
/// The cache is stored even when `apply` fails part way, so fields written
/// before the failure are not written again on the next pass.
pub(crate) fn cached_update<P: Clone + Default>(
    graph: &mut SceneGraph,
    node: NodeId,
    unwrap: fn(&CachedParams) -> Option<&P>,
    wrap: fn(P) -> CachedParams,
    apply: impl FnOnce(&mut SceneGraph, &mut P) -> Result<(), SceneError>,
) -> Result<(), SceneError> {
    let mut params = graph.cached(node).and_then(unwrap).cloned().unwrap_or_default();
    let result = apply(graph, &mut params);
    graph.set_cached(node, wrap(params))?;
    result
}

/// Run `write` and remember `next` only when it differs from `cached`.
pub(crate) fn sync_field<T: Clone + PartialEq>(
    cached: &mut Option<T>,
    next: &T,
    write: impl FnOnce() -> Result<(), SceneError>,
) -> Result<bool, SceneError> {
    if cached.as_ref() == Some(next) {
        return Ok(false);
    }
    write()?;
    *cached = Some(next.clone());
    Ok(true)
}

/// Rotation turning the local `forward` axis toward `target` as seen from `from`.
pub fn look_rotation(forward: Vec3, from: Vec3, target: Vec3) -> Quat {
    match (target - from).try_normalize() {
        Some(dir) => Quat::from_rotation_arc(forward, dir),
        None => Quat::IDENTITY,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub room: ReconcileReport,
    pub objects: ReconcileReport,
    pub trajectories: ReconcileReport,
    pub cameras: ReconcileReport,
    pub surfaces: ReconcileReport,
    /// Every object's nested cone pass, merged.
    pub cones: ReconcileReport,
}

impl SyncReport {
    fn passes(&self) -> [&ReconcileReport; 6] {
        [
            &self.room,
            &self.objects,
            &self.cones,
            &self.trajectories,
            &self.cameras,
            &self.surfaces,
        ]
    }

    pub fn is_stable(&self) -> bool {
        self.passes().iter().all(|r| r.is_stable())
    }

    pub fn failures(&self) -> usize {
        self.passes().iter().map(|r| r.failures.len()).sum()
    }
}

/// Containers under the scene root, one per reconciled collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Containers {
    pub room: NodeId,
    pub objects: NodeId,
    pub trajectories: NodeId,
    pub cameras: NodeId,
    pub surfaces: NodeId,
}

impl Containers {
    pub fn ensure(graph: &mut SceneGraph) -> Result<Self, SceneError> {
        let root = graph.root();
        Ok(Self {
            room: graph.find_or_spawn_child(root, ROOM_CONTAINER)?,
            objects: graph.find_or_spawn_child(root, OBJECTS_CONTAINER)?,
            trajectories: graph.find_or_spawn_child(root, TRAJECTORIES_CONTAINER)?,
            cameras: graph.find_or_spawn_child(root, CAMERAS_CONTAINER)?,
            surfaces: graph.find_or_spawn_child(root, SURFACES_CONTAINER)?,
        })
    }
}

/// Bring the whole scene in line with one model snapshot.
///
/// Each collection is reconciled under its own container; per-item failures
/// are contained in the returned report.
pub fn sync_scene(
    graph: &mut SceneGraph,
    resources: &mut dyn GpuResources,
    model: &Model,
    camera: &Camera,
    surfaces: &[SurfaceItem],
) -> Result<SyncReport, SceneError> {
    let c = Containers::ensure(graph)?;

    let room_items: Vec<RoomItem<'_>> = std::iter::once(RoomItem::Floor(&model.floor))
        .chain(model.screens.values().map(RoomItem::Screen))
        .collect();
    let room_builders = Builders::<RoomItem<'_>>::new()
        .with(NodeKind::Floor, &FloorBuilder)
        .with(NodeKind::Screen, &ScreenBuilder);
    let room = reconcile(
        graph,
        resources,
        c.room,
        &room_items,
        RoomItem::key,
        RoomItem::kind,
        &room_builders,
    );

    let object_items: Vec<ObjectView<'_>> = model
        .objects
        .values()
        .map(|object| ObjectView {
            object,
            selected: model.is_selected(object.key),
            selected_cone: model.selection.cone.filter(|_| model.is_selected(object.key)),
        })
        .collect();
    let object_builder = ObjectBuilder::default();
    let object_builders =
        Builders::<ObjectView<'_>>::new().with(NodeKind::SoundObject, &object_builder);
    let objects = reconcile(
        graph,
        resources,
        c.objects,
        &object_items,
        |v| v.object.key,
        |_| NodeKind::SoundObject,
        &object_builders,
    );
    let cones = object_builder.take_cone_report();

    let trajectory_items: Vec<TrajectoryView<'_>> = model
        .objects
        .values()
        .filter(|o| o.trajectory.len() >= 2)
        .map(|o| TrajectoryView {
            key: o.key,
            points: &o.trajectory,
        })
        .collect();
    let trajectory_builders =
        Builders::<TrajectoryView<'_>>::new().with(NodeKind::Trajectory, &TrajectoryBuilder);
    let trajectories = reconcile(
        graph,
        resources,
        c.trajectories,
        &trajectory_items,
        |t| t.key,
        |_| NodeKind::Trajectory,
        &trajectory_builders,
    );

    let camera_items = [CameraItem { key: 0, camera }];
    let camera_builders = Builders::<CameraItem<'_>>::new().with(NodeKind::Camera, &CameraBuilder);
    let cameras = reconcile(
        graph,
        resources,
        c.cameras,
        &camera_items,
        |i| i.key,
        |_| NodeKind::Camera,
        &camera_builders,
    );

    let surface_builders = Builders::<SurfaceItem>::new().with(NodeKind::Surface, &SurfaceBuilder);
    let surfaces = reconcile(
        graph,
        resources,
        c.surfaces,
        surfaces,
        |s| s.key,
        |_| NodeKind::Surface,
        &surface_builders,
    );

    Ok(SyncReport {
        room,
        objects,
        trajectories,
        cameras,
        surfaces,
        cones,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraRig;
    use crate::model::Command;
    use crate::resources::ResourcePool;
    use crate::scene::SceneEvent;

    fn sync(graph: &mut SceneGraph, pool: &mut ResourcePool, model: &Model) -> SyncReport {
        let camera = CameraRig::new(1.0).camera();
        sync_scene(graph, pool, model, &camera, &[]).unwrap()
    }

    fn object_node(graph: &SceneGraph, key: u32) -> Option<NodeId> {
        let objects = graph.find_child(graph.root(), |n| n.name() == OBJECTS_CONTAINER)?;
        graph.find_child(objects, |n| n.key() == Some(key))
    }

    #[test]
    fn second_sync_of_same_model_is_a_no_op() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let model = Model::default()
            .apply(&Command::AddObject { position: Vec3::new(1.0, 0.0, 2.0) })
            .apply(&Command::AddCone { object: 1 })
            .apply(&Command::SetTrajectory {
                object: 1,
                points: vec![Vec3::ZERO, Vec3::X],
            });
        let first = sync(&mut g, &mut pool, &model);
        assert_eq!(first.failures(), 0);
        let before = g.stats();
        let second = sync(&mut g, &mut pool, &model);
        assert!(second.is_stable());
        let delta = g.stats().since(&before);
        assert_eq!(delta.mutations(), 0);
        assert_eq!(delta.nodes_created, 0);
        assert_eq!(delta.nodes_removed, 0);
    }

    #[test]
    fn selection_swaps_material_only() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let model = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddObject { position: Vec3::X });
        sync(&mut g, &mut pool, &model);
        let before = g.stats();
        let reselected = model.apply(&Command::Select(crate::model::Selection::object(1)));
        sync(&mut g, &mut pool, &reselected);
        let delta = g.stats().since(&before);
        // object 2 loses the highlight and object 1 gains it
        assert_eq!(delta.material_writes, 2);
        assert_eq!(delta.transform_writes, 0);
        assert_eq!(delta.geometry_builds, 0);
    }

    #[test]
    fn cone_file_change_emits_source_event_once() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let model = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddCone { object: 1 });
        sync(&mut g, &mut pool, &model);
        assert!(g.drain_events().is_empty());

        let model = model.apply(&Command::SetConeFile {
            object: 1,
            cone: 1,
            file: Some("rain.ogg".into()),
        });
        sync(&mut g, &mut pool, &model);
        sync(&mut g, &mut pool, &model);
        assert_eq!(
            g.drain_events(),
            vec![SceneEvent::ConeSourceChanged {
                object: 1,
                cone: 1,
                file: Some("rain.ogg".into()),
            }]
        );
    }

    #[test]
    fn failed_cone_is_counted_in_the_sync_report() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let mut model = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddCone { object: 1 })
            .apply(&Command::AddCone { object: 1 });
        if let Some(cone) = model.objects.get_mut(1).and_then(|o| o.cones.get_mut(2)) {
            cone.height = 0.0;
        }
        let report = sync(&mut g, &mut pool, &model);
        assert_eq!(report.objects.failures.len(), 0);
        assert_eq!(report.cones.entered, vec![1]);
        assert_eq!(report.cones.failures.len(), 1);
        assert_eq!(report.cones.failures[0].0, 2);
        assert_eq!(report.failures(), 1);
        assert!(!report.is_stable());
    }

    #[test]
    fn deleting_object_reports_its_cones_removed() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let model = Model::empty()
            .apply(&Command::AddObject { position: Vec3::ZERO })
            .apply(&Command::AddCone { object: 1 });
        sync(&mut g, &mut pool, &model);
        assert!(object_node(&g, 1).is_some());
        let model = model.apply(&Command::DeleteObject { key: 1 });
        sync(&mut g, &mut pool, &model);
        assert!(object_node(&g, 1).is_none());
        assert_eq!(g.drain_events(), vec![SceneEvent::ConeRemoved { object: 1, cone: 1 }]);
    }
}
