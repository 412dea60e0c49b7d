use super::{cached_update, sync_field, CachedParams};
use crate::camera::Camera;
use crate::error::SceneError;
use crate::keyed::Key;
use crate::reconcile::NodeBuilder;
use crate::resources::GpuResources;
use crate::scene::{NodeId, SceneGraph};
use glam::Vec3;

/// The active camera mirrored into the scene so renderers and audio can read
/// its world pose like any other node.
#[derive(Clone, Copy, Debug)]
pub struct CameraItem<'c> {
    pub key: Key,
    pub camera: &'c Camera,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraParams {
    /// `(eye, target, up)`
    pub pose: Option<(Vec3, Vec3, Vec3)>,
}

fn camera_params(cached: &CachedParams) -> Option<&CameraParams> {
    match cached {
        CachedParams::Camera(p) => Some(p),
        _ => None,
    }
}

pub struct CameraBuilder;

impl<'c> NodeBuilder<CameraItem<'c>> for CameraBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        _: &CameraItem<'c>,
    ) -> Result<NodeId, SceneError> {
        Ok(graph.spawn("camera"))
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        node: NodeId,
        item: &CameraItem<'c>,
    ) -> Result<(), SceneError> {
        let camera = item.camera;
        cached_update(graph, node, camera_params, CachedParams::Camera, |graph, cache| {
            let pose = (camera.eye, camera.target, camera.up);
            sync_field(&mut cache.pose, &pose, || {
                let (_, rotation, eye) =
                    camera.view_matrix().inverse().to_scale_rotation_translation();
                graph.set_transform(node, eye, rotation)
            })?;
            Ok(())
        })
    }
}
