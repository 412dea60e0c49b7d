use super::{cached_update, sync_field, CachedParams};
use crate::constants::TRAJECTORY_COLOR;
use crate::error::SceneError;
use crate::keyed::Key;
use crate::reconcile::NodeBuilder;
use crate::resources::GpuResources;
use crate::scene::{NodeId, SceneGraph, Shape};
use glam::Vec3;

/// Path an object follows, keyed by the owning object.
#[derive(Clone, Copy, Debug)]
pub struct TrajectoryView<'m> {
    pub key: Key,
    pub points: &'m [Vec3],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrajectoryParams {
    pub points: Option<Vec<Vec3>>,
}

fn trajectory_params(cached: &CachedParams) -> Option<&TrajectoryParams> {
    match cached {
        CachedParams::Trajectory(p) => Some(p),
        _ => None,
    }
}

pub struct TrajectoryBuilder;

impl<'m> NodeBuilder<TrajectoryView<'m>> for TrajectoryBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        _: &TrajectoryView<'m>,
    ) -> Result<NodeId, SceneError> {
        let node = graph.spawn("trajectory");
        graph.set_color(node, TRAJECTORY_COLOR, resources)?;
        Ok(node)
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &TrajectoryView<'m>,
    ) -> Result<(), SceneError> {
        cached_update(graph, node, trajectory_params, CachedParams::Trajectory, |graph, cache| {
            if cache.points.as_deref() == Some(item.points) {
                return Ok(());
            }
            let points = item.points.to_vec();
            sync_field(&mut cache.points, &points, || {
                graph.set_shape(node, Shape::Polyline { points: points.clone() }, resources)
            })?;
            Ok(())
        })
    }
}
