use super::{cached_update, sync_field, CachedParams};
use crate::error::SceneError;
use crate::keyed::Key;
use crate::reconcile::NodeBuilder;
use crate::resources::GpuResources;
use crate::scene::{NodeId, SceneEvent, SceneGraph};

/// A render surface. It has no geometry; size changes are announced as
/// [`SceneEvent::SurfaceResized`] for the renderer to pick up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceItem {
    pub key: Key,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceParams {
    pub size: Option<(u32, u32)>,
}

fn surface_params(cached: &CachedParams) -> Option<&SurfaceParams> {
    match cached {
        CachedParams::Surface(p) => Some(p),
        _ => None,
    }
}

pub struct SurfaceBuilder;

impl NodeBuilder<SurfaceItem> for SurfaceBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        _: &SurfaceItem,
    ) -> Result<NodeId, SceneError> {
        Ok(graph.spawn("surface"))
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        node: NodeId,
        item: &SurfaceItem,
    ) -> Result<(), SceneError> {
        cached_update(graph, node, surface_params, CachedParams::Surface, |graph, cache| {
            let size = (item.width, item.height);
            sync_field(&mut cache.size, &size, || {
                log::debug!("[scene] surface {} is {}x{}", item.name, item.width, item.height);
                graph.push_event(SceneEvent::SurfaceResized {
                    key: item.key,
                    width: item.width,
                    height: item.height,
                });
                Ok(())
            })?;
            Ok(())
        })
    }
}
