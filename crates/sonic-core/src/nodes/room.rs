//! Static room furniture: the floor and flat screens standing in the room.

use super::{cached_update, look_rotation, sync_field, CachedParams};
use crate::constants::{FLOOR_COLOR, SCREEN_COLOR};
use crate::error::SceneError;
use crate::keyed::Key;
use crate::model::{Floor, Screen};
use crate::reconcile::NodeBuilder;
use crate::resources::GpuResources;
use crate::scene::{NodeId, NodeKind, SceneGraph, Shape};
use glam::Vec3;

/// One entry of the room collection. The floor always uses key 0, so screen
/// keys start at 1.
#[derive(Clone, Copy, Debug)]
pub enum RoomItem<'m> {
    Floor(&'m Floor),
    Screen(&'m Screen),
}

impl RoomItem<'_> {
    pub fn key(&self) -> Key {
        match self {
            RoomItem::Floor(_) => 0,
            RoomItem::Screen(s) => s.key,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            RoomItem::Floor(_) => NodeKind::Floor,
            RoomItem::Screen(_) => NodeKind::Screen,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FloorParams {
    pub size: Option<(f32, f32)>,
}

fn floor_params(cached: &CachedParams) -> Option<&FloorParams> {
    match cached {
        CachedParams::Floor(p) => Some(p),
        _ => None,
    }
}

pub struct FloorBuilder;

impl<'m> NodeBuilder<RoomItem<'m>> for FloorBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        _: &RoomItem<'m>,
    ) -> Result<NodeId, SceneError> {
        let node = graph.spawn("floor");
        graph.set_color(node, FLOOR_COLOR, resources)?;
        Ok(node)
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &RoomItem<'m>,
    ) -> Result<(), SceneError> {
        let RoomItem::Floor(floor) = item else {
            return Err(SceneError::node_update(item.key(), "floor builder given a screen"));
        };
        cached_update(graph, node, floor_params, CachedParams::Floor, |graph, cache| {
            let size = (floor.width, floor.depth);
            sync_field(&mut cache.size, &size, || {
                graph.set_shape(
                    node,
                    Shape::Plane {
                        width: floor.width,
                        depth: floor.depth,
                    },
                    resources,
                )
            })?;
            Ok(())
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScreenParams {
    /// `(position, look_at)`
    pub placement: Option<(Vec3, Vec3)>,
    pub size: Option<(f32, f32)>,
}

fn screen_params(cached: &CachedParams) -> Option<&ScreenParams> {
    match cached {
        CachedParams::Screen(p) => Some(p),
        _ => None,
    }
}

pub struct ScreenBuilder;

impl<'m> NodeBuilder<RoomItem<'m>> for ScreenBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        _: &RoomItem<'m>,
    ) -> Result<NodeId, SceneError> {
        let node = graph.spawn("screen");
        graph.set_color(node, SCREEN_COLOR, resources)?;
        Ok(node)
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &RoomItem<'m>,
    ) -> Result<(), SceneError> {
        let RoomItem::Screen(screen) = item else {
            return Err(SceneError::node_update(item.key(), "screen builder given the floor"));
        };
        cached_update(graph, node, screen_params, CachedParams::Screen, |graph, cache| {
            let placement = (screen.position, screen.look_at);
            sync_field(&mut cache.placement, &placement, || {
                let rotation = look_rotation(Vec3::Z, screen.position, screen.look_at);
                graph.set_transform(node, screen.position, rotation)
            })?;
            let size = (screen.width, screen.height);
            sync_field(&mut cache.size, &size, || {
                graph.set_shape(
                    node,
                    Shape::Quad {
                        width: screen.width,
                        height: screen.height,
                    },
                    resources,
                )
            })?;
            Ok(())
        })
    }
}
