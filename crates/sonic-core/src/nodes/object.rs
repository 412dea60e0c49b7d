use super::cone::{ConeBuilder, ConeView};
use super::{cached_update, sync_field, CachedParams};
use crate::constants::{CONES_CONTAINER, OBJECT_COLOR, OBJECT_SELECTED_COLOR};
use crate::error::SceneError;
use crate::keyed::Key;
use crate::model::SoundObject;
use crate::reconcile::{reconcile, Builders, NodeBuilder, ReconcileReport};
use crate::resources::GpuResources;
use crate::scene::{NodeId, NodeKind, SceneEvent, SceneGraph, Shape};
use glam::Vec3;
use std::cell::RefCell;

/// A sound object as the scene sees it: the model item plus derived selection state.
#[derive(Clone, Copy, Debug)]
pub struct ObjectView<'m> {
    pub object: &'m SoundObject,
    pub selected: bool,
    pub selected_cone: Option<Key>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectParams {
    pub position: Option<Vec3>,
    pub radius: Option<f32>,
    pub selected: Option<bool>,
}

fn object_params(cached: &CachedParams) -> Option<&ObjectParams> {
    match cached {
        CachedParams::Object(p) => Some(p),
        _ => None,
    }
}

/// Builds sound objects and reconciles each object's cones below it.
///
/// The nested cone passes of one sync are collected here; take them with
/// [`ObjectBuilder::take_cone_report`].
#[derive(Default)]
pub struct ObjectBuilder {
    cones: RefCell<ReconcileReport>,
}

impl ObjectBuilder {
    pub fn take_cone_report(&self) -> ReconcileReport {
        self.cones.take()
    }
}

impl<'m> NodeBuilder<ObjectView<'m>> for ObjectBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        _: &ObjectView<'m>,
    ) -> Result<NodeId, SceneError> {
        Ok(graph.spawn("sound_object"))
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &ObjectView<'m>,
    ) -> Result<(), SceneError> {
        let object = item.object;
        cached_update(
            graph,
            node,
            object_params,
            CachedParams::Object,
            |graph, cache| {
                sync_field(&mut cache.position, &object.position, || {
                    graph.set_position(node, object.position)
                })?;
                sync_field(&mut cache.radius, &object.radius, || {
                    graph.set_shape(node, Shape::Sphere { radius: object.radius }, resources)
                })?;
                let color = if item.selected {
                    OBJECT_SELECTED_COLOR
                } else {
                    OBJECT_COLOR
                };
                sync_field(&mut cache.selected, &item.selected, || {
                    graph.set_color(node, color, resources)
                })?;
                Ok(())
            },
        )?;
        let cones = sync_cones(graph, resources, node, item)?;
        self.cones.borrow_mut().absorb(cones);
        Ok(())
    }

    fn exit(&self, graph: &mut SceneGraph, node: NodeId) {
        let Some(object) = graph.get(node).and_then(|n| n.key()) else {
            return;
        };
        let Some(cones) = graph.find_child(node, |n| n.name() == CONES_CONTAINER) else {
            return;
        };
        let removed: Vec<Key> = graph
            .children(cones)
            .iter()
            .filter_map(|c| graph.get(*c))
            .filter(|n| n.kind() == Some(NodeKind::Cone))
            .filter_map(|n| n.key())
            .collect();
        for cone in removed {
            graph.push_event(SceneEvent::ConeRemoved { object, cone });
        }
    }
}

/// Cones are reconciled under their own container below the object node.
/// The container is only created once the object has a cone.
fn sync_cones(
    graph: &mut SceneGraph,
    resources: &mut dyn GpuResources,
    node: NodeId,
    item: &ObjectView<'_>,
) -> Result<ReconcileReport, SceneError> {
    let object = item.object;
    let parent = match graph.find_child(node, |n| n.name() == CONES_CONTAINER) {
        Some(parent) => parent,
        None if object.cones.is_empty() => return Ok(ReconcileReport::default()),
        None => graph.find_or_spawn_child(node, CONES_CONTAINER)?,
    };
    let cones: Vec<ConeView<'_>> = object
        .cones
        .values()
        .map(|cone| ConeView {
            object: object.key,
            cone,
            selected: item.selected && item.selected_cone == Some(cone.key),
        })
        .collect();
    let builders = Builders::<ConeView<'_>>::new().with(NodeKind::Cone, &ConeBuilder);
    let report = reconcile(
        graph,
        resources,
        parent,
        &cones,
        |c| c.cone.key,
        |_| NodeKind::Cone,
        &builders,
    );
    if !report.failures.is_empty() {
        log::warn!("[reconcile] object {}: {} cone(s) failed", object.key, report.failures.len());
    }
    Ok(report)
}
