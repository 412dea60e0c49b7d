use super::{cached_update, look_rotation, sync_field, CachedParams};
use crate::constants::{cone_default_aim, CONE_COLOR, CONE_SELECTED_COLOR};
use crate::error::SceneError;
use crate::keyed::Key;
use crate::model::{clamp_spread, Cone};
use crate::reconcile::NodeBuilder;
use crate::resources::GpuResources;
use crate::scene::{NodeId, SceneEvent, SceneGraph, Shape};
use glam::Vec3;

#[derive(Clone, Copy, Debug)]
pub struct ConeView<'m> {
    pub object: Key,
    pub cone: &'m Cone,
    pub selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConeParams {
    pub owner: Option<Key>,
    /// `(height, spread)` the geometry was built from.
    pub geometry: Option<(f32, f32)>,
    pub aim: Option<Vec3>,
    pub selected: Option<bool>,
    pub file: Option<String>,
}

fn cone_params(cached: &CachedParams) -> Option<&ConeParams> {
    match cached {
        CachedParams::Cone(p) => Some(p),
        _ => None,
    }
}

/// Base radius of a cone of `height` opening by `spread` radians.
pub fn cone_radius(height: f32, spread: f32) -> f32 {
    height * (clamp_spread(spread) * 0.5).tan()
}

pub struct ConeBuilder;

impl<'m> NodeBuilder<ConeView<'m>> for ConeBuilder {
    fn create(
        &self,
        graph: &mut SceneGraph,
        _: &mut dyn GpuResources,
        _: &ConeView<'m>,
    ) -> Result<NodeId, SceneError> {
        Ok(graph.spawn("cone"))
    }

    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &ConeView<'m>,
    ) -> Result<(), SceneError> {
        let cone = item.cone;
        if cone.height.is_nan() || cone.height <= 0.0 {
            let reason = format!("cone height {} is not positive", cone.height);
            return Err(SceneError::node_update(cone.key, reason));
        }
        cached_update(graph, node, cone_params, CachedParams::Cone, |graph, cache| {
            cache.owner = Some(item.object);

            let geometry = (cone.height, clamp_spread(cone.spread));
            let rebuilt = sync_field(&mut cache.geometry, &geometry, || {
                let shape = Shape::Cone {
                    radius: cone_radius(geometry.0, geometry.1),
                    height: geometry.0,
                };
                graph.set_shape(node, shape, resources)
            })?;

            // The apex sits at the object centre, so the node is pushed out by
            // half its height along the aim. Height and aim both feed the offset.
            if rebuilt || cache.aim != Some(cone.aim) {
                let dir = cone.aim.try_normalize().unwrap_or_else(cone_default_aim);
                let rotation = look_rotation(Vec3::Y, Vec3::ZERO, dir);
                graph.set_transform(node, dir * cone.height * 0.5, rotation)?;
                cache.aim = Some(cone.aim);
            }

            let color = if item.selected {
                CONE_SELECTED_COLOR
            } else {
                CONE_COLOR
            };
            sync_field(&mut cache.selected, &item.selected, || {
                graph.set_color(node, color, resources)
            })?;

            if cache.file != cone.file {
                log::info!("[scene] cone {}/{} source {:?}", item.object, cone.key, cone.file);
                graph.push_event(SceneEvent::ConeSourceChanged {
                    object: item.object,
                    cone: cone.key,
                    file: cone.file.clone(),
                });
                cache.file = cone.file.clone();
            }
            Ok(())
        })
    }

    fn exit(&self, graph: &mut SceneGraph, node: NodeId) {
        let Some(n) = graph.get(node) else {
            return;
        };
        let owner = match n.cached() {
            CachedParams::Cone(ConeParams { owner, .. }) => *owner,
            _ => None,
        };
        if let (Some(cone), Some(object)) = (n.key(), owner) {
            graph.push_event(SceneEvent::ConeRemoved { object, cone });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;

    fn cone(height: f32, spread: f32, aim: Vec3) -> Cone {
        Cone {
            key: 1,
            aim,
            height,
            spread,
            file: None,
        }
    }

    fn view(cone: &Cone) -> ConeView<'_> {
        ConeView {
            object: 1,
            cone,
            selected: false,
        }
    }

    #[test]
    fn height_change_rebuilds_and_moves_together() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let node = g.spawn("cone");
        let c = cone(1.0, 0.5, Vec3::X);
        ConeBuilder.update(&mut g, &mut pool, node, &view(&c)).unwrap();
        assert!((g.get(node).unwrap().position() - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);

        let taller = cone(3.0, 0.5, Vec3::X);
        let before = g.stats();
        ConeBuilder.update(&mut g, &mut pool, node, &view(&taller)).unwrap();
        let delta = g.stats().since(&before);
        assert_eq!(delta.geometry_builds, 1);
        assert_eq!(delta.transform_writes, 1);
        assert!((g.get(node).unwrap().position() - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(pool.live_geometries(), 1);
    }

    #[test]
    fn aim_change_moves_without_rebuild() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let node = g.spawn("cone");
        let c = cone(1.0, 0.5, Vec3::X);
        ConeBuilder.update(&mut g, &mut pool, node, &view(&c)).unwrap();
        let before = g.stats();
        let turned = cone(1.0, 0.5, Vec3::Z);
        ConeBuilder.update(&mut g, &mut pool, node, &view(&turned)).unwrap();
        let delta = g.stats().since(&before);
        assert_eq!(delta.geometry_builds, 0);
        assert_eq!(delta.transform_writes, 1);
        let axis = g.get(node).unwrap().rotation() * Vec3::Y;
        assert!((axis - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn non_positive_height_is_rejected() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let node = g.spawn("cone");
        for height in [0.0, -1.0, f32::NAN] {
            let c = cone(height, 0.5, Vec3::X);
            let err = ConeBuilder.update(&mut g, &mut pool, node, &view(&c)).unwrap_err();
            assert!(matches!(err, SceneError::NodeUpdate { key: 1, .. }), "height {height}");
        }
        assert_eq!(pool.live_geometries(), 0);
    }
}
