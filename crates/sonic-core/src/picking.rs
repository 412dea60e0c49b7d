//! Ray casting against named groups of scene nodes.
//!
//! Each group is tested independently. Targets are intersected in their own
//! local frame (the ray is carried through the inverse world transform), so
//! rotated and nested nodes pick correctly. Hits within a group are ordered
//! nearest first; ties keep target order.

use crate::camera::Camera;
use crate::constants::RAY_EPSILON;
use crate::scene::{NodeId, SceneGraph, Shape};
use fnv::FnvHashMap;
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Where the ray meets the `y = 0` plane, if it heads toward it.
    pub fn ground_hit(&self) -> Option<Vec3> {
        if self.direction.y.abs() < RAY_EPSILON {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// A named set of nodes to cast against.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroup {
    pub key: &'static str,
    pub targets: Vec<NodeId>,
    /// Also test every descendant of each target.
    pub recursive: bool,
}

impl TargetGroup {
    pub fn new(key: &'static str, targets: Vec<NodeId>, recursive: bool) -> Self {
        Self { key, targets, recursive }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    /// The node actually hit (a descendant when the group is recursive).
    pub node: NodeId,
    pub group: &'static str,
}

pub type Hits = SmallVec<[Intersection; 4]>;

#[derive(Clone, Debug, Default)]
pub struct PickResult {
    pub ray: Option<Ray>,
    pub groups: FnvHashMap<&'static str, Hits>,
}

impl PickResult {
    /// Hits for `group`, nearest first. Empty when the group is unknown or missed.
    pub fn hits(&self, group: &str) -> &[Intersection] {
        self.groups.get(group).map(|h| h.as_slice()).unwrap_or(&[])
    }

    pub fn first(&self, group: &str) -> Option<&Intersection> {
        self.hits(group).first()
    }
}

/// Cast the ray through `ndc` against every group.
pub fn pick(graph: &SceneGraph, camera: &Camera, ndc: Vec2, groups: &[TargetGroup]) -> PickResult {
    cast(graph, camera.ray_from_ndc(ndc), groups)
}

/// Cast an explicit world-space ray against every group.
pub fn cast(graph: &SceneGraph, ray: Ray, groups: &[TargetGroup]) -> PickResult {
    let mut result = PickResult {
        ray: Some(ray),
        groups: FnvHashMap::default(),
    };
    for group in groups {
        let mut hits = Hits::new();
        for &target in &group.targets {
            if !graph.contains(target) {
                continue;
            }
            let nodes = if group.recursive {
                graph.descendants(target)
            } else {
                vec![target]
            };
            for node in nodes {
                if let Some((distance, point)) = intersect_node(graph, node, &ray) {
                    hits.push(Intersection {
                        distance,
                        point,
                        node,
                        group: group.key,
                    });
                }
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        result.groups.insert(group.key, hits);
    }
    result
}

fn intersect_node(graph: &SceneGraph, node: NodeId, ray: &Ray) -> Option<(f32, Vec3)> {
    let shape = graph.get(node)?.shape()?;
    let world = graph.world_transform(node);
    let inv = world.inverse();
    let origin = inv.transform_point3(ray.origin);
    let dir = inv.transform_vector3(ray.direction);
    if dir.length_squared() < RAY_EPSILON {
        return None;
    }
    let t = intersect_local(shape, origin, dir)?;
    let point = world.transform_point3(origin + dir * t);
    Some((point.distance(ray.origin), point))
}

/// Smallest non-negative `t` with `origin + dir * t` on the shape's surface.
fn intersect_local(shape: &Shape, o: Vec3, d: Vec3) -> Option<f32> {
    match shape {
        Shape::Sphere { radius } => sphere(o, d, *radius),
        Shape::Plane { width, depth } => plane(o, d, 1, 0, 2, *width, *depth),
        Shape::Quad { width, height } => plane(o, d, 2, 0, 1, *width, *height),
        Shape::Cone { radius, height } => cone(o, d, *radius, *height),
        Shape::Polyline { .. } => None,
    }
}

fn sphere(o: Vec3, d: Vec3, r: f32) -> Option<f32> {
    let a = d.dot(d);
    let b = o.dot(d);
    let c = o.dot(o) - r * r;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    let near = (-b - s) / a;
    let far = (-b + s) / a;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        // origin inside the sphere
        Some(far)
    } else {
        None
    }
}

/// Rectangle centred on the origin, normal along `axis`, extents along `u` and `v`.
fn plane(
    o: Vec3,
    d: Vec3,
    axis: usize,
    u: usize,
    v: usize,
    extent_u: f32,
    extent_v: f32,
) -> Option<f32> {
    if d[axis].abs() < RAY_EPSILON {
        return None;
    }
    let t = -o[axis] / d[axis];
    if t < 0.0 {
        return None;
    }
    let p = o + d * t;
    (p[u].abs() <= extent_u * 0.5 && p[v].abs() <= extent_v * 0.5).then_some(t)
}

fn cone(o: Vec3, d: Vec3, radius: f32, height: f32) -> Option<f32> {
    if height <= 0.0 {
        return None;
    }
    let half = height * 0.5;
    // apex at y = -half; radius grows linearly to `radius` at y = +half
    let k = radius / height;
    let k2 = k * k;
    let oy = o.y + half;
    let a = d.x * d.x + d.z * d.z - k2 * d.y * d.y;
    let b = o.x * d.x + o.z * d.z - k2 * oy * d.y;
    let c = o.x * o.x + o.z * o.z - k2 * oy * oy;

    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t >= 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };
    let on_side = |t: f32| {
        let y = o.y + d.y * t;
        (-half..=half).contains(&y)
    };

    if a.abs() > RAY_EPSILON {
        let disc = b * b - a * c;
        if disc >= 0.0 {
            let s = disc.sqrt();
            for t in [(-b - s) / a, (-b + s) / a] {
                if on_side(t) {
                    consider(t);
                }
            }
        }
    } else if b.abs() > RAY_EPSILON {
        let t = -c / (2.0 * b);
        if on_side(t) {
            consider(t);
        }
    }

    if d.y.abs() > RAY_EPSILON {
        let t = (half - o.y) / d.y;
        let p = o + d * t;
        if p.x * p.x + p.z * p.z <= radius * radius {
            consider(t);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;
    use glam::Quat;

    fn graph_with(shapes: &[(Shape, Vec3)]) -> (SceneGraph, Vec<NodeId>) {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let root = g.root();
        let ids = shapes
            .iter()
            .map(|(shape, pos)| {
                let n = g.spawn("t");
                g.attach(root, n).unwrap();
                g.set_shape(n, shape.clone(), &mut pool).unwrap();
                g.set_position(n, *pos).unwrap();
                n
            })
            .collect();
        (g, ids)
    }

    #[test]
    fn hits_sorted_nearest_first() {
        let (g, ids) = graph_with(&[
            (Shape::Sphere { radius: 0.5 }, Vec3::new(0.0, 0.0, -10.0)),
            (Shape::Sphere { radius: 0.5 }, Vec3::new(0.0, 0.0, -5.0)),
        ]);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let result = cast(&g, ray, &[TargetGroup::new("g", ids.clone(), false)]);
        let hits = result.hits("g");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, ids[1]);
        assert!((hits[0].distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn empty_or_unknown_group_has_no_hits() {
        let (g, _) = graph_with(&[]);
        let groups = [TargetGroup::new("g", vec![], false)];
        let result = cast(&g, Ray::new(Vec3::ZERO, Vec3::X), &groups);
        assert!(result.hits("g").is_empty());
        assert!(result.hits("other").is_empty());
        assert!(result.first("g").is_none());
    }

    #[test]
    fn floor_plane_hit_point() {
        let (g, ids) = graph_with(&[(Shape::Plane { width: 4.0, depth: 4.0 }, Vec3::ZERO)]);
        let ray = Ray::new(Vec3::new(1.0, 5.0, 1.0), Vec3::NEG_Y);
        let result = cast(&g, ray, &[TargetGroup::new("floor", ids, false)]);
        let hit = result.first("floor").unwrap();
        assert!((hit.point - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-5);
        assert!((hit.distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn plane_outside_extent_misses() {
        let (g, ids) = graph_with(&[(Shape::Plane { width: 2.0, depth: 2.0 }, Vec3::ZERO)]);
        let ray = Ray::new(Vec3::new(3.0, 5.0, 0.0), Vec3::NEG_Y);
        assert!(cast(&g, ray, &[TargetGroup::new("f", ids, false)]).hits("f").is_empty());
    }

    #[test]
    fn recursive_group_hits_children() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let parent = g.find_or_spawn_child(g.root(), "parent").unwrap();
        let child = g.find_or_spawn_child(parent, "child").unwrap();
        g.set_position(parent, Vec3::new(0.0, 0.0, -5.0)).unwrap();
        g.set_shape(child, Shape::Sphere { radius: 1.0 }, &mut pool).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let flat = cast(&g, ray, &[TargetGroup::new("g", vec![parent], false)]);
        assert!(flat.hits("g").is_empty());
        let deep = cast(&g, ray, &[TargetGroup::new("g", vec![parent], true)]);
        assert_eq!(deep.first("g").map(|h| h.node), Some(child));
    }

    #[test]
    fn rotated_cone_is_hit_on_its_side() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let n = g.find_or_spawn_child(g.root(), "cone").unwrap();
        g.set_shape(n, Shape::Cone { radius: 1.0, height: 2.0 }, &mut pool).unwrap();
        // lay the cone along +X
        g.set_transform(n, Vec3::ZERO, Quat::from_rotation_arc(Vec3::Y, Vec3::X)).unwrap();
        let ray = Ray::new(Vec3::new(0.5, 5.0, 0.0), Vec3::NEG_Y);
        let hit = cast(&g, ray, &[TargetGroup::new("c", vec![n], false)]);
        let first = hit.first("c").unwrap();
        // radius at x = 0.5 is 0.75
        assert!((first.point.y - 0.75).abs() < 1e-4, "{:?}", first.point);
    }

    #[test]
    fn ray_from_inside_sphere_hits_far_side() {
        let (g, ids) = graph_with(&[(Shape::Sphere { radius: 2.0 }, Vec3::ZERO)]);
        let result = cast(&g, Ray::new(Vec3::ZERO, Vec3::X), &[TargetGroup::new("s", ids, false)]);
        assert!((result.first("s").unwrap().distance - 2.0).abs() < 1e-5);
    }
}
