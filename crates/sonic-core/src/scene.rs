//! Retained scene graph.
//!
//! Nodes live in a generational arena and are addressed by [`NodeId`]. A node
//! removed from the graph frees its slot and bumps the slot generation, so an
//! id held past removal resolves to nothing instead of to a recycled node.
//!
//! Query helpers (`find_child`, `find_children`, `ancestors`) are ordinary
//! methods on [`SceneGraph`].

use crate::error::SceneError;
use crate::keyed::Key;
use crate::nodes::CachedParams;
use crate::resources::{GeometryHandle, GpuResources, MaterialHandle};
use glam::{Affine3A, Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Entity kinds a node can be tagged with by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SoundObject,
    Cone,
    Trajectory,
    Floor,
    Screen,
    Camera,
    Surface,
}

/// Geometry description, in the node's local frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Axis along local +Y with the apex at `y = -height / 2` and the open
    /// end (radius `radius`) at `y = +height / 2`.
    Cone { radius: f32, height: f32 },
    /// Horizontal rectangle in the local XZ plane.
    Plane { width: f32, depth: f32 },
    /// Vertical rectangle in the local XY plane facing +Z.
    Quad { width: f32, height: f32 },
    Polyline { points: Vec<Vec3> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub shape: Shape,
    pub handle: GeometryHandle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub handle: MaterialHandle,
}

/// Signals derived from node updates for collaborators outside the scene
/// (audio loading, renderer surfaces).
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
    ConeSourceChanged {
        object: Key,
        cone: Key,
        file: Option<String>,
    },
    ConeRemoved {
        object: Key,
        cone: Key,
    },
    SurfaceResized {
        key: Key,
        width: u32,
        height: u32,
    },
}

#[derive(Debug)]
pub struct SceneNode {
    name: &'static str,
    kind: Option<NodeKind>,
    key: Option<Key>,
    position: Vec3,
    rotation: Quat,
    mesh: Option<Mesh>,
    material: Option<Material>,
    cached: CachedParams,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            kind: None,
            key: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            mesh: None,
            material: None,
            cached: CachedParams::Empty,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.kind
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.mesh.as_ref().map(|m| &m.shape)
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    pub fn color(&self) -> Option<[f32; 3]> {
        self.material.map(|m| m.color)
    }

    pub fn cached(&self) -> &CachedParams {
        &self.cached
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.position)
    }
}

/// Running totals of graph writes, used to check that a pass did no work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub nodes_created: u64,
    pub nodes_removed: u64,
    pub transform_writes: u64,
    pub geometry_builds: u64,
    pub geometry_disposals: u64,
    pub material_writes: u64,
    pub material_disposals: u64,
}

impl SceneStats {
    pub fn since(&self, earlier: &SceneStats) -> SceneStats {
        SceneStats {
            nodes_created: self.nodes_created - earlier.nodes_created,
            nodes_removed: self.nodes_removed - earlier.nodes_removed,
            transform_writes: self.transform_writes - earlier.transform_writes,
            geometry_builds: self.geometry_builds - earlier.geometry_builds,
            geometry_disposals: self.geometry_disposals - earlier.geometry_disposals,
            material_writes: self.material_writes - earlier.material_writes,
            material_disposals: self.material_disposals - earlier.material_disposals,
        }
    }

    /// Writes to nodes that stay live: transforms, geometry rebuilds and material swaps.
    pub fn mutations(&self) -> u64 {
        self.transform_writes + self.geometry_builds + self.material_writes
    }
}

struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    stats: SceneStats,
    events: Vec<SceneEvent>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(SceneNode::new("scene")),
            }],
            free: Vec::new(),
            root,
            stats: SceneStats::default(),
            events: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    /// Create a detached node.
    pub fn spawn(&mut self, name: &'static str) -> NodeId {
        self.stats.nodes_created += 1;
        let node = SceneNode::new(name);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(SceneError::StaleNode(id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::StaleNode(parent));
        }
        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        let parent = self.node_mut(child)?.parent.take();
        if let Some(p) = parent {
            if let Ok(pn) = self.node_mut(p) {
                pn.children.retain(|c| *c != child);
            }
        }
        Ok(())
    }

    pub fn find_child(&self, parent: NodeId, pred: impl Fn(&SceneNode) -> bool) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.get(*c).is_some_and(&pred))
    }

    pub fn find_children(&self, parent: NodeId, pred: impl Fn(&SceneNode) -> bool) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| self.get(*c).is_some_and(&pred))
            .collect()
    }

    /// Child named `name`, spawned and attached if missing.
    pub fn find_or_spawn_child(
        &mut self,
        parent: NodeId,
        name: &'static str,
    ) -> Result<NodeId, SceneError> {
        if let Some(existing) = self.find_child(parent, |n| n.name == name) {
            return Ok(existing);
        }
        let child = self.spawn(name);
        self.attach(parent, child)?;
        Ok(child)
    }

    /// The node itself followed by each ancestor up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.contains(id).then_some(id),
        }
    }

    /// The node and every node below it, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.get(n) {
                out.push(n);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn world_transform(&self, id: NodeId) -> Affine3A {
        let chain: Vec<NodeId> = self.ancestors(id).collect();
        chain
            .iter()
            .rev()
            .filter_map(|n| self.get(*n))
            .fold(Affine3A::IDENTITY, |acc, n| acc * n.local_transform())
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_transform(id).transform_point3(Vec3::ZERO)
    }

    pub(crate) fn set_tag(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        key: Key,
    ) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.kind = Some(kind);
        node.key = Some(key);
        Ok(())
    }

    pub fn set_transform(
        &mut self,
        id: NodeId,
        position: Vec3,
        rotation: Quat,
    ) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.position = position;
        node.rotation = rotation;
        self.stats.transform_writes += 1;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.position = position;
        self.stats.transform_writes += 1;
        Ok(())
    }

    /// Replace the node's geometry: the old resource is released first, then
    /// the new one is built. A failed release is logged and does not block the rebuild.
    pub fn set_shape(
        &mut self,
        id: NodeId,
        shape: Shape,
        resources: &mut dyn GpuResources,
    ) -> Result<(), SceneError> {
        let old = self.node_mut(id)?.mesh.take();
        if let Some(old) = old {
            self.stats.geometry_disposals += 1;
            if let Err(e) = resources.dispose_geometry(old.handle) {
                log::warn!("[scene] {}", e);
            }
        }
        let handle = resources.create_geometry(&shape)?;
        self.node_mut(id)?.mesh = Some(Mesh { shape, handle });
        self.stats.geometry_builds += 1;
        Ok(())
    }

    pub fn set_color(
        &mut self,
        id: NodeId,
        color: [f32; 3],
        resources: &mut dyn GpuResources,
    ) -> Result<(), SceneError> {
        let current = self.node_mut(id)?.material;
        let material = match current {
            Some(m) => {
                resources.set_material_color(m.handle, color)?;
                Material { color, ..m }
            }
            None => Material {
                color,
                handle: resources.create_material(color)?,
            },
        };
        self.node_mut(id)?.material = Some(material);
        self.stats.material_writes += 1;
        Ok(())
    }

    pub fn cached(&self, id: NodeId) -> Option<&CachedParams> {
        self.get(id).map(|n| &n.cached)
    }

    pub(crate) fn set_cached(
        &mut self,
        id: NodeId,
        cached: CachedParams,
    ) -> Result<(), SceneError> {
        self.node_mut(id)?.cached = cached;
        Ok(())
    }

    pub(crate) fn push_event(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Remove a node and everything below it.
    ///
    /// Owned geometry and materials are released exactly once, before the
    /// subtree is detached. Release failures are returned (and logged) but
    /// never stop the removal.
    pub fn remove_subtree(
        &mut self,
        id: NodeId,
        resources: &mut dyn GpuResources,
    ) -> Vec<SceneError> {
        let mut errors = Vec::new();
        if id == self.root {
            log::warn!("[scene] refusing to remove the scene root");
            return errors;
        }
        let nodes = self.descendants(id);
        for n in &nodes {
            let Ok(node) = self.node_mut(*n) else {
                continue;
            };
            let mesh = node.mesh.take();
            let material = node.material.take();
            if let Some(mesh) = mesh {
                self.stats.geometry_disposals += 1;
                if let Err(e) = resources.dispose_geometry(mesh.handle) {
                    log::warn!("[scene] {}", e);
                    errors.push(e);
                }
            }
            if let Some(material) = material {
                self.stats.material_disposals += 1;
                if let Err(e) = resources.dispose_material(material.handle) {
                    log::warn!("[scene] {}", e);
                    errors.push(e);
                }
            }
        }
        _ = self.detach(id);
        for n in nodes {
            let slot = &mut self.slots[n.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
            self.stats.nodes_removed += 1;
        }
        errors
    }
}

pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;

    #[test]
    fn removed_ids_do_not_resolve_after_slot_reuse() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let a = g.spawn("a");
        g.attach(g.root(), a).unwrap();
        g.remove_subtree(a, &mut pool);
        let b = g.spawn("b");
        assert!(!g.contains(a));
        assert!(g.contains(b));
        assert_eq!(g.get(b).map(|n| n.name()), Some("b"));
    }

    #[test]
    fn find_child_and_children_filter_by_predicate() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let a = g.find_or_spawn_child(root, "a").unwrap();
        let b = g.find_or_spawn_child(root, "b").unwrap();
        let again = g.find_or_spawn_child(root, "a").unwrap();
        assert_eq!(a, again);
        assert_eq!(g.find_child(root, |n| n.name() == "b"), Some(b));
        assert_eq!(g.find_children(root, |_| true), vec![a, b]);
        assert_eq!(g.find_child(root, |n| n.name() == "c"), None);
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let parent = g.find_or_spawn_child(root, "parent").unwrap();
        let child = g.find_or_spawn_child(parent, "child").unwrap();
        g.set_position(parent, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        g.set_transform(
            child,
            Vec3::new(0.0, 2.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        )
        .unwrap();
        let p = g.world_position(child);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
        let ancestors: Vec<NodeId> = g.ancestors(child).collect();
        assert_eq!(ancestors, vec![child, parent, root]);
    }

    #[test]
    fn remove_subtree_releases_each_resource_once() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let root = g.root();
        let parent = g.find_or_spawn_child(root, "parent").unwrap();
        let child = g.find_or_spawn_child(parent, "child").unwrap();
        g.set_shape(parent, Shape::Sphere { radius: 1.0 }, &mut pool).unwrap();
        g.set_color(parent, [1.0, 1.0, 1.0], &mut pool).unwrap();
        g.set_shape(child, Shape::Sphere { radius: 0.5 }, &mut pool).unwrap();

        let errors = g.remove_subtree(parent, &mut pool);
        assert!(errors.is_empty());
        assert_eq!(pool.counters().geometries_disposed, 2);
        assert_eq!(pool.counters().materials_disposed, 1);
        assert_eq!(pool.live_geometries(), 0);
        assert!(g.children(root).is_empty());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn set_shape_releases_previous_geometry() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let n = g.find_or_spawn_child(g.root(), "n").unwrap();
        g.set_shape(n, Shape::Sphere { radius: 1.0 }, &mut pool).unwrap();
        g.set_shape(n, Shape::Sphere { radius: 2.0 }, &mut pool).unwrap();
        assert_eq!(pool.live_geometries(), 1);
        assert_eq!(pool.counters().geometries_disposed, 1);
        assert_eq!(g.get(n).and_then(|n| n.shape()).cloned(), Some(Shape::Sphere { radius: 2.0 }));
    }
}
