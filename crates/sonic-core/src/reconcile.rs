//! Keyed enter/update/exit join between a model collection and the children
//! of one scene node.
//!
//! Entering items are built by the factory for their kind, attached, tagged
//! with their key and kind, and then run through the same update path as
//! existing nodes (a fresh node starts from empty cached params, so its first
//! update applies in full). Children whose key is absent from the collection
//! are exited after every update has run. Traversal order carries no meaning.
//!
//! Duplicate keys in one collection: the last item with a given key is the
//! one applied; earlier ones are ignored and reported.

use crate::error::SceneError;
use crate::keyed::Key;
use crate::resources::GpuResources;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use fnv::{FnvHashMap, FnvHashSet};

/// Factory and update function for one entity kind.
pub trait NodeBuilder<T> {
    /// Create a detached node for a new item. The reconciler attaches and tags it.
    fn create(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        item: &T,
    ) -> Result<NodeId, SceneError>;

    /// Bring `node` in line with `item`, writing only what differs from the
    /// params it was last updated from.
    fn update(
        &self,
        graph: &mut SceneGraph,
        resources: &mut dyn GpuResources,
        node: NodeId,
        item: &T,
    ) -> Result<(), SceneError>;

    /// Runs right before the node is removed.
    fn exit(&self, _graph: &mut SceneGraph, _node: NodeId) {}
}

pub struct Builders<'b, T> {
    by_kind: FnvHashMap<NodeKind, &'b dyn NodeBuilder<T>>,
}

impl<T> Default for Builders<'_, T> {
    fn default() -> Self {
        Self {
            by_kind: FnvHashMap::default(),
        }
    }
}

impl<'b, T> Builders<'b, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: NodeKind, builder: &'b dyn NodeBuilder<T>) -> Self {
        self.by_kind.insert(kind, builder);
        self
    }

    fn get(&self, kind: NodeKind) -> Option<&'b dyn NodeBuilder<T>> {
        self.by_kind.get(&kind).copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub entered: Vec<Key>,
    pub updated: Vec<Key>,
    pub exited: Vec<Key>,
    pub duplicates: Vec<Key>,
    pub failures: Vec<(Key, SceneError)>,
}

impl ReconcileReport {
    /// No node entered or exited and nothing failed.
    pub fn is_stable(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty() && self.failures.is_empty()
    }

    /// Fold a nested pass into this one.
    pub fn absorb(&mut self, other: ReconcileReport) {
        self.entered.extend(other.entered);
        self.updated.extend(other.updated);
        self.exited.extend(other.exited);
        self.duplicates.extend(other.duplicates);
        self.failures.extend(other.failures);
    }
}

/// Synchronise the keyed children of `parent` with `items`.
///
/// Never fails as a whole: a factory or update error is logged with the
/// offending key, recorded in the report, and that item is skipped for this
/// pass. An existing node whose update failed stays in place.
pub fn reconcile<T>(
    graph: &mut SceneGraph,
    resources: &mut dyn GpuResources,
    parent: NodeId,
    items: &[T],
    key_of: impl Fn(&T) -> Key,
    kind_of: impl Fn(&T) -> NodeKind,
    builders: &Builders<'_, T>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut exiting: Vec<(Key, NodeId)> = Vec::new();

    let mut live: FnvHashMap<Key, NodeId> = FnvHashMap::default();
    for &child in graph.children(parent) {
        let Some(key) = graph.get(child).and_then(|n| n.key()) else {
            continue;
        };
        if live.insert(key, child).is_some() {
            log::warn!("[reconcile] two live children share key {}; retiring one", key);
            exiting.push((key, child));
        }
    }

    let mut last_index: FnvHashMap<Key, usize> = FnvHashMap::default();
    for (i, item) in items.iter().enumerate() {
        let key = key_of(item);
        if last_index.insert(key, i).is_some() && !report.duplicates.contains(&key) {
            log::warn!("[reconcile] duplicate key {}: {}", key, SceneError::DuplicateKey(key));
            report.duplicates.push(key);
        }
    }

    let mut visited: FnvHashSet<Key> = FnvHashSet::default();
    for (i, item) in items.iter().enumerate() {
        let key = key_of(item);
        if last_index.get(&key) != Some(&i) {
            continue;
        }
        let kind = kind_of(item);
        let existing = live.get(&key).copied();

        let Some(builder) = builders.get(kind) else {
            log::warn!("[reconcile] key {}: {}", key, SceneError::UnknownKind(kind));
            if existing.is_some() {
                visited.insert(key);
            }
            report.failures.push((key, SceneError::UnknownKind(kind)));
            continue;
        };

        match existing {
            Some(node) if graph.get(node).and_then(|n| n.kind()) == Some(kind) => {
                visited.insert(key);
                match builder.update(graph, resources, node, item) {
                    Ok(()) => report.updated.push(key),
                    Err(e) => {
                        log::warn!("[reconcile] update failed for key {}: {}", key, e);
                        report.failures.push((key, e));
                    }
                }
            }
            _ => {
                if let Some(replaced) = existing {
                    // same key, different kind: retire the old node before the new one goes live
                    visited.insert(key);
                    retire(graph, resources, builders, replaced);
                    report.exited.push(key);
                }
                match enter(graph, resources, parent, builder, key, kind, item) {
                    Ok(_) => report.entered.push(key),
                    Err(e) => {
                        log::warn!("[reconcile] could not create node for key {}: {}", key, e);
                        report.failures.push((key, e));
                    }
                }
            }
        }
    }

    exiting.extend(live.into_iter().filter(|(key, _)| !visited.contains(key)));
    for (key, node) in exiting {
        retire(graph, resources, builders, node);
        report.exited.push(key);
    }

    if !report.is_stable() {
        log::debug!(
            "[reconcile] entered={:?} exited={:?} failures={}",
            report.entered,
            report.exited,
            report.failures.len()
        );
    }
    report
}

/// Exit hook first, then release the subtree's resources, then detach.
fn retire<T>(
    graph: &mut SceneGraph,
    resources: &mut dyn GpuResources,
    builders: &Builders<'_, T>,
    node: NodeId,
) {
    let kind = graph.get(node).and_then(|n| n.kind());
    if let Some(builder) = kind.and_then(|k| builders.get(k)) {
        builder.exit(graph, node);
    }
    graph.remove_subtree(node, resources);
}

fn enter<T>(
    graph: &mut SceneGraph,
    resources: &mut dyn GpuResources,
    parent: NodeId,
    builder: &dyn NodeBuilder<T>,
    key: Key,
    kind: NodeKind,
    item: &T,
) -> Result<NodeId, SceneError> {
    let node = builder.create(graph, resources, item)?;
    let attached = graph.attach(parent, node).and_then(|()| graph.set_tag(node, kind, key));
    let result = attached.and_then(|()| builder.update(graph, resources, node, item));
    if let Err(e) = result {
        graph.remove_subtree(node, resources);
        return Err(e);
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;
    use crate::scene::Shape;
    use glam::Vec3;
    use std::cell::RefCell;

    #[derive(Clone)]
    struct Dot {
        key: Key,
        x: f32,
        broken: bool,
    }

    struct DotBuilder;

    impl NodeBuilder<Dot> for DotBuilder {
        fn create(
            &self,
            graph: &mut SceneGraph,
            resources: &mut dyn GpuResources,
            _item: &Dot,
        ) -> Result<NodeId, SceneError> {
            let node = graph.spawn("dot");
            graph.set_shape(node, Shape::Sphere { radius: 0.1 }, resources)?;
            Ok(node)
        }

        fn update(
            &self,
            graph: &mut SceneGraph,
            _: &mut dyn GpuResources,
            node: NodeId,
            item: &Dot,
        ) -> Result<(), SceneError> {
            if item.broken {
                return Err(SceneError::node_update(item.key, "broken on purpose"));
            }
            let current = graph.get(node).map(|n| n.position());
            if current != Some(Vec3::new(item.x, 0.0, 0.0)) {
                graph.set_position(node, Vec3::new(item.x, 0.0, 0.0))?;
            }
            Ok(())
        }
    }

    /// Records, for every exit, whether the node was still attached and
    /// still held its geometry.
    #[derive(Default)]
    struct WatchedDotBuilder {
        exits: RefCell<Vec<(bool, bool)>>,
    }

    impl NodeBuilder<Dot> for WatchedDotBuilder {
        fn create(
            &self,
            graph: &mut SceneGraph,
            resources: &mut dyn GpuResources,
            item: &Dot,
        ) -> Result<NodeId, SceneError> {
            DotBuilder.create(graph, resources, item)
        }

        fn update(
            &self,
            graph: &mut SceneGraph,
            resources: &mut dyn GpuResources,
            node: NodeId,
            item: &Dot,
        ) -> Result<(), SceneError> {
            DotBuilder.update(graph, resources, node, item)
        }

        fn exit(&self, graph: &mut SceneGraph, node: NodeId) {
            let attached = graph.parent(node).is_some();
            let has_shape = graph.get(node).and_then(|n| n.shape()).is_some();
            self.exits.borrow_mut().push((attached, has_shape));
        }
    }

    fn dot(key: Key, x: f32) -> Dot {
        Dot { key, x, broken: false }
    }

    fn run(graph: &mut SceneGraph, pool: &mut ResourcePool, items: &[Dot]) -> ReconcileReport {
        let builders = Builders::<Dot>::new().with(NodeKind::SoundObject, &DotBuilder);
        run_as(graph, pool, items, NodeKind::SoundObject, &builders)
    }

    /// Reconcile `items` under the root, all of them declared as `kind`.
    fn run_as(
        graph: &mut SceneGraph,
        pool: &mut ResourcePool,
        items: &[Dot],
        kind: NodeKind,
        builders: &Builders<'_, Dot>,
    ) -> ReconcileReport {
        let root = graph.root();
        reconcile(graph, pool, root, items, |d| d.key, |_| kind, builders)
    }

    #[test]
    fn duplicate_keys_apply_last_item_only() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let report = run(&mut g, &mut pool, &[dot(1, 1.0), dot(1, 5.0)]);
        assert_eq!(report.entered, vec![1]);
        assert_eq!(report.duplicates, vec![1]);
        let children = g.children(g.root()).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(g.get(children[0]).map(|n| n.position().x), Some(5.0));
    }

    #[test]
    fn failing_item_is_skipped_and_others_proceed() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let mut bad = dot(2, 2.0);
        bad.broken = true;
        let report = run(&mut g, &mut pool, &[dot(1, 1.0), bad, dot(3, 3.0)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 2);
        let mut entered = report.entered.clone();
        entered.sort_unstable();
        assert_eq!(entered, vec![1, 3]);
        assert_eq!(g.children(g.root()).len(), 2);
        // the half-built node was released again
        assert_eq!(pool.live_geometries(), 2);
    }

    #[test]
    fn failed_update_keeps_existing_node() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        run(&mut g, &mut pool, &[dot(1, 1.0)]);
        let mut bad = dot(1, 9.0);
        bad.broken = true;
        let report = run(&mut g, &mut pool, &[bad]);
        assert!(report.exited.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(g.children(g.root()).len(), 1);
    }

    #[test]
    fn missing_builder_is_reported_per_item() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let builders: Builders<'_, Dot> = Builders::new();
        let report = run_as(&mut g, &mut pool, &[dot(1, 0.0)], NodeKind::Cone, &builders);
        assert_eq!(report.failures, vec![(1, SceneError::UnknownKind(NodeKind::Cone))]);
        assert!(g.children(g.root()).is_empty());
    }

    #[test]
    fn kind_change_replaces_node() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        run(&mut g, &mut pool, &[dot(1, 1.0)]);
        let before = g.children(g.root())[0];
        let builders = Builders::<Dot>::new().with(NodeKind::Cone, &DotBuilder);
        let report = run_as(&mut g, &mut pool, &[dot(1, 1.0)], NodeKind::Cone, &builders);
        assert_eq!(report.entered, vec![1]);
        assert_eq!(report.exited, vec![1]);
        let after = g.children(g.root()).to_vec();
        assert_eq!(after.len(), 1);
        assert_ne!(after[0], before);
        assert_eq!(g.get(after[0]).and_then(|n| n.kind()), Some(NodeKind::Cone));
        assert_eq!(pool.live_geometries(), 1);
    }

    #[test]
    fn replaced_node_is_released_while_still_attached() {
        let mut g = SceneGraph::new();
        let mut pool = ResourcePool::new();
        let watched = WatchedDotBuilder::default();
        let first = Builders::<Dot>::new().with(NodeKind::SoundObject, &watched);
        run_as(&mut g, &mut pool, &[dot(1, 1.0)], NodeKind::SoundObject, &first);

        let second = Builders::<Dot>::new()
            .with(NodeKind::SoundObject, &watched)
            .with(NodeKind::Cone, &DotBuilder);
        let report = run_as(&mut g, &mut pool, &[dot(1, 1.0)], NodeKind::Cone, &second);
        assert_eq!(report.exited, vec![1]);
        assert_eq!(report.entered, vec![1]);
        assert_eq!(*watched.exits.borrow(), vec![(true, true)]);
        assert_eq!(pool.counters().geometries_disposed, 1);
        assert_eq!(g.children(g.root()).len(), 1);
    }
}
