//! One authoring session: model, scene, camera and the wiring between them.
//!
//! Input flows pointer → surface metrics → pick → gesture machine →
//! coordinator → commands. Commands are folded into the model store (or
//! routed to the camera rig) as they arrive; the scene is reconciled against
//! the latest snapshot once per tick, then rendered.

use crate::camera::{Camera, CameraRig, CameraView};
use crate::constants::{FLOOR_GROUP, OBJECTS_GROUP};
use crate::coordinator::{Coordinator, ModeState, UiCommand};
use crate::error::SceneError;
use crate::gesture::{DragMachine, GestureEvent, GestureKind, GesturePoint, PointerPhase};
use crate::model::{Command, Model};
use crate::nodes::{sync_scene, Containers, SurfaceItem, SyncReport};
use crate::picking::{pick, TargetGroup};
use crate::render::Renderer;
use crate::resources::GpuResources;
use crate::scene::{NodeKind, SceneEvent, SceneGraph};
use crate::signal::{combine_latest, switch_latest, EventStream, Signal, Subscription};
use crate::surface::{SurfaceMetrics, Surfaces};
use fnv::FnvHashMap;
use glam::Vec2;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Surfaces accepting pointer input, registered with a zero size.
    pub surfaces: Vec<&'static str>,
    pub floor_group: &'static str,
    pub objects_group: &'static str,
    pub initial_view: CameraView,
    pub transition_secs: f32,
    pub aspect: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            surfaces: vec!["main"],
            floor_group: FLOOR_GROUP,
            objects_group: OBJECTS_GROUP,
            initial_view: CameraView::Perspective,
            transition_secs: crate::constants::TRANSITION_SECS,
            aspect: 16.0 / 9.0,
        }
    }
}

/// Latest model snapshot. Only the newest one is ever reconciled.
struct ModelStore {
    current: Model,
    dirty: bool,
}

/// Everything a pick needs. Absent until the first reconcile has produced targets.
#[derive(Clone, Debug, PartialEq)]
struct PickContext {
    camera: Camera,
    groups: Rc<Vec<TargetGroup>>,
}

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Present when the scene was reconciled this tick.
    pub sync: Option<SyncReport>,
    pub camera_moved: bool,
}

pub struct Session {
    config: SessionConfig,
    store: Rc<RefCell<ModelStore>>,
    graph: Rc<RefCell<SceneGraph>>,
    resources: Box<dyn GpuResources>,
    rig: Rc<RefCell<CameraRig>>,
    coordinator: Rc<RefCell<Coordinator>>,
    surfaces: Surfaces,
    surfaces_dirty: bool,
    machines: FnvHashMap<&'static str, DragMachine>,
    gestures: EventStream<GestureEvent>,
    commands: EventStream<Command>,
    camera: Signal<Camera>,
    camera_mode: Signal<(CameraView, bool)>,
    targets: Signal<Option<Rc<Vec<TargetGroup>>>>,
    pick_context: Signal<Option<PickContext>>,
    active_drag: EventStream<GestureEvent>,
    events: Vec<SceneEvent>,
    _wiring: Vec<Subscription>,
}

impl Session {
    pub fn new(config: SessionConfig, resources: Box<dyn GpuResources>) -> Self {
        Self::with_model(config, resources, Model::default())
    }

    pub fn with_model(
        config: SessionConfig,
        resources: Box<dyn GpuResources>,
        model: Model,
    ) -> Self {
        let mut rig = CameraRig::new(config.aspect).with_transition_secs(config.transition_secs);
        rig.snap_to(config.initial_view);
        let camera = Signal::new(rig.camera());
        let camera_mode = Signal::new((rig.view(), rig.is_top_down()));
        let rig = Rc::new(RefCell::new(rig));

        let store = Rc::new(RefCell::new(ModelStore {
            current: model,
            dirty: true,
        }));
        let graph = Rc::new(RefCell::new(SceneGraph::new()));
        let mut coordinator = Coordinator::new(config.floor_group, config.objects_group);
        camera_mode.with(|(heading, top_down)| coordinator.set_camera_state(*heading, *top_down));
        let coordinator = Rc::new(RefCell::new(coordinator));

        let targets: Signal<Option<Rc<Vec<TargetGroup>>>> = Signal::new(None);
        let pick_context = combine_latest(&camera, &targets, |camera, groups| {
            groups.as_ref().map(|groups| PickContext {
                camera: camera.clone(),
                groups: groups.clone(),
            })
        });

        let gestures = EventStream::new();
        let commands = EventStream::new();
        let drag_sessions: EventStream<EventStream<GestureEvent>> = EventStream::new();
        let active_drag = switch_latest(&drag_sessions);
        let mut wiring = Vec::new();

        // commands: fold into the model or steer the camera
        wiring.push({
            let store = store.clone();
            let rig = rig.clone();
            commands.subscribe(move |cmd: &Command| match cmd {
                Command::RequestView(view) => {
                    rig.borrow_mut().request(*view);
                }
                Command::OrbitCamera(delta) => rig.borrow_mut().orbit(*delta),
                Command::PanCamera(delta) => rig.borrow_mut().pan(*delta),
                _ => {
                    let mut s = store.borrow_mut();
                    let current = std::mem::take(&mut s.current);
                    s.current = current.apply(cmd);
                    s.dirty = true;
                }
            })
        });

        // camera state feeds the mode coordinator
        wiring.push({
            let coordinator = coordinator.clone();
            camera_mode.subscribe(move |(heading, top_down)| {
                coordinator.borrow_mut().set_camera_state(*heading, *top_down);
            })
        });

        // dragstart opens a new drag session; drag/dragend go to the open one
        wiring.push({
            let open: Rc<RefCell<Option<EventStream<GestureEvent>>>> = Rc::new(RefCell::new(None));
            let coordinator = coordinator.clone();
            let graph = graph.clone();
            let commands = commands.clone();
            gestures.subscribe(move |event: &GestureEvent| match event.kind {
                GestureKind::DragStart => {
                    let inner = EventStream::new();
                    *open.borrow_mut() = Some(inner.clone());
                    drag_sessions.emit(&inner);
                    let cmds = coordinator.borrow_mut().begin_drag(event, &graph.borrow());
                    for cmd in &cmds {
                        commands.emit(cmd);
                    }
                }
                GestureKind::Drag | GestureKind::DragEnd => {
                    let inner = open.borrow().clone();
                    if let Some(inner) = inner {
                        inner.emit(event);
                    }
                    if event.kind == GestureKind::DragEnd {
                        *open.borrow_mut() = None;
                    }
                }
                GestureKind::Click | GestureKind::Move => {}
            })
        });

        // only the newest drag session reaches the coordinator
        wiring.push({
            let coordinator = coordinator.clone();
            let store = store.clone();
            let rig = rig.clone();
            let commands = commands.clone();
            active_drag.subscribe(move |event: &GestureEvent| {
                let camera = rig.borrow().camera();
                let cmds = {
                    let store = store.borrow();
                    coordinator.borrow_mut().continue_drag(event, &store.current, &camera)
                };
                for cmd in &cmds {
                    commands.emit(cmd);
                }
            })
        });

        let mut surfaces = Surfaces::new();
        let mut machines = FnvHashMap::default();
        for &name in &config.surfaces {
            surfaces.resize(name, SurfaceMetrics::default());
            machines.insert(name, DragMachine::new());
        }

        log::info!("[session] ready with {} surface(s)", config.surfaces.len());
        Self {
            config,
            store,
            graph,
            resources,
            rig,
            coordinator,
            surfaces,
            surfaces_dirty: true,
            machines,
            gestures,
            commands,
            camera,
            camera_mode,
            targets,
            pick_context,
            active_drag,
            events: Vec::new(),
            _wiring: wiring,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Record a surface's pixel size. Takes effect on the next pick.
    pub fn resize(&mut self, surface: &'static str, width: u32, height: u32) {
        let metrics = SurfaceMetrics::new(width, height);
        if !self.surfaces.resize(surface, metrics) {
            return;
        }
        self.machines.entry(surface).or_default();
        self.surfaces_dirty = true;
        if self.config.surfaces.first() == Some(&surface) && height > 0 {
            self.rig.borrow_mut().set_aspect(metrics.aspect());
        }
    }

    /// Feed one raw pointer event at pixel position `px` on `surface`.
    ///
    /// Nothing is emitted until the scene has been reconciled once and the
    /// surface has a size: a pick against missing state is withheld, not failed.
    pub fn pointer(&mut self, surface: &'static str, pointer: u32, phase: PointerPhase, px: Vec2) {
        let Some(metrics) = self.surfaces.get(surface) else {
            log::debug!("[session] pointer event for unknown surface `{}`", surface);
            return;
        };
        let Some(ndc) = metrics.to_ndc(px) else {
            log::debug!("[pick] surface `{}` has no size yet", surface);
            return;
        };
        let Some(ctx) = self.pick_context.get() else {
            log::debug!("[pick] not ready");
            return;
        };
        let result = pick(&self.graph.borrow(), &ctx.camera, ndc, &ctx.groups);
        let point = GesturePoint {
            pointer,
            ndc,
            pick: Rc::new(result),
        };
        let events = self.machines.entry(surface).or_default().feed(phase, point);
        for event in &events {
            self.gestures.emit(event);
        }
    }

    pub fn ui(&mut self, command: UiCommand) {
        let cmds = self.coordinator.borrow_mut().ui(command, &self.store.borrow().current);
        for cmd in &cmds {
            self.commands.emit(cmd);
        }
    }

    /// Apply a command directly, e.g. a cone file chosen outside the canvas.
    pub fn command(&self, command: Command) {
        self.commands.emit(&command);
    }

    /// Advance the camera, reconcile the latest snapshot if anything changed
    /// and render once.
    pub fn tick(&mut self, dt: f32, renderer: &mut dyn Renderer) -> TickReport {
        self.rig.borrow_mut().tick(dt);
        let (camera, mode) = {
            let rig = self.rig.borrow();
            (rig.camera(), (rig.view(), rig.is_top_down()))
        };
        let camera_moved = self.camera.set_if_changed(camera.clone());
        self.camera_mode.set_if_changed(mode);

        let model_dirty = std::mem::take(&mut self.store.borrow_mut().dirty);
        let needs_sync = model_dirty || camera_moved || std::mem::take(&mut self.surfaces_dirty);
        let sync = if needs_sync {
            let snapshot = self.store.borrow().current.clone();
            Some(self.sync(&snapshot, &camera))
        } else {
            None
        };

        self.events.extend(self.graph.borrow_mut().drain_events());
        renderer.render(&self.graph.borrow(), &camera);
        TickReport { sync, camera_moved }
    }

    fn sync(&mut self, model: &Model, camera: &Camera) -> SyncReport {
        let surfaces: Vec<SurfaceItem> = self
            .surfaces
            .entries()
            .into_iter()
            .map(|(key, name, m)| SurfaceItem {
                key,
                name,
                width: m.width,
                height: m.height,
            })
            .collect();
        let mut graph = self.graph.borrow_mut();
        let resources = self.resources.as_mut();
        let report = match sync_scene(&mut graph, resources, model, camera, &surfaces) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("[session] scene sync failed: {}", e);
                return SyncReport::default();
            }
        };
        match self.target_groups(&graph) {
            Ok(groups) => {
                self.targets.set_if_changed(Some(Rc::new(groups)));
            }
            Err(e) => log::warn!("[session] {}", e),
        }
        report
    }

    fn target_groups(&self, graph: &SceneGraph) -> Result<Vec<TargetGroup>, SceneError> {
        let root = graph.root();
        let containers = [
            crate::constants::ROOM_CONTAINER,
            crate::constants::OBJECTS_CONTAINER,
        ]
        .map(|name| graph.find_child(root, |n| n.name() == name));
        let [Some(room), Some(objects)] = containers else {
            return Err(SceneError::MissingGroup(self.config.floor_group));
        };
        let floors = graph.find_children(room, |n| n.kind() == Some(NodeKind::Floor));
        if floors.is_empty() {
            log::debug!("[pick] {}", SceneError::MissingGroup(self.config.floor_group));
        }
        let objects = graph.find_children(objects, |n| n.kind() == Some(NodeKind::SoundObject));
        Ok(vec![
            TargetGroup::new(self.config.floor_group, floors, false),
            TargetGroup::new(self.config.objects_group, objects, true),
        ])
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn model(&self) -> Model {
        self.store.borrow().current.clone()
    }

    pub fn graph(&self) -> Ref<'_, SceneGraph> {
        self.graph.borrow()
    }

    pub fn containers(&self) -> Option<Containers> {
        let graph = self.graph.borrow();
        let root = graph.root();
        let find = |name: &str| graph.find_child(root, |n| n.name() == name);
        Some(Containers {
            room: find(crate::constants::ROOM_CONTAINER)?,
            objects: find(crate::constants::OBJECTS_CONTAINER)?,
            trajectories: find(crate::constants::TRAJECTORIES_CONTAINER)?,
            cameras: find(crate::constants::CAMERAS_CONTAINER)?,
            surfaces: find(crate::constants::SURFACES_CONTAINER)?,
        })
    }

    pub fn camera(&self) -> Camera {
        self.camera.get()
    }

    pub fn camera_view(&self) -> CameraView {
        self.rig.borrow().view()
    }

    pub fn mode(&self) -> ModeState {
        self.coordinator.borrow().mode()
    }

    pub fn is_dragging(&self, surface: &str) -> bool {
        self.machines.get(surface).is_some_and(|m| m.is_dragging())
    }

    /// Observe every command, including those the coordinator derives from gestures.
    pub fn on_command(&self, f: impl FnMut(&Command) + 'static) -> Subscription {
        self.commands.subscribe(f)
    }

    /// Observe gestures from every surface.
    pub fn on_gesture(&self, f: impl FnMut(&GestureEvent) + 'static) -> Subscription {
        self.gestures.subscribe(f)
    }

    /// Observe `drag`/`dragend` of the newest drag only.
    pub fn on_active_drag(&self, f: impl FnMut(&GestureEvent) + 'static) -> Subscription {
        self.active_drag.subscribe(f)
    }
}
