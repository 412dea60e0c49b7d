//! Platform-free core of the sound room editor: model, scene graph,
//! keyed reconciler, picking, gestures and the session that wires them.

pub mod camera;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod gesture;
pub mod keyed;
pub mod model;
pub mod nodes;
pub mod picking;
pub mod reconcile;
pub mod render;
pub mod resources;
pub mod scene;
pub mod session;
pub mod signal;
pub mod surface;

pub use camera::{Camera, CameraRig, CameraView};
pub use coordinator::{resolve_target, Coordinator, ModeState, Target, UiCommand};
pub use error::SceneError;
pub use gesture::{DragMachine, GestureEvent, GestureKind, GesturePoint, PointerPhase};
pub use keyed::{Key, Keyed};
pub use model::{Command, Cone, Floor, Model, Screen, Selection, SoundObject};
pub use nodes::{sync_scene, CachedParams, SyncReport};
pub use picking::{pick, Intersection, PickResult, Ray, TargetGroup};
pub use reconcile::{reconcile, Builders, NodeBuilder, ReconcileReport};
pub use render::{NullRenderer, Renderer};
pub use resources::{GeometryHandle, GpuResources, MaterialHandle, ResourcePool};
pub use scene::{NodeId, NodeKind, SceneEvent, SceneGraph, SceneNode, SceneStats, Shape};
pub use session::{Session, SessionConfig, TickReport};
pub use signal::{combine_latest, switch_latest, EventStream, Signal, Subscription};
pub use surface::{SurfaceMetrics, Surfaces};
