use crate::camera::Camera;
use crate::scene::SceneGraph;

/// Sink for a fully reconciled scene. Called once per tick.
pub trait Renderer {
    fn render(&mut self, scene: &SceneGraph, camera: &Camera);
}

/// Renderer that only counts frames. Used headless and in tests.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: u64,
    pub last_node_count: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, scene: &SceneGraph, _camera: &Camera) {
        self.frames += 1;
        self.last_node_count = scene.len();
    }
}
