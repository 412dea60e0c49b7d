use glam::Vec3;
use sonic_core::{Camera, Key, SceneEvent};
use std::collections::BTreeMap;
use web_sys as web;

/// Web-Audio side of the editor: the listener follows the camera and cone
/// file assignments are tracked for the asset loader.
pub struct AudioStage {
    ctx: web::AudioContext,
    listener: web::AudioListener,
    last_pose: Option<(Vec3, Vec3)>,
    sources: BTreeMap<(Key, Key), String>,
}

impl AudioStage {
    pub fn new() -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new().map_err(|e| anyhow::anyhow!("AudioContext: {:?}", e))?;
        let listener = ctx.listener();
        Ok(Self {
            ctx,
            listener,
            last_pose: None,
            sources: BTreeMap::new(),
        })
    }

    /// Browsers keep the context suspended until a user gesture resumes it.
    pub fn context(&self) -> &web::AudioContext {
        &self.ctx
    }

    #[allow(deprecated)]
    pub fn sync_listener(&mut self, camera: &Camera) {
        let forward = (camera.target - camera.eye).normalize_or_zero();
        if self.last_pose == Some((camera.eye, forward)) {
            return;
        }
        self.last_pose = Some((camera.eye, forward));
        let (e, f, u) = (camera.eye, forward, camera.up);
        self.listener.set_position(e.x as f64, e.y as f64, e.z as f64);
        self.listener.set_orientation(
            f.x as f64, f.y as f64, f.z as f64, u.x as f64, u.y as f64, u.z as f64,
        );
    }

    pub fn handle(&mut self, events: &[SceneEvent]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            match event {
                SceneEvent::ConeSourceChanged { object, cone, file } => match file {
                    Some(name) => {
                        log::info!("[audio] object {} cone {} -> {}", object, cone, name);
                        self.sources.insert((*object, *cone), name.clone());
                    }
                    None => {
                        log::info!("[audio] object {} cone {} cleared", object, cone);
                        self.sources.remove(&(*object, *cone));
                    }
                },
                SceneEvent::ConeRemoved { object, cone } => {
                    if self.sources.remove(&(*object, *cone)).is_some() {
                        log::info!("[audio] released source for object {} cone {}", object, cone);
                    }
                }
                SceneEvent::SurfaceResized { .. } => {}
            }
        }
        log::debug!("[audio] {} cone source(s) assigned", self.sources.len());
    }
}
