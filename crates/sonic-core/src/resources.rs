//! GPU-side resources owned by scene nodes.
//!
//! The renderer is an external collaborator, so resources are modelled as
//! opaque handles handed out by a [`GpuResources`] implementation. The
//! in-memory [`ResourcePool`] tracks live handles and counts every creation
//! and release; a double release is reported as an error.

use crate::error::SceneError;
use crate::scene::Shape;
use fnv::FnvHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

pub trait GpuResources {
    fn create_geometry(&mut self, shape: &Shape) -> Result<GeometryHandle, SceneError>;
    fn dispose_geometry(&mut self, handle: GeometryHandle) -> Result<(), SceneError>;
    fn create_material(&mut self, color: [f32; 3]) -> Result<MaterialHandle, SceneError>;
    fn set_material_color(
        &mut self,
        handle: MaterialHandle,
        color: [f32; 3],
    ) -> Result<(), SceneError>;
    fn dispose_material(&mut self, handle: MaterialHandle) -> Result<(), SceneError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolCounters {
    pub geometries_created: u64,
    pub geometries_disposed: u64,
    pub materials_created: u64,
    pub materials_disposed: u64,
    pub material_updates: u64,
}

#[derive(Debug, Default)]
pub struct ResourcePool {
    next_handle: u64,
    geometries: FnvHashMap<u64, Shape>,
    materials: FnvHashMap<u64, [f32; 3]>,
    counters: PoolCounters,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> PoolCounters {
        self.counters
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Shape> {
        self.geometries.get(&handle.0)
    }

    pub fn material_color(&self, handle: MaterialHandle) -> Option<[f32; 3]> {
        self.materials.get(&handle.0).copied()
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuResources for ResourcePool {
    fn create_geometry(&mut self, shape: &Shape) -> Result<GeometryHandle, SceneError> {
        let id = self.allocate();
        self.geometries.insert(id, shape.clone());
        self.counters.geometries_created += 1;
        Ok(GeometryHandle(id))
    }

    fn dispose_geometry(&mut self, handle: GeometryHandle) -> Result<(), SceneError> {
        match self.geometries.remove(&handle.0) {
            Some(_) => {
                self.counters.geometries_disposed += 1;
                Ok(())
            }
            None => Err(SceneError::ResourceDisposal {
                handle: handle.0,
                reason: "geometry is not live".into(),
            }),
        }
    }

    fn create_material(&mut self, color: [f32; 3]) -> Result<MaterialHandle, SceneError> {
        let id = self.allocate();
        self.materials.insert(id, color);
        self.counters.materials_created += 1;
        Ok(MaterialHandle(id))
    }

    fn set_material_color(
        &mut self,
        handle: MaterialHandle,
        color: [f32; 3],
    ) -> Result<(), SceneError> {
        match self.materials.get_mut(&handle.0) {
            Some(c) => {
                *c = color;
                self.counters.material_updates += 1;
                Ok(())
            }
            None => Err(SceneError::Resource(format!("material {} is not live", handle.0))),
        }
    }

    fn dispose_material(&mut self, handle: MaterialHandle) -> Result<(), SceneError> {
        match self.materials.remove(&handle.0) {
            Some(_) => {
                self.counters.materials_disposed += 1;
                Ok(())
            }
            None => Err(SceneError::ResourceDisposal {
                handle: handle.0,
                reason: "material is not live".into(),
            }),
        }
    }
}
