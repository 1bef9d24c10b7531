//! CPU-side scene description: plane geometry, shader materials, meshes.
//!
//! GPU buffers for these objects live in the drawing backend, keyed by
//! [`GeometryId`] and [`MaterialId`]; disposing an id tells the backend to
//! release them.

use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(u64);

impl GeometryId {
    pub fn next() -> Self {
        Self(next_resource_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(u64);

impl MaterialId {
    pub fn next() -> Self {
        Self(next_resource_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Flat rectangle in the XY plane, centred on the origin and subdivided into
/// a regular grid.
#[derive(Debug, Clone)]
pub struct PlaneGeometry {
    id: GeometryId,
    width: f32,
    height: f32,
    segments: (u32, u32),
    vertices: Vec<PlaneVertex>,
    indices: Vec<u32>,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let columns = grid_x + 1;
        let rows = grid_y + 1;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        let mut vertices = Vec::with_capacity((columns * rows) as usize);
        for iy in 0..rows {
            let y = height * 0.5 - iy as f32 * segment_height;
            for ix in 0..columns {
                let x = ix as f32 * segment_width - width * 0.5;
                vertices.push(PlaneVertex {
                    position: [x, y, 0.0],
                    uv: [ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + columns * iy;
                let b = ix + columns * (iy + 1);
                let c = (ix + 1) + columns * (iy + 1);
                let d = (ix + 1) + columns * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            id: GeometryId::next(),
            width,
            height,
            segments: (grid_x, grid_y),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn segments(&self) -> (u32, u32) {
        self.segments
    }

    pub fn vertices(&self) -> &[PlaneVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Uniform values consumed by the distortion shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionUniforms {
    /// Noise field clock; never decreases.
    pub time: f32,
    /// Viewport width over height.
    pub aspect: f32,
    /// Smoothed pointer position in `[0, 1]²`, origin bottom-left.
    pub mouse_position: Vec2,
    /// Smoothed pointer activity in `[0, 1]`.
    pub mouse_intensity: f32,
}

impl DistortionUniforms {
    pub fn new(aspect: f32) -> Self {
        Self {
            time: 0.0,
            aspect,
            mouse_position: Vec2::splat(0.5),
            mouse_intensity: 0.0,
        }
    }
}

/// Shader-backed material owning its uniform state.
#[derive(Debug, Clone)]
pub struct ShaderMaterial {
    id: MaterialId,
    pub uniforms: DistortionUniforms,
}

impl ShaderMaterial {
    pub fn new(uniforms: DistortionUniforms) -> Self {
        Self {
            id: MaterialId::next(),
            uniforms,
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: PlaneGeometry,
    pub material: ShaderMaterial,
    pub scale: Vec3,
}

impl Mesh {
    pub fn new(geometry: PlaneGeometry, material: ShaderMaterial) -> Self {
        Self {
            geometry,
            material,
            scale: Vec3::ONE,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
    }
}

/// Flat list of meshes drawn in insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<(MeshId, Mesh)>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.meshes.push((id, mesh));
        id
    }

    /// Detaches a mesh and hands it back; `None` if it was already removed.
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        let index = self.meshes.iter().position(|(mesh_id, _)| *mesh_id == id)?;
        Some(self.meshes.remove(index).1)
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes
            .iter()
            .find(|(mesh_id, _)| *mesh_id == id)
            .map(|(_, mesh)| mesh)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes
            .iter_mut()
            .find(|(mesh_id, _)| *mesh_id == id)
            .map(|(_, mesh)| mesh)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter().map(|(_, mesh)| mesh)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
