use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::scene::Mesh;

/// std140 mirror of the `MeshUniforms` block declared in the shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub mouse_position: [f32; 2],
    pub time: f32,
    pub aspect: f32,
    pub mouse_intensity: f32,
    pub _padding: [f32; 3],
}

impl MeshUniforms {
    pub fn new(view_projection: Mat4, mesh: &Mesh) -> Self {
        let uniforms = &mesh.material.uniforms;
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            model: mesh.model_matrix().to_cols_array_2d(),
            mouse_position: uniforms.mouse_position.to_array(),
            time: uniforms.time,
            aspect: uniforms.aspect,
            mouse_intensity: uniforms.mouse_intensity,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::scene::{DistortionUniforms, PlaneGeometry, ShaderMaterial};

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 160);
        assert_eq!(std::mem::offset_of!(MeshUniforms, model), 64);
        assert_eq!(std::mem::offset_of!(MeshUniforms, mouse_position), 128);
        assert_eq!(std::mem::offset_of!(MeshUniforms, time), 136);
        assert_eq!(std::mem::offset_of!(MeshUniforms, aspect), 140);
        assert_eq!(std::mem::offset_of!(MeshUniforms, mouse_intensity), 144);
    }

    #[test]
    fn copies_material_state_and_scale() {
        let mut material = ShaderMaterial::new(DistortionUniforms::new(2.0));
        material.uniforms.time = 1.5;
        material.uniforms.mouse_position = Vec2::new(0.25, 0.75);
        material.uniforms.mouse_intensity = 0.4;
        let mut mesh = Mesh::new(PlaneGeometry::new(2.0, 1.0, 1, 1), material);
        mesh.scale = Vec3::new(2.0, 1.0, 1.0);

        let uniforms = MeshUniforms::new(Mat4::IDENTITY, &mesh);
        assert_eq!(uniforms.time, 1.5);
        assert_eq!(uniforms.aspect, 2.0);
        assert_eq!(uniforms.mouse_position, [0.25, 0.75]);
        assert_eq!(uniforms.mouse_intensity, 0.4);
        assert_eq!(uniforms.model[0][0], 2.0);
        assert_eq!(uniforms.view_projection, Mat4::IDENTITY.to_cols_array_2d());
    }
}
