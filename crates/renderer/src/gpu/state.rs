use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::scene::{GeometryId, MaterialId, Mesh, PlaneGeometry, Scene};
use crate::surface::SurfaceBackend;
use crate::types::{Antialiasing, Viewport};

use super::context::GpuContext;
use super::pipeline::MeshPipeline;
use super::uniforms::MeshUniforms;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct GeometryBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GeometryBuffers {
    fn new(device: &wgpu::Device, geometry: &PlaneGeometry) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane vertices"),
            contents: bytemuck::cast_slice(geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane indices"),
            contents: bytemuck::cast_slice(geometry.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices,
            indices,
            index_count: geometry.indices().len() as u32,
        }
    }

    fn destroy(self) {
        self.vertices.destroy();
        self.indices.destroy();
    }
}

struct MaterialBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl MaterialBinding {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("material uniforms"),
            size: std::mem::size_of::<MeshUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn destroy(self) {
        self.buffer.destroy();
    }
}

/// Frame pacing statistics logged once per second.
struct FrameStats {
    frames: u32,
    since: Instant,
}

impl FrameStats {
    fn record(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            tracing::debug!(fps = fps.round(), "render stats");
            self.frames = 0;
            self.since = now;
        }
    }
}

/// wgpu implementation of [`SurfaceBackend`] drawing into a window.
///
/// Vertex/index buffers and uniform bind groups are created the first time a
/// geometry or material is drawn and live until they are disposed.
pub struct GpuBackend {
    context: Option<GpuContext>,
    pipeline: MeshPipeline,
    multisample_target: Option<MultisampleTarget>,
    geometries: HashMap<GeometryId, GeometryBuffers>,
    materials: HashMap<MaterialId, MaterialBinding>,
    stats: FrameStats,
}

impl GpuBackend {
    pub fn new(
        window: Arc<Window>,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
    ) -> Result<Self> {
        let context = GpuContext::new(window, initial_size, antialiasing)?;
        let pipeline = MeshPipeline::new(
            &context.device,
            context.surface_format,
            context.sample_count,
        );
        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        Ok(Self {
            context: Some(context),
            pipeline,
            multisample_target,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            stats: FrameStats {
                frames: 0,
                since: Instant::now(),
            },
        })
    }

    /// Reconfigures the swapchain after `Lost`/`Outdated`.
    pub fn recover_surface(&self) {
        if let Some(context) = self.context.as_ref() {
            context.reconfigure();
        }
    }

    fn prepare_mesh(&mut self, mesh: &Mesh, view_projection: Mat4) -> Result<()> {
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| anyhow!("GPU backend already disposed"))?;
        self.geometries
            .entry(mesh.geometry.id())
            .or_insert_with(|| GeometryBuffers::new(&context.device, &mesh.geometry));
        let binding = self
            .materials
            .entry(mesh.material.id())
            .or_insert_with(|| MaterialBinding::new(&context.device, &self.pipeline.uniform_layout));
        let uniforms = MeshUniforms::new(view_projection, mesh);
        context
            .queue
            .write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&uniforms));
        Ok(())
    }
}

impl SurfaceBackend for GpuBackend {
    fn configure(&mut self, viewport: Viewport) -> Result<()> {
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        let (width, height) = viewport.physical_size();
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "skipping swapchain resize for empty viewport");
            return Ok(());
        }
        context.resize(PhysicalSize::new(width, height));
        self.multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        Ok(())
    }

    fn draw(&mut self, scene: &Scene, view_projection: Mat4) -> Result<()> {
        for mesh in scene.meshes() {
            self.prepare_mesh(mesh, view_projection)?;
        }

        let context = self
            .context
            .as_ref()
            .ok_or_else(|| anyhow!("GPU backend already disposed"))?;
        let frame = context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let (attachment_view, resolve_target) =
                if let Some(msaa) = self.multisample_target.as_ref() {
                    (&msaa.view, Some(&view))
                } else {
                    (&view, None)
                };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            for mesh in scene.meshes() {
                let (Some(geometry), Some(material)) = (
                    self.geometries.get(&mesh.geometry.id()),
                    self.materials.get(&mesh.material.id()),
                ) else {
                    continue;
                };
                render_pass.set_bind_group(0, &material.bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertices.slice(..));
                render_pass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.index_count, 0, 0..1);
            }
        }

        context.queue.submit(Some(encoder.finish()));
        frame.present();
        self.stats.record(Instant::now());
        Ok(())
    }

    fn dispose_geometry(&mut self, id: GeometryId) {
        if let Some(buffers) = self.geometries.remove(&id) {
            buffers.destroy();
            tracing::debug!(?id, "geometry buffers released");
        }
    }

    fn dispose_material(&mut self, id: MaterialId) {
        if let Some(binding) = self.materials.remove(&id) {
            binding.destroy();
            tracing::debug!(?id, "material uniforms released");
        }
    }

    fn dispose(&mut self) {
        for (_, buffers) in self.geometries.drain() {
            buffers.destroy();
        }
        for (_, binding) in self.materials.drain() {
            binding.destroy();
        }
        self.multisample_target = None;
        if self.context.take().is_some() {
            tracing::debug!("GPU surface released");
        }
    }
}
