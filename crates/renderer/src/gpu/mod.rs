//! wgpu drawing backend.
//!
//! - `context` owns the wgpu instance, device and swapchain for one window
//!   and picks the MSAA sample count.
//! - `pipeline` compiles the GLSL distortion shaders into the mesh pipeline.
//! - `uniforms` mirrors the shader's std140 uniform block.
//! - `state` implements [`crate::surface::SurfaceBackend`] on top of the
//!   above, caching buffers per geometry and per material until disposed.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::GpuBackend;
