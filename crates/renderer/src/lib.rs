//! Renderer crate for noiseplane.
//!
//! A single full-viewport plane is displaced by a simplex noise field and
//! reacts to pointer movement. The crate splits into a windowless core and
//! the `winit`/`wgpu` collaborators that plug into it:
//!
//! ```text
//!   CLI / noiseplane
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ SceneManager ──▶ GpuBackend::draw()
//!                        │    │                 │ Resize / Render callbacks
//!                        │    │ CursorMoved     ▼
//!                        │    └──────────▶ DistortionSurface ──▶ shader uniforms
//!                        └─ FrameClock ticks (fps multiplier)
//! ```
//!
//! [`SceneManager`] owns the viewport lifecycle and sequences the
//! `BeforeResize`/`Resize`/`Render`/`AfterRender` callbacks;
//! [`DistortionSurface`] subscribes to them and advances its pointer smoothing
//! and noise clock by the fps multiplier of each tick. The core only talks to
//! the host through the [`Container`] and [`SurfaceBackend`] traits, which
//! keeps it testable without a window or GPU.

pub mod callbacks;
pub mod camera;
pub mod clock;
pub mod error;
mod gpu;
pub mod manager;
pub mod plane;
pub mod pointer;
pub mod scene;
pub mod shader;
pub mod surface;
pub mod types;
mod window;

use anyhow::Result;

pub use callbacks::{CallbackBus, CallbackToken};
pub use camera::{CameraRig, PerspectiveCamera, Projection};
pub use clock::{FpsSetting, FrameClock, FrameTick};
pub use error::SceneError;
pub use gpu::GpuBackend;
pub use manager::{FrameContext, ManagerCallbacks, ManagerEvent, SceneManager, SharedScene};
pub use plane::{DistortionSurface, PointerState};
pub use pointer::{PointerChannel, PointerEvents, PointerMove};
pub use surface::{Container, ContainerMetrics, SurfaceBackend, SurfaceController};
pub use types::{
    Antialiasing, CameraOptions, CameraOverrides, ManagerOptions, ManagerOverrides,
    RendererConfig, SurfaceOptions, SurfaceOverrides, Viewport,
};
pub use window::WindowContainer;

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and drives the scene until the window is closed.
    ///
    /// Returns an error when the window, GPU or scene cannot be initialised,
    /// or when a frame fails in a way the event loop cannot recover from.
    pub fn run(&mut self) -> Result<()> {
        window::run(self.config.clone())
    }
}
