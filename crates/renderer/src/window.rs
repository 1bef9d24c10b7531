use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::error::SceneError;
use crate::gpu::GpuBackend;
use crate::manager::SceneManager;
use crate::plane::DistortionSurface;
use crate::pointer::{PointerChannel, PointerEvents, PointerMove};
use crate::surface::{Container, ContainerMetrics};
use crate::types::RendererConfig;

/// The host window acting as hosting container.
pub struct WindowContainer {
    window: Arc<Window>,
}

impl WindowContainer {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl Container for WindowContainer {
    fn measure(&self) -> Option<ContainerMetrics> {
        let size = self.window.inner_size();
        Some(ContainerMetrics {
            width: size.width,
            height: size.height,
            scale_factor: self.window.scale_factor(),
        })
    }
}

/// Converts a cursor position to a pointer event against the window viewport.
fn pointer_event(window: &Window, position: PhysicalPosition<f64>) -> PointerMove {
    let scale_factor = window.scale_factor();
    let logical = position.to_logical::<f64>(scale_factor);
    let viewport = window.inner_size().to_logical::<f64>(scale_factor);
    PointerMove::new(
        logical.x as f32,
        logical.y as f32,
        viewport.width as f32,
        viewport.height as f32,
    )
}

fn is_key(event: &KeyEvent, key: NamedKey) -> bool {
    matches!(event.logical_key, Key::Named(named) if named == key)
}

/// Everything the event loop drives; torn down in a fixed order.
struct WindowRuntime {
    plane: DistortionSurface,
    manager: SceneManager<GpuBackend>,
    pointer: Rc<PointerEvents>,
    window: Arc<Window>,
    closed: bool,
}

impl WindowRuntime {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let backend = GpuBackend::new(
            window.clone(),
            window.inner_size(),
            config.options.surface.antialias,
        )
        .context("failed to initialise GPU backend")?;
        let container: Rc<dyn Container> = Rc::new(WindowContainer::new(window.clone()));
        let mut manager = SceneManager::new(container, backend, config.options)
            .context("failed to create scene manager")?;

        if let Some(hz) = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
            .map(|millihertz| millihertz as f32 / 1000.0)
        {
            manager.set_refresh_rate(hz);
        }

        let pointer = Rc::new(PointerEvents::new());
        let plane = DistortionSurface::new(&manager, &pointer)
            .context("failed to attach distortion surface")?;
        if config.start_paused {
            manager.pause();
        }

        Ok(Self {
            plane,
            manager,
            pointer,
            window,
            closed: false,
        })
    }

    fn close(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if !self.closed {
            self.closed = true;
            self.plane.destroy(&mut self.manager);
            self.manager.destroy();
            tracing::info!("window closed");
        }
        elwt.exit();
    }

    fn toggle_pause(&mut self) {
        if self.manager.is_playing() {
            self.manager.pause();
            tracing::info!("paused");
        } else {
            self.manager.play();
            self.window.request_redraw();
            tracing::info!("resumed");
        }
    }

    fn resize(&mut self) -> Result<(), SceneError> {
        match self.manager.resize() {
            Err(err) if err.surface_error().is_some() => self.recover(err),
            other => other,
        }
    }

    /// Handles swapchain failures from a draw. Returns the error when the
    /// runtime cannot continue.
    fn recover(&mut self, err: SceneError) -> Result<(), SceneError> {
        match err.surface_error() {
            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!(error = %err, "swapchain lost; reconfiguring");
                self.manager.surface().backend().recover_surface();
                Ok(())
            }
            Some(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout; retrying next frame");
                Ok(())
            }
            Some(wgpu::SurfaceError::OutOfMemory) | None => Err(err),
            Some(other) => {
                tracing::warn!(error = ?other, "surface error; retrying next frame");
                Ok(())
            }
        }
    }

    fn redraw(&mut self) -> Result<(), SceneError> {
        match self.manager.tick(Instant::now()) {
            Ok(_) => Ok(()),
            Err(err) => self.recover(err),
        }
    }
}

/// Opens the window and runs the scene until it is closed.
pub(crate) fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut runtime = WindowRuntime::new(window.clone(), &config)?;
    tracing::info!(
        width = runtime.manager.width(),
        height = runtime.manager.height(),
        pixel_density = runtime.manager.pixel_density(),
        fov = ?runtime
            .manager
            .camera()
            .as_perspective()
            .map(|camera| camera.fov_degrees()),
        paused = config.start_paused,
        "noiseplane running (space toggles pause, escape quits)"
    );
    window.request_redraw();

    let mut result = Ok(());
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => runtime.close(elwt),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if is_key(&event, NamedKey::Escape) {
                    runtime.close(elwt);
                } else if is_key(&event, NamedKey::Space) {
                    runtime.toggle_pause();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let pointer_move = pointer_event(&window, position);
                if let Err(err) = runtime.pointer.dispatch(PointerChannel::Move, &pointer_move) {
                    tracing::error!(error = %err, "pointer handler failed");
                    result = Err(err);
                    runtime.close(elwt);
                }
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if runtime.closed {
                    return;
                }
                if let Err(err) = runtime.resize() {
                    tracing::error!(error = %err, "resize failed");
                    result = Err(err.into());
                    runtime.close(elwt);
                }
            }
            WindowEvent::RedrawRequested => {
                if runtime.closed {
                    return;
                }
                if let Err(err) = runtime.redraw() {
                    tracing::error!(error = %err, "render failed");
                    result = Err(err.into());
                    runtime.close(elwt);
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if runtime.manager.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = runtime.manager.next_deadline() {
                let ms = deadline.saturating_duration_since(now).as_millis();
                tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                tracing::trace!("scheduler: idle (no redraw requested)");
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }
    result
}
