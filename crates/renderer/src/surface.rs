use std::rc::Rc;

use anyhow::Result;
use glam::Mat4;

use crate::error::SceneError;
use crate::scene::{GeometryId, MaterialId, Scene};
use crate::types::Viewport;

/// Size of the hosting container as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Physical pixels per logical pixel.
    pub scale_factor: f64,
}

impl ContainerMetrics {
    fn logical_size(&self) -> (f32, f32) {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        (
            (f64::from(self.width) / scale) as f32,
            (f64::from(self.height) / scale) as f32,
        )
    }
}

/// Rectangular region of the host that the surface fills.
pub trait Container {
    /// Measures the container synchronously; `None` when it no longer resolves.
    fn measure(&self) -> Option<ContainerMetrics>;
}

/// Pixel output collaborator driven by the [`SurfaceController`].
pub trait SurfaceBackend {
    /// Resizes the draw buffer for `viewport`.
    fn configure(&mut self, viewport: Viewport) -> Result<()>;
    /// Submits one draw of every mesh in `scene`.
    fn draw(&mut self, scene: &Scene, view_projection: Mat4) -> Result<()>;
    /// Releases GPU buffers held for a geometry. Unknown ids are ignored.
    fn dispose_geometry(&mut self, id: GeometryId);
    /// Releases GPU buffers held for a material. Unknown ids are ignored.
    fn dispose_material(&mut self, id: MaterialId);
    /// Releases the output surface itself.
    fn dispose(&mut self);
}

/// Owns the draw surface and the viewport derived from its container.
pub struct SurfaceController<B> {
    container: Rc<dyn Container>,
    backend: B,
    viewport: Viewport,
    density_override: Option<f32>,
    disposed: bool,
}

impl<B: SurfaceBackend> SurfaceController<B> {
    /// Resolves the container; fails when it cannot be measured.
    pub fn new(
        container: Rc<dyn Container>,
        backend: B,
        pixel_density: Option<f32>,
    ) -> Result<Self, SceneError> {
        let metrics = container
            .measure()
            .ok_or(SceneError::ContainerUnavailable)?;
        let mut controller = Self {
            container,
            backend,
            viewport: Viewport::default(),
            density_override: pixel_density,
            disposed: false,
        };
        controller.viewport = controller.derive_viewport(Some(metrics));
        Ok(controller)
    }

    fn derive_viewport(&self, metrics: Option<ContainerMetrics>) -> Viewport {
        let Some(metrics) = metrics else {
            return Viewport::new(0.0, 0.0, self.viewport.pixel_density.max(f32::EPSILON));
        };
        let (width, height) = metrics.logical_size();
        let density = self
            .density_override
            .unwrap_or(metrics.scale_factor as f32);
        let density = if density.is_finite() && density > 0.0 {
            density
        } else {
            1.0
        };
        Viewport::new(width, height, density)
    }

    /// Re-measures the container and reconfigures the draw buffer.
    ///
    /// A container that stops resolving collapses the viewport to zero area;
    /// rendering skips until it recovers.
    pub fn resize(&mut self) -> Result<Viewport, SceneError> {
        let metrics = self.container.measure();
        if metrics.is_none() {
            tracing::debug!("hosting container did not resolve; collapsing viewport");
        }
        self.viewport = self.derive_viewport(metrics);
        if !self.disposed {
            self.backend
                .configure(self.viewport)
                .map_err(SceneError::Backend)?;
        }
        tracing::debug!(
            width = self.viewport.width,
            height = self.viewport.height,
            pixel_density = self.viewport.pixel_density,
            "surface resized"
        );
        Ok(self.viewport)
    }

    /// Overrides the container's pixel density. Takes effect on the next resize.
    pub fn set_pixel_density(&mut self, value: f32) -> Result<(), SceneError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(SceneError::InvalidPixelDensity(value));
        }
        self.density_override = Some(value);
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn width(&self) -> f32 {
        self.viewport.width
    }

    pub fn height(&self) -> f32 {
        self.viewport.height
    }

    pub fn pixel_density(&self) -> f32 {
        self.viewport.pixel_density
    }

    pub(crate) fn draw(&mut self, scene: &Scene, view_projection: Mat4) -> Result<(), SceneError> {
        if self.disposed {
            return Err(SceneError::Destroyed);
        }
        self.backend
            .draw(scene, view_projection)
            .map_err(SceneError::Backend)
    }

    pub fn dispose_geometry(&mut self, id: GeometryId) {
        if !self.disposed {
            self.backend.dispose_geometry(id);
        }
    }

    pub fn dispose_material(&mut self, id: MaterialId) {
        if !self.disposed {
            self.backend.dispose_material(id);
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.backend.dispose();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Synthetic collaborators shared by the unit tests.

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// Container whose size the test changes at will.
    pub struct FakeContainer {
        size: Cell<Option<(u32, u32)>>,
        scale_factor: Cell<f64>,
    }

    impl FakeContainer {
        pub fn new(width: u32, height: u32) -> Rc<Self> {
            Rc::new(Self {
                size: Cell::new(Some((width, height))),
                scale_factor: Cell::new(1.0),
            })
        }

        pub fn detached() -> Rc<Self> {
            Rc::new(Self {
                size: Cell::new(None),
                scale_factor: Cell::new(1.0),
            })
        }

        pub fn set_size(&self, width: u32, height: u32) {
            self.size.set(Some((width, height)));
        }

        pub fn set_scale_factor(&self, scale_factor: f64) {
            self.scale_factor.set(scale_factor);
        }
    }

    impl Container for FakeContainer {
        fn measure(&self) -> Option<ContainerMetrics> {
            self.size.get().map(|(width, height)| ContainerMetrics {
                width,
                height,
                scale_factor: self.scale_factor.get(),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum BackendCall {
        Configure(Viewport),
        Draw { meshes: usize },
        DisposeGeometry(GeometryId),
        DisposeMaterial(MaterialId),
        Dispose,
    }

    /// Backend that records every call into a shared log.
    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub calls: Rc<RefCell<Vec<BackendCall>>>,
    }

    impl RecordingBackend {
        pub fn draws(&self) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| matches!(call, BackendCall::Draw { .. }))
                .count()
        }

        pub fn count(&self, wanted: &BackendCall) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| *call == wanted)
                .count()
        }
    }

    impl SurfaceBackend for RecordingBackend {
        fn configure(&mut self, viewport: Viewport) -> Result<()> {
            self.calls.borrow_mut().push(BackendCall::Configure(viewport));
            Ok(())
        }

        fn draw(&mut self, scene: &Scene, _view_projection: Mat4) -> Result<()> {
            self.calls.borrow_mut().push(BackendCall::Draw {
                meshes: scene.len(),
            });
            Ok(())
        }

        fn dispose_geometry(&mut self, id: GeometryId) {
            self.calls.borrow_mut().push(BackendCall::DisposeGeometry(id));
        }

        fn dispose_material(&mut self, id: MaterialId) {
            self.calls.borrow_mut().push(BackendCall::DisposeMaterial(id));
        }

        fn dispose(&mut self) {
            self.calls.borrow_mut().push(BackendCall::Dispose);
        }
    }
}
