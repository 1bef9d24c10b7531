use glam::{Mat4, Vec3};

use crate::types::{CameraOptions, Viewport};

/// Anything that can provide a combined view-projection matrix.
pub trait Projection {
    fn view_projection(&self) -> Mat4;
}

/// Perspective camera looking down -Z at the plane from `z = perspective`.
///
/// Without a fixed field of view the frustum is fitted to the viewport
/// height, so one world unit equals one logical pixel on the `z = 0` plane.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    options: CameraOptions,
    fov_degrees: f32,
    aspect: f32,
}

impl PerspectiveCamera {
    pub fn new(options: CameraOptions, viewport: Viewport) -> Self {
        let mut camera = Self {
            options,
            fov_degrees: options.fov.unwrap_or(50.0),
            aspect: 1.0,
        };
        camera.resize(viewport);
        camera
    }

    /// Recomputes the projection for a new viewport. A collapsed viewport
    /// keeps the previous projection.
    pub fn resize(&mut self, viewport: Viewport) {
        let Some(aspect) = viewport.aspect() else {
            return;
        };
        self.aspect = aspect;
        self.fov_degrees = match self.options.fov {
            Some(fov) => fov,
            None => {
                let half_height = viewport.height * 0.5;
                (2.0 * (half_height / self.options.perspective).atan()).to_degrees()
            }
        };
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.options.perspective)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.options.near,
            self.options.far,
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }
}

impl Projection for PerspectiveCamera {
    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Camera used by the scene manager.
///
/// Only an owned camera follows the manager's resize protocol; an external
/// camera is the caller's responsibility.
pub enum CameraRig {
    Owned(PerspectiveCamera),
    External(Box<dyn Projection>),
}

impl CameraRig {
    pub(crate) fn resize(&mut self, viewport: Viewport) {
        if let CameraRig::Owned(camera) = self {
            camera.resize(viewport);
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, CameraRig::Owned(_))
    }

    pub fn as_perspective(&self) -> Option<&PerspectiveCamera> {
        match self {
            CameraRig::Owned(camera) => Some(camera),
            CameraRig::External(_) => None,
        }
    }
}

impl Projection for CameraRig {
    fn view_projection(&self) -> Mat4 {
        match self {
            CameraRig::Owned(camera) => camera.view_projection(),
            CameraRig::External(camera) => camera.view_projection(),
        }
    }
}
