use crate::clock::FpsSetting;

/// Default camera distance from the plane, in logical pixels.
pub const DEFAULT_PERSPECTIVE: f32 = 800.0;
/// Default near clipping plane.
pub const DEFAULT_NEAR: f32 = 1.0;
/// Default far clipping plane.
pub const DEFAULT_FAR: f32 = 10_000.0;

/// Size and pixel density of the drawing area.
///
/// `width` and `height` are logical pixels; the draw buffer is allocated at
/// `width * pixel_density` by `height * pixel_density` physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_density: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, pixel_density: f32) -> Self {
        Self {
            width,
            height,
            pixel_density,
        }
    }

    /// True when both dimensions can be drawn into.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Width divided by height, or `None` for a collapsed viewport.
    pub fn aspect(&self) -> Option<f32> {
        if self.has_area() {
            Some(self.width / self.height)
        } else {
            None
        }
    }

    /// Draw buffer dimensions in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |value: f32| (value * self.pixel_density).round().max(0.0) as u32;
        (scale(self.width), scale(self.height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// Camera parameters after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOptions {
    /// Fixed vertical field of view in degrees. When unset the field of view
    /// is derived from the viewport height so one world unit maps to one
    /// logical pixel at `z = 0`.
    pub fov: Option<f32>,
    /// Distance between the camera and the plane.
    pub perspective: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov: None,
            perspective: DEFAULT_PERSPECTIVE,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

/// Drawing surface parameters after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceOptions {
    /// Explicit pixel density. `None` follows the hosting container's scale factor.
    pub pixel_density: Option<f32>,
    pub antialias: Antialiasing,
}

/// Fully populated scene manager configuration.
///
/// Produced once by [`ManagerOverrides::resolve`]; nothing mutates the
/// defaults afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManagerOptions {
    pub camera: CameraOptions,
    pub surface: SurfaceOptions,
    pub fps: FpsSetting,
}

/// Partial camera settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraOverrides {
    pub fov: Option<f32>,
    pub perspective: Option<f32>,
    pub near: Option<f32>,
    pub far: Option<f32>,
}

/// Partial surface settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceOverrides {
    pub pixel_density: Option<f32>,
    pub antialias: Option<Antialiasing>,
}

/// Caller supplied options; every field falls back to a documented default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManagerOverrides {
    pub camera: CameraOverrides,
    pub surface: SurfaceOverrides,
    pub fps: Option<FpsSetting>,
}

impl ManagerOverrides {
    /// Merges the overrides over the defaults into a complete configuration.
    pub fn resolve(&self) -> ManagerOptions {
        let defaults = ManagerOptions::default();
        ManagerOptions {
            camera: CameraOptions {
                fov: self.camera.fov.or(defaults.camera.fov),
                perspective: self.camera.perspective.unwrap_or(defaults.camera.perspective),
                near: self.camera.near.unwrap_or(defaults.camera.near),
                far: self.camera.far.unwrap_or(defaults.camera.far),
            },
            surface: SurfaceOptions {
                pixel_density: self
                    .surface
                    .pixel_density
                    .filter(|density| density.is_finite() && *density > 0.0),
                antialias: self.surface.antialias.unwrap_or(defaults.surface.antialias),
            },
            fps: self.fps.unwrap_or(defaults.fps),
        }
    }
}

/// Start-up configuration for the windowed renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    pub title: String,
    pub options: ManagerOptions,
    /// Keep the frame clock paused until the user resumes it.
    pub start_paused: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            title: "noiseplane".to_string(),
            options: ManagerOptions::default(),
            start_paused: false,
        }
    }
}
