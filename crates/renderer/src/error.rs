/// Failures surfaced by the scene manager and the objects attached to it.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("hosting container could not be resolved")]
    ContainerUnavailable,
    #[error("scene manager has already been destroyed")]
    Destroyed,
    #[error("invalid pixel density {0}; expected a finite value greater than zero")]
    InvalidPixelDensity(f32),
    #[error("draw surface failure: {0:#}")]
    Backend(anyhow::Error),
    /// A subscribed handler failed; the error is passed through untouched.
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

impl SceneError {
    /// Returns the swapchain error behind a backend failure, if any.
    pub fn surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            SceneError::Backend(err) => err.downcast_ref::<wgpu::SurfaceError>(),
            _ => None,
        }
    }
}
