//! The noise-distorted plane and its pointer smoothing.
//!
//! The plane is tessellated once at the initial viewport size. Later resizes
//! only stretch it through the mesh scale. Every `Render` dispatch advances
//! the pointer smoothing and the noise clock by the manager's fps
//! multiplier, so the motion looks the same at 30, 60 or 144 ticks a second.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};

use crate::callbacks::CallbackToken;
use crate::error::SceneError;
use crate::manager::{FrameContext, ManagerCallbacks, ManagerEvent, SceneManager, SharedScene};
use crate::pointer::{PointerChannel, PointerEvents};
use crate::scene::{
    DistortionUniforms, GeometryId, MaterialId, Mesh, MeshId, PlaneGeometry, ShaderMaterial,
};
use crate::surface::SurfaceBackend;

/// Grid subdivision along each axis.
pub const GRID_SEGMENTS: u32 = 20;
/// Per-frame approach factor of the smoothed pointer towards its target.
pub const POINTER_EASE: f32 = 0.1;
/// Per-frame relaxation of the target intensity towards zero.
pub const INTENSITY_DECAY: f32 = 0.2;
/// Intensity added by each pointer move.
pub const INTENSITY_NUDGE: f32 = 0.1;
/// Noise clock advance per nominal frame.
pub const TIME_STEP: f32 = 0.0075;

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Treats non-finite or negative multipliers as a frame that did not advance.
fn sanitize_multiplier(fps_multiplier: f32) -> f32 {
    if fps_multiplier.is_finite() {
        fps_multiplier.max(0.0)
    } else {
        0.0
    }
}

/// Raw and smoothed pointer values, all within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub target_position: Vec2,
    pub current_position: Vec2,
    pub target_intensity: f32,
    pub current_intensity: f32,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            target_position: Vec2::splat(0.5),
            current_position: Vec2::splat(0.5),
            target_intensity: 0.0,
            current_intensity: 0.0,
        }
    }
}

impl PointerState {
    /// Retargets the pointer and nudges its intensity, capped at 1.
    pub fn handle_move(&mut self, position: Vec2) {
        self.target_position = position;
        self.target_intensity = (self.target_intensity + INTENSITY_NUDGE).min(1.0);
    }

    /// Advances the smoothing by one frame scaled by `fps_multiplier`.
    ///
    /// Interpolation factors are clamped to `[0, 1]`; a stalled frame with a
    /// large multiplier snaps to the target instead of overshooting it.
    pub fn advance(&mut self, fps_multiplier: f32) {
        let f = sanitize_multiplier(fps_multiplier);
        let ease = (POINTER_EASE * f).clamp(0.0, 1.0);
        let decay = (INTENSITY_DECAY * f).clamp(0.0, 1.0);

        self.current_position = self.current_position.lerp(self.target_position, ease);
        self.current_intensity =
            lerp(self.current_intensity, self.target_intensity, ease).clamp(0.0, 1.0);
        self.target_intensity = lerp(self.target_intensity, 0.0, decay).clamp(0.0, 1.0);
    }
}

#[derive(Debug)]
struct PlaneState {
    initial_size: Vec2,
    scale: Vec3,
    pointer: PointerState,
    uniforms: DistortionUniforms,
}

impl PlaneState {
    fn on_resize(&mut self, ctx: &FrameContext) {
        let Some(aspect) = ctx.viewport.aspect() else {
            return;
        };
        self.scale = Vec3::new(
            ctx.viewport.width / self.initial_size.x,
            ctx.viewport.height / self.initial_size.y,
            1.0,
        );
        self.uniforms.aspect = aspect;
    }

    fn on_render(&mut self, ctx: &FrameContext) {
        let f = sanitize_multiplier(ctx.fps_multiplier);
        self.pointer.advance(f);
        self.uniforms.time += TIME_STEP * f;
        self.uniforms.mouse_intensity = self.pointer.current_intensity;
        self.uniforms.mouse_position = self.pointer.current_position;
    }

    fn publish(&self, scene: &SharedScene, mesh_id: MeshId) {
        if let Some(mesh) = scene.borrow_mut().get_mut(mesh_id) {
            mesh.scale = self.scale;
            mesh.material.uniforms = self.uniforms;
        }
    }
}

/// Single animated mesh attached to a [`SceneManager`]'s scene.
pub struct DistortionSurface {
    scene: SharedScene,
    callbacks: Rc<ManagerCallbacks>,
    pointer_events: Rc<PointerEvents>,
    state: Rc<RefCell<PlaneState>>,
    mesh_id: MeshId,
    geometry_id: GeometryId,
    material_id: MaterialId,
    subscriptions: Vec<CallbackToken>,
    pointer_subscription: Option<CallbackToken>,
    destroyed: bool,
}

impl DistortionSurface {
    /// Builds the plane at the manager's current viewport size and attaches it.
    pub fn new<B: SurfaceBackend>(
        manager: &SceneManager<B>,
        pointer_events: &Rc<PointerEvents>,
    ) -> Result<Self, SceneError> {
        if manager.is_destroyed() {
            return Err(SceneError::Destroyed);
        }
        let viewport = manager.viewport();
        // An empty container still gets a drawable unit plane; the first
        // resize with area stretches it into place.
        let initial_size = Vec2::new(viewport.width.max(1.0), viewport.height.max(1.0));
        let aspect = viewport.aspect().unwrap_or(1.0);

        let geometry = PlaneGeometry::new(initial_size.x, initial_size.y, GRID_SEGMENTS, GRID_SEGMENTS);
        let material = ShaderMaterial::new(DistortionUniforms::new(aspect));
        let geometry_id = geometry.id();
        let material_id = material.id();
        let (width, height) = geometry.size();
        let segments = geometry.segments();
        let state = Rc::new(RefCell::new(PlaneState {
            initial_size,
            scale: Vec3::ONE,
            pointer: PointerState::default(),
            uniforms: material.uniforms,
        }));

        let scene = Rc::clone(manager.scene());
        let mesh_id = scene.borrow_mut().add(Mesh::new(geometry, material));

        let callbacks = Rc::clone(manager.callbacks());
        let resize = {
            let state = Rc::clone(&state);
            let scene = Rc::clone(&scene);
            callbacks.subscribe(ManagerEvent::Resize, move |ctx| {
                let mut state = state.borrow_mut();
                state.on_resize(ctx);
                state.publish(&scene, mesh_id);
                Ok(())
            })
        };
        let render = {
            let state = Rc::clone(&state);
            let scene = Rc::clone(&scene);
            callbacks.subscribe(ManagerEvent::Render, move |ctx| {
                let mut state = state.borrow_mut();
                state.on_render(ctx);
                state.publish(&scene, mesh_id);
                Ok(())
            })
        };
        let pointer_subscription = {
            let state = Rc::clone(&state);
            pointer_events.subscribe(PointerChannel::Move, move |event| {
                if let Some(position) = event.normalized() {
                    state.borrow_mut().pointer.handle_move(position);
                }
                Ok(())
            })
        };

        tracing::debug!(
            width,
            height,
            segments = ?segments,
            "distortion surface attached"
        );

        Ok(Self {
            scene,
            callbacks,
            pointer_events: Rc::clone(pointer_events),
            state,
            mesh_id,
            geometry_id,
            material_id,
            subscriptions: vec![resize, render],
            pointer_subscription: Some(pointer_subscription),
            destroyed: false,
        })
    }

    pub fn pointer(&self) -> PointerState {
        self.state.borrow().pointer
    }

    pub fn uniforms(&self) -> DistortionUniforms {
        self.state.borrow().uniforms
    }

    pub fn scale(&self) -> Vec3 {
        self.state.borrow().scale
    }

    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    pub fn geometry_id(&self) -> GeometryId {
        self.geometry_id
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn cancel_subscriptions(&mut self) {
        for token in self.subscriptions.drain(..) {
            self.callbacks.cancel(token);
        }
        if let Some(token) = self.pointer_subscription.take() {
            self.pointer_events.cancel(token);
        }
    }

    /// Detaches the mesh, releases its GPU resources and revokes this
    /// surface's own subscriptions. A second call does nothing.
    pub fn destroy<B: SurfaceBackend>(&mut self, manager: &mut SceneManager<B>) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.scene.borrow_mut().remove(self.mesh_id);
        manager.surface_mut().dispose_geometry(self.geometry_id);
        manager.surface_mut().dispose_material(self.material_id);
        self.cancel_subscriptions();
        tracing::debug!("distortion surface destroyed");
    }
}

impl Drop for DistortionSurface {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        // Without the manager the GPU buffers stay with the backend until
        // the surface itself is disposed.
        self.scene.borrow_mut().remove(self.mesh_id);
        self.cancel_subscriptions();
    }
}
