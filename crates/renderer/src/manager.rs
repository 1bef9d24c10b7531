//! Viewport lifecycle and render orchestration.
//!
//! ```text
//!   host resize ──▶ resize(): BeforeResize ─▶ surface ─▶ camera ─▶ Resize ─▶ render()
//!   clock tick  ──▶ tick()  ─▶ render(): Render ─▶ draw (if area) ─▶ AfterRender
//! ```
//!
//! Objects attached to the scene (see [`crate::plane::DistortionSurface`])
//! subscribe to the manager's [`ManagerCallbacks`] and receive a
//! [`FrameContext`] with the committed viewport and the current fps
//! multiplier.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::callbacks::CallbackBus;
use crate::camera::{CameraRig, PerspectiveCamera, Projection};
use crate::clock::{FrameClock, FrameTick};
use crate::error::SceneError;
use crate::scene::Scene;
use crate::surface::{Container, SurfaceBackend, SurfaceController};
use crate::types::{ManagerOptions, Viewport};

/// Lifecycle channels published by the [`SceneManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerEvent {
    Destroy,
    BeforeResize,
    Resize,
    Render,
    AfterRender,
}

/// Per-dispatch values handed to manager subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub viewport: Viewport,
    pub fps_multiplier: f32,
}

pub type ManagerCallbacks = CallbackBus<ManagerEvent, FrameContext>;

/// Scene graph shared between the manager and the objects attached to it.
pub type SharedScene = Rc<RefCell<Scene>>;

pub struct SceneManager<B: SurfaceBackend> {
    options: ManagerOptions,
    surface: SurfaceController<B>,
    camera: CameraRig,
    scene: SharedScene,
    callbacks: Rc<ManagerCallbacks>,
    clock: FrameClock,
    fps_multiplier: f32,
    destroyed: bool,
}

impl<B: SurfaceBackend> SceneManager<B> {
    /// Builds a manager with its own perspective camera.
    pub fn new(
        container: Rc<dyn Container>,
        backend: B,
        options: ManagerOptions,
    ) -> Result<Self, SceneError> {
        Self::build(container, backend, options, None)
    }

    /// Builds a manager that draws through a caller-owned camera.
    pub fn with_camera(
        container: Rc<dyn Container>,
        backend: B,
        options: ManagerOptions,
        camera: Box<dyn Projection>,
    ) -> Result<Self, SceneError> {
        Self::build(container, backend, options, Some(camera))
    }

    fn build(
        container: Rc<dyn Container>,
        backend: B,
        options: ManagerOptions,
        external_camera: Option<Box<dyn Projection>>,
    ) -> Result<Self, SceneError> {
        let surface = SurfaceController::new(container, backend, options.surface.pixel_density)?;
        let camera = match external_camera {
            Some(camera) => CameraRig::External(camera),
            None => CameraRig::Owned(PerspectiveCamera::new(options.camera, surface.viewport())),
        };

        let mut manager = Self {
            options,
            surface,
            camera,
            scene: Rc::new(RefCell::new(Scene::new())),
            callbacks: Rc::new(ManagerCallbacks::new()),
            clock: FrameClock::new(options.fps),
            fps_multiplier: 1.0,
            destroyed: false,
        };

        if let Err(err) = manager.resize() {
            manager.destroy();
            return Err(err);
        }
        manager.clock.play();
        tracing::debug!(
            width = manager.width(),
            height = manager.height(),
            pixel_density = manager.pixel_density(),
            fps = ?options.fps,
            owned_camera = manager.camera.is_owned(),
            "scene manager ready"
        );
        Ok(manager)
    }

    fn context(&self) -> FrameContext {
        FrameContext {
            viewport: self.surface.viewport(),
            fps_multiplier: self.fps_multiplier,
        }
    }

    /// Re-derives the viewport and notifies subscribers, then renders once.
    pub fn resize(&mut self) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed);
        }
        self.callbacks
            .dispatch(ManagerEvent::BeforeResize, &self.context())?;
        let viewport = self.surface.resize()?;
        self.camera.resize(viewport);
        self.callbacks
            .dispatch(ManagerEvent::Resize, &self.context())?;
        self.render()
    }

    /// Runs the render hooks and draws the scene when the viewport has area.
    pub fn render(&mut self) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed);
        }
        self.callbacks
            .dispatch(ManagerEvent::Render, &self.context())?;

        let viewport = self.surface.viewport();
        if viewport.has_area() {
            let scene = self.scene.borrow();
            self.surface.draw(&scene, self.camera.view_projection())?;
        } else {
            tracing::trace!(
                width = viewport.width,
                height = viewport.height,
                "viewport has no area; skipping draw"
            );
        }

        self.callbacks
            .dispatch(ManagerEvent::AfterRender, &self.context())?;
        Ok(())
    }

    /// Consumes a due clock tick and renders with its fps multiplier.
    ///
    /// Returns `Ok(None)` when no tick was due.
    pub fn tick(&mut self, now: Instant) -> Result<Option<FrameTick>, SceneError> {
        if self.destroyed {
            return Ok(None);
        }
        let Some(tick) = self.clock.tick(now) else {
            return Ok(None);
        };
        self.fps_multiplier = tick.fps_multiplier;
        self.render()?;
        Ok(Some(tick))
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        !self.destroyed && self.clock.ready_for_frame(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if self.destroyed {
            None
        } else {
            self.clock.next_deadline()
        }
    }

    pub fn play(&mut self) {
        if !self.destroyed && !self.clock.is_playing() {
            self.clock.play();
            tracing::debug!("frame clock resumed");
        }
    }

    pub fn pause(&mut self) {
        if self.clock.is_playing() {
            self.clock.pause();
            tracing::debug!("frame clock paused");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Feeds the host refresh rate to the clock for `fps = auto`.
    pub fn set_refresh_rate(&mut self, hz: f32) {
        self.clock.set_refresh_rate(hz);
    }

    /// Overrides the pixel density and performs a full resize.
    pub fn set_pixel_density(&mut self, value: f32) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed);
        }
        self.surface.set_pixel_density(value)?;
        self.resize()
    }

    /// Stops the clock and releases the draw surface and every registration.
    ///
    /// Safe to call repeatedly; never fails.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.clock.pause();
        if let Err(err) = self
            .callbacks
            .dispatch(ManagerEvent::Destroy, &self.context())
        {
            tracing::warn!(error = %err, "destroy callback failed");
        }
        self.destroyed = true;
        self.surface.dispose();
        self.callbacks.clear();
        tracing::debug!("scene manager destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.surface.viewport()
    }

    pub fn width(&self) -> f32 {
        self.surface.width()
    }

    pub fn height(&self) -> f32 {
        self.surface.height()
    }

    pub fn pixel_density(&self) -> f32 {
        self.surface.pixel_density()
    }

    /// Multiplier of the latest clock tick; 1 before the first tick.
    pub fn fps_multiplier(&self) -> f32 {
        self.fps_multiplier
    }

    pub fn callbacks(&self) -> &Rc<ManagerCallbacks> {
        &self.callbacks
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn surface(&self) -> &SurfaceController<B> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut SurfaceController<B> {
        &mut self.surface
    }
}

impl<B: SurfaceBackend> Drop for SceneManager<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use anyhow::anyhow;
    use glam::Mat4;

    use super::*;
    use crate::clock::FpsSetting;
    use crate::surface::testing::{BackendCall, FakeContainer, RecordingBackend};

    fn manager(width: u32, height: u32) -> (SceneManager<RecordingBackend>, Rc<FakeContainer>, RecordingBackend) {
        let container = FakeContainer::new(width, height);
        let backend = RecordingBackend::default();
        let manager =
            SceneManager::new(container.clone(), backend.clone(), ManagerOptions::default())
                .expect("manager");
        (manager, container, backend)
    }

    fn record(
        manager: &SceneManager<RecordingBackend>,
        log: &Rc<RefCell<Vec<String>>>,
        event: ManagerEvent,
    ) {
        let log = Rc::clone(log);
        manager.callbacks().subscribe(event, move |_| {
            log.borrow_mut().push(format!("{event:?}"));
            Ok(())
        });
    }

    #[test]
    fn missing_container_fails_construction() {
        let result = SceneManager::new(
            FakeContainer::detached(),
            RecordingBackend::default(),
            ManagerOptions::default(),
        );
        assert!(matches!(result, Err(SceneError::ContainerUnavailable)));
    }

    #[test]
    fn construction_resizes_draws_and_starts_the_clock() {
        let (manager, _container, backend) = manager(800, 600);
        assert_eq!(manager.width(), 800.0);
        assert_eq!(manager.height(), 600.0);
        assert!(manager.is_playing());
        let calls = backend.calls.borrow();
        assert_eq!(
            calls.first(),
            Some(&BackendCall::Configure(Viewport::new(800.0, 600.0, 1.0)))
        );
        assert_eq!(backend.draws(), 1);
    }

    #[test]
    fn resize_runs_the_protocol_in_order() {
        let (mut manager, container, _backend) = manager(800, 600);
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in [
            ManagerEvent::AfterRender,
            ManagerEvent::Render,
            ManagerEvent::Resize,
            ManagerEvent::BeforeResize,
        ] {
            record(&manager, &log, event);
        }

        container.set_size(1024, 768);
        manager.resize().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["BeforeResize", "Resize", "Render", "AfterRender"]
        );
    }

    #[test]
    fn resize_subscribers_see_the_committed_viewport() {
        let (mut manager, container, _backend) = manager(800, 600);
        let before = Rc::new(RefCell::new(None));
        let after = Rc::new(RefCell::new(None));
        let before_sink = Rc::clone(&before);
        manager
            .callbacks()
            .subscribe(ManagerEvent::BeforeResize, move |ctx| {
                *before_sink.borrow_mut() = Some(ctx.viewport.width);
                Ok(())
            });
        let after_sink = Rc::clone(&after);
        manager.callbacks().subscribe(ManagerEvent::Resize, move |ctx| {
            *after_sink.borrow_mut() = Some(ctx.viewport.width);
            Ok(())
        });

        container.set_size(1600, 600);
        manager.resize().unwrap();
        assert_eq!(*before.borrow(), Some(800.0));
        assert_eq!(*after.borrow(), Some(1600.0));
    }

    #[test]
    fn resize_handlers_fire_in_subscription_order() {
        let (mut manager, _container, _backend) = manager(800, 600);
        let log = Rc::new(RefCell::new(Vec::new()));
        for index in 0..5 {
            let log = Rc::clone(&log);
            manager.callbacks().subscribe(ManagerEvent::Resize, move |_| {
                log.borrow_mut().push(index);
                Ok(())
            });
        }
        manager.resize().unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_width_skips_the_draw_but_runs_hooks() {
        let (mut manager, container, backend) = manager(800, 600);
        let log = Rc::new(RefCell::new(Vec::new()));
        record(&manager, &log, ManagerEvent::Render);
        record(&manager, &log, ManagerEvent::AfterRender);

        container.set_size(0, 600);
        manager.resize().unwrap();
        let draws = backend.draws();
        log.borrow_mut().clear();

        manager.render().unwrap();
        assert_eq!(backend.draws(), draws);
        assert_eq!(*log.borrow(), vec!["Render", "AfterRender"]);

        container.set_size(800, 600);
        manager.resize().unwrap();
        assert_eq!(backend.draws(), draws + 1);
    }

    #[test]
    fn render_draws_exactly_once() {
        let (mut manager, _container, backend) = manager(800, 600);
        let draws = backend.draws();
        manager.render().unwrap();
        assert_eq!(backend.draws(), draws + 1);
    }

    #[test]
    fn handler_errors_propagate_from_render() {
        let (mut manager, _container, backend) = manager(800, 600);
        manager
            .callbacks()
            .subscribe(ManagerEvent::Render, |_| Err(anyhow!("bad handler")));
        let draws = backend.draws();
        let err = manager.render().unwrap_err();
        assert!(matches!(err, SceneError::Callback(_)));
        assert_eq!(err.to_string(), "bad handler");
        assert_eq!(backend.draws(), draws);
    }

    #[test]
    fn tick_passes_the_fps_multiplier_to_render_hooks() {
        let container = FakeContainer::new(800, 600);
        let options = ManagerOptions {
            fps: FpsSetting::Fixed(60.0),
            ..ManagerOptions::default()
        };
        let mut manager =
            SceneManager::new(container, RecordingBackend::default(), options).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.callbacks().subscribe(ManagerEvent::Render, move |ctx| {
            sink.borrow_mut().push(ctx.fps_multiplier);
            Ok(())
        });

        let start = Instant::now();
        assert!(manager.tick(start).unwrap().is_some());
        assert!(manager
            .tick(start + Duration::from_millis(1))
            .unwrap()
            .is_none());
        let tick = manager
            .tick(start + Duration::from_secs_f32(3.0 / 60.0))
            .unwrap()
            .expect("tick");
        assert!((tick.fps_multiplier - 3.0).abs() < 1e-3);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], 1.0);
        assert!((seen[1] - 3.0).abs() < 1e-3);
        assert!((manager.fps_multiplier() - 3.0).abs() < 1e-3);
    }

    #[test]
    fn pause_and_play_are_idempotent() {
        let (mut manager, _container, _backend) = manager(800, 600);
        manager.pause();
        manager.pause();
        assert!(!manager.is_playing());
        assert!(manager.tick(Instant::now()).unwrap().is_none());
        manager.play();
        manager.play();
        assert!(manager.is_playing());
        assert!(manager.tick(Instant::now()).unwrap().is_some());
    }

    #[test]
    fn set_pixel_density_triggers_a_full_resize() {
        let (mut manager, _container, backend) = manager(800, 600);
        let log = Rc::new(RefCell::new(Vec::new()));
        record(&manager, &log, ManagerEvent::Resize);
        manager.set_pixel_density(2.0).unwrap();
        assert_eq!(manager.pixel_density(), 2.0);
        assert_eq!(*log.borrow(), vec!["Resize"]);
        assert!(backend
            .calls
            .borrow()
            .contains(&BackendCall::Configure(Viewport::new(800.0, 600.0, 2.0))));
    }

    #[test]
    fn owned_camera_follows_resizes() {
        let (mut manager, container, _backend) = manager(800, 600);
        container.set_size(1600, 600);
        manager.resize().unwrap();
        let camera = manager.camera().as_perspective().expect("owned camera");
        assert!((camera.aspect() - 1600.0 / 600.0).abs() < 1e-6);
    }

    struct Identity;

    impl Projection for Identity {
        fn view_projection(&self) -> Mat4 {
            Mat4::IDENTITY
        }
    }

    #[test]
    fn external_camera_is_used_as_given() {
        let manager = SceneManager::with_camera(
            FakeContainer::new(800, 600),
            RecordingBackend::default(),
            ManagerOptions::default(),
            Box::new(Identity),
        )
        .unwrap();
        assert!(!manager.camera().is_owned());
        assert_eq!(manager.camera().view_projection(), Mat4::IDENTITY);
    }

    #[test]
    fn destroy_twice_is_safe_and_releases_once() {
        let (mut manager, _container, backend) = manager(800, 600);
        let destroyed = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&destroyed);
        manager.callbacks().subscribe(ManagerEvent::Destroy, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        manager.destroy();
        manager.destroy();
        assert!(manager.is_destroyed());
        assert!(!manager.is_playing());
        assert!(manager.callbacks().is_empty());
        assert_eq!(*destroyed.borrow(), 1);
        assert_eq!(backend.count(&BackendCall::Dispose), 1);
        assert!(matches!(manager.render(), Err(SceneError::Destroyed)));
        assert!(matches!(manager.resize(), Err(SceneError::Destroyed)));
        manager.play();
        assert!(!manager.is_playing());
    }

    #[test]
    fn dropping_the_manager_disposes_the_surface() {
        let (manager, _container, backend) = manager(800, 600);
        drop(manager);
        assert_eq!(backend.count(&BackendCall::Dispose), 1);
    }
}
