//! Application context and the winit driver around it
//!
//! `EngineContext` owns every per-application subsystem and runs one frame
//! at a time. `Engine` feeds it platform events and redraws.

use std::sync::Arc;

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use crate::core::debug::DebugInfo;
use crate::core::scene::Scene;
use crate::core::time::Clock;
use crate::core::timestep::{FixedTimestep, FrameStep};
use crate::core::{SimulationConfig, tick_interval};
use crate::input::{Controls, InputEvent, InputQueue, PointerRequest};
use crate::physics::World;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Loop, body and control tunables
    pub simulation: SimulationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("tickloop"),
            width: 1280,
            height: 720,
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Replace the simulation tunables
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }
}

/// What a render callback gets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Seconds since the previous render
    pub delta: f32,
    /// Fraction of a physics tick elapsed since the last step, in [0, 1)
    pub alpha: f32,
}

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once when the engine starts
    fn init(&mut self, ctx: &mut EngineContext);

    /// Called once per physics tick, before the world steps
    fn fixed_update(&mut self, _ctx: &mut EngineContext, _tick: f32) {}

    /// Called whenever a render is due
    fn render(&mut self, ctx: &mut EngineContext, frame: &RenderFrame);

    /// Called when the window is resized
    fn on_resize(&mut self, _ctx: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called when the game is shutting down
    fn shutdown(&mut self, _ctx: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    /// Tunables the context was built from
    pub config: SimulationConfig,
    /// Wall clock driving the loop
    pub clock: Clock,
    /// Physics and render accumulators
    pub timestep: FixedTimestep,
    /// Simulated bodies
    pub world: World,
    /// Look and movement input
    pub controls: Controls,
    /// Scene members and probe geometry
    pub scene: Scene,
    /// Platform events waiting for the next frame
    pub input: InputQueue,
    /// Debug information and stats
    pub debug: DebugInfo,
    /// Window size
    window_size: PhysicalSize<u32>,
    /// Should the engine quit
    should_quit: bool,
}

impl EngineContext {
    /// Build every subsystem from one config. The clock starts stopped.
    pub fn new(config: SimulationConfig, width: u32, height: u32) -> Self {
        let mut controls = Controls::new(&config);
        controls.connect();
        controls.resize(width, height);

        Self {
            clock: Clock::new().with_scale(config.time_scale),
            timestep: FixedTimestep::new(config.physics_tick_rate, config.render_tick_rate),
            world: World::from_config(&config),
            controls,
            scene: Scene::default(),
            input: InputQueue::new(),
            debug: DebugInfo::new(),
            window_size: PhysicalSize::new(width, height),
            should_quit: false,
            config,
        }
    }

    /// Tick the clock and run one frame with the elapsed time
    pub fn frame<G: Game + ?Sized>(&mut self, game: &mut G) -> FrameStep {
        let delta = self.clock.tick();
        self.advance(game, delta)
    }

    /// Run one frame of `delta` seconds.
    ///
    /// Input queued before the call is applied first. Each physics tick
    /// pushes the bound body with the held movement keys, calls
    /// `fixed_update`, then steps the world against the scene. A due render
    /// applies mouse look, interpolates the scene, then calls `render`.
    pub fn advance<G: Game + ?Sized>(&mut self, game: &mut G, delta: f32) -> FrameStep {
        self.input.swap();
        for event in self.input.drain() {
            self.controls.handle_event(&event);
        }

        let step = self.timestep.advance(delta);
        let tick = self.timestep.physics_interval();
        self.world.debug = self.debug.enabled;

        for _ in 0..step.physics_steps {
            if let Some(target) = self.controls.target()
                && let Some(body) = self.world.body_mut(target)
            {
                self.controls.apply_movement(body);
            }
            game.fixed_update(self, tick);
            self.world.step(&self.scene);
        }

        if let Some(render_delta) = step.render {
            self.controls.update();
            self.scene.update_render(&self.world, render_delta, step.alpha);
            game.render(
                self,
                &RenderFrame {
                    delta: render_delta,
                    alpha: step.alpha,
                },
            );
        }

        self.debug.record_frame(delta, &step);
        if self.debug.enabled && step.stepped() {
            self.debug.clear_lines();
            for snapshot in self.world.debug_snapshots() {
                let contacts: Vec<&str> = snapshot.contacts.iter().map(|d| d.name()).collect();
                self.debug.add_line(format!(
                    "{:?} pos {:.2} vel {:.3} contacts [{}]",
                    snapshot.id,
                    snapshot.position,
                    snapshot.velocity,
                    contacts.join(", ")
                ));
            }
        }
        step
    }

    /// Stop the clock; frames advance by zero until resumed
    pub fn pause(&mut self) {
        self.clock.stop();
    }

    /// Restart the clock without counting the paused time
    pub fn resume(&mut self) {
        self.clock.start();
    }

    /// Whether the clock is stopped
    pub fn is_paused(&self) -> bool {
        !self.clock.is_running()
    }

    /// Pause while hidden, resume when shown again
    pub fn visibility_changed(&mut self, visible: bool) {
        match (visible, self.is_paused()) {
            (false, false) => {
                log::debug!("Hidden, pausing");
                self.pause();
            }
            (true, true) => {
                log::debug!("Visible, resuming");
                self.resume();
            }
            _ => {}
        }
    }

    /// Change the physics rate of both the loop and the world.
    ///
    /// An invalid rate leaves both untouched, so a loop step always covers
    /// exactly one world tick. Returns whether the rate was applied.
    pub fn set_physics_tick_rate(&mut self, rate: f32) -> bool {
        if tick_interval(rate).is_none() {
            log::warn!("Ignoring invalid physics tick rate {rate}");
            return false;
        }
        self.timestep.set_physics_tick_rate(rate) && self.world.set_tick_rate(rate)
    }

    /// Change the render cap; non-positive means every frame
    pub fn set_render_tick_rate(&mut self, rate: f32) {
        self.timestep.set_render_tick_rate(rate);
    }

    /// Get window width
    pub fn width(&self) -> u32 {
        self.window_size.width
    }

    /// Get window height
    pub fn height(&self) -> u32 {
        self.window_size.height
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if engine should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Tear down: disconnect the controls, then let the game shut down
    pub fn close<G: Game + ?Sized>(&mut self, game: &mut G) {
        self.controls.disconnect();
        self.controls.unbind();
        game.shutdown(self);
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    window: Option<Arc<Window>>,
    initialized: bool,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        let context = EngineContext::new(config.simulation.clone(), config.width, config.height);
        Self {
            config,
            game,
            context,
            window: None,
            initialized: false,
        }
    }

    /// Run the engine
    pub fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::init();
        self.config.simulation.validate()?;
        log::info!("Starting engine: {}", self.config.title);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        Ok(())
    }

    /// Carry out a pointer capture request and report the result back
    /// through the input queue
    fn apply_pointer_request(&mut self) {
        let Some(request) = self.context.controls.take_pointer_request() else {
            return;
        };
        let Some(window) = &self.window else {
            return;
        };

        match request {
            PointerRequest::Lock => {
                let grabbed = window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
                match grabbed {
                    Ok(()) => {
                        window.set_cursor_visible(false);
                        self.context.input.push(InputEvent::PointerLockChanged(true));
                    }
                    Err(e) => log::warn!("Pointer lock refused: {e}"),
                }
            }
            PointerRequest::Unlock => {
                if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
                    log::warn!("Pointer release failed: {e}");
                }
                window.set_cursor_visible(true);
                self.context.input.push(InputEvent::PointerLockChanged(false));
            }
        }
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.context.window_size = size;
        self.context.input.push(InputEvent::Resized {
            width: size.width,
            height: size.height,
        });
        self.window = Some(window);

        if !self.initialized {
            self.game.init(&mut self.context);
            self.context.resume();
            self.initialized = true;
            log::info!("Engine initialized successfully");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.context.close(&mut self.game);
                self.apply_pointer_request();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    self.context.window_size = new_size;
                    self.context.input.push(InputEvent::Resized {
                        width: new_size.width,
                        height: new_size.height,
                    });
                    self.game
                        .on_resize(&mut self.context, new_size.width, new_size.height);
                }
            }

            WindowEvent::Occluded(occluded) => {
                self.context.visibility_changed(!occluded);
            }

            WindowEvent::Focused(false) => {
                // Capture does not survive losing focus
                self.context.controls.request_unlock();
                self.apply_pointer_request();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.context.input.push(InputEvent::Key {
                        code,
                        pressed: event.state.is_pressed(),
                        repeat: event.repeat,
                    });
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.context.input.push(InputEvent::MouseButton {
                    button,
                    pressed: state == ElementState::Pressed,
                });
            }

            WindowEvent::RedrawRequested => {
                self.context.frame(&mut self.game);

                if self.context.should_quit() {
                    self.context.close(&mut self.game);
                    self.apply_pointer_request();
                    event_loop.exit();
                    return;
                }

                self.apply_pointer_request();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.context
                .input
                .push(InputEvent::MouseMotion(Vec2::new(dx as f32, dy as f32)));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use winit::keyboard::KeyCode;

    use super::*;
    use crate::physics::{Body, EmptyGeometry};

    #[derive(Default)]
    struct Recorder {
        ticks: Vec<f32>,
        renders: Vec<RenderFrame>,
        quit_after: Option<usize>,
    }

    impl Game for Recorder {
        fn init(&mut self, _ctx: &mut EngineContext) {}

        fn fixed_update(&mut self, ctx: &mut EngineContext, tick: f32) {
            self.ticks.push(tick);
            if self.quit_after == Some(self.ticks.len()) {
                ctx.quit();
            }
        }

        fn render(&mut self, _ctx: &mut EngineContext, frame: &RenderFrame) {
            self.renders.push(*frame);
        }
    }

    fn context() -> EngineContext {
        EngineContext::new(SimulationConfig::default(), 900, 600)
    }

    #[test]
    fn test_advance_runs_physics_and_render() {
        let mut ctx = context();
        let mut game = Recorder::default();

        let step = ctx.advance(&mut game, 0.07);

        assert_eq!(step.physics_steps, 2);
        assert_eq!(game.ticks.len(), 2);
        assert!((game.ticks[0] - 1.0 / 30.0).abs() < 1e-6);
        assert_eq!(game.renders.len(), 1);
        assert!((game.renders[0].alpha - step.alpha).abs() < 1e-6);
        assert_eq!(ctx.world.steps(), 2);
        assert_eq!(ctx.debug.frame_stats.total_steps(), 2);
    }

    #[test]
    fn test_render_cap_skips_frames() {
        let mut ctx = context();
        ctx.set_render_tick_rate(10.0);
        let mut game = Recorder::default();

        for _ in 0..3 {
            ctx.advance(&mut game, 0.01);
        }
        assert!(game.ticks.is_empty());
        assert!(game.renders.is_empty());

        // A physics step forces a render at the capped delta
        ctx.advance(&mut game, 0.01);
        assert_eq!(game.ticks.len(), 1);
        assert_eq!(game.renders.len(), 1);
        assert!((game.renders[0].delta - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_input_applies_on_next_frame() {
        let mut ctx = context();
        let mut game = Recorder::default();

        ctx.input.push(InputEvent::Key {
            code: KeyCode::KeyW,
            pressed: true,
            repeat: false,
        });
        assert!(!ctx.controls.is_pressed(KeyCode::KeyW));

        ctx.advance(&mut game, 0.0);
        assert!(ctx.controls.is_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_movement_applied_once_per_tick() {
        let config = SimulationConfig::default();
        let mut ctx = EngineContext::new(config.clone(), 900, 600);
        let id = ctx
            .world
            .add_body(Body::from_config(&config).with_position(Vec3::new(0.0, 0.0, 5.0)));
        ctx.controls.bind(id);
        ctx.input.push(InputEvent::Key {
            code: KeyCode::KeyW,
            pressed: true,
            repeat: false,
        });

        let mut game = Recorder::default();
        ctx.advance(&mut game, 0.07);

        let mut reference = World::from_config(&config);
        let expected =
            reference.add_body(Body::from_config(&config).with_position(Vec3::new(0.0, 0.0, 5.0)));
        for _ in 0..2 {
            reference
                .body_mut(expected)
                .unwrap()
                .apply_impulse(Vec3::new(0.0, config.acceleration, 0.0));
            reference.step(&EmptyGeometry);
        }

        let moved = ctx.world.body(id).unwrap();
        let expected = reference.body(expected).unwrap();
        assert!(moved.position.distance(expected.position) < 1e-5);
        assert!(moved.velocity.y > 0.0);
    }

    #[test]
    fn test_mouse_look_waits_for_lock() {
        let mut ctx = context();
        let mut game = Recorder::default();

        ctx.input.push(InputEvent::MouseButton {
            button: winit::event::MouseButton::Left,
            pressed: true,
        });
        ctx.input.push(InputEvent::MouseMotion(Vec2::new(100.0, 0.0)));
        ctx.advance(&mut game, 0.01);
        assert_eq!(ctx.controls.yaw(), 0.0);
        assert_eq!(ctx.controls.take_pointer_request(), Some(PointerRequest::Lock));

        ctx.input.push(InputEvent::PointerLockChanged(true));
        ctx.input.push(InputEvent::MouseMotion(Vec2::new(100.0, 0.0)));
        ctx.advance(&mut game, 0.01);
        assert!((ctx.controls.yaw() + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_quit_from_fixed_update() {
        let mut ctx = context();
        let mut game = Recorder {
            quit_after: Some(1),
            ..Default::default()
        };
        ctx.advance(&mut game, 0.04);
        assert!(ctx.should_quit());
    }

    #[test]
    fn test_invalid_tick_rate_keeps_loop_and_world_in_step() {
        let config = SimulationConfig::default().with_physics_tick_rate(60.0);
        let mut ctx = EngineContext::new(config, 900, 600);

        assert!(!ctx.set_physics_tick_rate(0.0));
        assert!(!ctx.set_physics_tick_rate(f32::INFINITY));
        assert_eq!(ctx.timestep.physics_interval(), ctx.world.tick_duration());
        assert!((ctx.world.tick_duration() - 1.0 / 60.0).abs() < 1e-7);

        assert!(ctx.set_physics_tick_rate(120.0));
        assert_eq!(ctx.timestep.physics_interval(), ctx.world.tick_duration());
    }

    #[test]
    fn test_close_disconnects_controls() {
        let mut ctx = context();
        let id = ctx.world.add_body(Body::new());
        ctx.controls.bind(id);
        ctx.input.push(InputEvent::PointerLockChanged(true));
        ctx.input.push(InputEvent::Key {
            code: KeyCode::KeyW,
            pressed: true,
            repeat: false,
        });
        let mut game = Recorder::default();
        ctx.advance(&mut game, 0.0);
        assert!(ctx.controls.is_moving());

        ctx.close(&mut game);
        assert!(!ctx.controls.is_connected());
        assert!(!ctx.controls.is_moving());
        assert_eq!(ctx.controls.target(), None);
        assert_eq!(ctx.controls.take_pointer_request(), Some(PointerRequest::Unlock));
    }

    #[test]
    fn test_pause_and_visibility() {
        let mut ctx = context();
        assert!(ctx.is_paused());

        ctx.visibility_changed(true);
        assert!(!ctx.is_paused());

        ctx.visibility_changed(false);
        assert!(ctx.is_paused());

        let mut game = Recorder::default();
        let step = ctx.frame(&mut game);
        assert_eq!(step.physics_steps, 0);
    }

    #[test]
    fn test_debug_lines_from_world() {
        let mut ctx = context();
        ctx.world.add_body(Body::new());
        ctx.debug.enabled = true;

        let mut game = Recorder::default();
        ctx.advance(&mut game, 0.04);

        let lines = ctx.debug.get_all_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("pos"));
    }
}
