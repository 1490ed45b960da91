//! First-person look and movement controls
//!
//! Mouse motion accumulates between frames and is drained once per
//! [`Controls::update`]. Held movement keys become an impulse that the loop
//! applies to the bound body once per physics tick.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{EulerRot, Quat, Vec2, Vec3};
use rustc_hash::FxHashSet;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use super::bindings::{InputAction, InputMapper};
use super::events::InputEvent;
use crate::core::SimulationConfig;
use crate::physics::{Body, BodyId};

/// Radians per pixel at sensitivity 1
const LOOK_SCALE: f32 = 0.001;

/// Pointer capture state as last confirmed by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerLock {
    #[default]
    Unlocked,
    Locked,
}

/// Pointer capture change the platform should attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRequest {
    Lock,
    Unlock,
}

/// Mouse-look and keyboard movement state
#[derive(Debug, Clone)]
pub struct Controls {
    /// Pointer movement not yet applied to the view
    mouse_delta: Vec2,
    /// Accumulated delta before the most recent sample
    previous_mouse_delta: Vec2,
    pressed_keys: FxHashSet<KeyCode>,
    mapper: InputMapper,
    /// Look multiplier
    pub look_sensitivity: f32,
    /// Impulse per held movement key
    pub acceleration: f32,
    /// Cap on the combined movement impulse
    pub max_acceleration: f32,
    pointer: PointerLock,
    request: Option<PointerRequest>,
    viewport: Vec2,
    connected: bool,
    /// Rotation about Z
    yaw: f32,
    /// Rotation about local X; 0 looks straight down, PI straight up
    pitch: f32,
    target: Option<BodyId>,
}

impl Controls {
    /// Controls using the look and movement tunables of a config
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            mouse_delta: Vec2::ZERO,
            previous_mouse_delta: Vec2::ZERO,
            pressed_keys: FxHashSet::default(),
            mapper: InputMapper::with_defaults(),
            look_sensitivity: config.look_sensitivity,
            acceleration: config.acceleration,
            max_acceleration: config.max_acceleration,
            pointer: PointerLock::Unlocked,
            request: None,
            viewport: Vec2::ZERO,
            connected: false,
            yaw: 0.0,
            pitch: FRAC_PI_2,
            target: None,
        }
    }

    /// Replace the key bindings
    pub fn with_mapper(mut self, mapper: InputMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Start accepting input
    pub fn connect(&mut self) {
        self.connected = true;
    }

    /// Stop accepting input and forget any held state
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.pressed_keys.clear();
        self.mouse_delta = Vec2::ZERO;
        self.previous_mouse_delta = Vec2::ZERO;
        if self.pointer == PointerLock::Locked {
            self.request = Some(PointerRequest::Unlock);
        }
    }

    /// Whether input is accepted
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bind a key at runtime. A held key is released first so it cannot
    /// keep driving its old action.
    pub fn rebind(&mut self, code: KeyCode, action: InputAction) {
        self.pressed_keys.remove(&code);
        self.mapper.bind(code, action);
    }

    /// Remove a key's binding, returning the action it drove
    pub fn unbind_key(&mut self, code: KeyCode) -> Option<InputAction> {
        self.pressed_keys.remove(&code);
        self.mapper.unbind(code)
    }

    /// Keys currently bound to an action
    pub fn keys_for(&self, action: InputAction) -> &[KeyCode] {
        self.mapper.get_keys(action)
    }

    /// Drive this body with movement input
    pub fn bind(&mut self, target: BodyId) {
        self.target = Some(target);
    }

    /// Stop driving any body
    pub fn unbind(&mut self) {
        self.target = None;
    }

    /// Bound body
    pub fn target(&self) -> Option<BodyId> {
        self.target
    }

    /// Viewport size used by the glitch filter
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
    }

    /// Route one platform event
    pub fn handle_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::MouseMotion(delta) => {
                self.mouse_move(delta);
            }
            InputEvent::MouseButton { button, pressed } => {
                if pressed {
                    self.mouse_down(button);
                }
            }
            InputEvent::Key {
                code,
                pressed: true,
                repeat,
            } => self.key_down(code, repeat),
            InputEvent::Key {
                code,
                pressed: false,
                ..
            } => self.key_up(code),
            InputEvent::PointerLockChanged(locked) => self.on_pointer_lock_change(locked),
            InputEvent::Resized { width, height } => self.resize(width, height),
        }
    }

    /// Accumulate relative pointer movement.
    ///
    /// Ignored unless connected and locked. A sample larger than a third of
    /// the viewport in either axis is a capture-reacquire glitch and is
    /// discarded. Returns whether the sample was kept.
    pub fn mouse_move(&mut self, delta: Vec2) -> bool {
        if !self.connected || self.pointer != PointerLock::Locked || !delta.is_finite() {
            return false;
        }

        self.previous_mouse_delta = self.mouse_delta;
        self.mouse_delta += delta;

        let limit = self.viewport / 3.0;
        let glitch = (limit.x > 0.0 && delta.x.abs() > limit.x)
            || (limit.y > 0.0 && delta.y.abs() > limit.y);
        if glitch {
            log::debug!("Discarding pointer jump {delta}");
            self.mouse_delta = self.previous_mouse_delta;
            return false;
        }
        true
    }

    /// A click while unlocked asks for pointer capture
    pub fn mouse_down(&mut self, _button: MouseButton) {
        if self.connected {
            self.request_lock();
        }
    }

    /// Record a key press; auto-repeats are ignored
    pub fn key_down(&mut self, code: KeyCode, repeat: bool) {
        if !self.connected || repeat {
            return;
        }
        if self.mapper.get_action(code) == Some(InputAction::ReleasePointer) {
            self.request_unlock();
        }
        self.pressed_keys.insert(code);
    }

    /// Record a key release
    pub fn key_up(&mut self, code: KeyCode) {
        self.pressed_keys.remove(&code);
    }

    /// Ask the platform for pointer capture.
    ///
    /// The state stays `Unlocked` until the platform confirms through
    /// [`Controls::on_pointer_lock_change`].
    pub fn request_lock(&mut self) {
        if self.pointer == PointerLock::Unlocked {
            self.request = Some(PointerRequest::Lock);
        }
    }

    /// Ask the platform to release pointer capture
    pub fn request_unlock(&mut self) {
        if self.pointer == PointerLock::Locked {
            self.request = Some(PointerRequest::Unlock);
        }
    }

    /// Take the outstanding capture request, if any
    pub fn take_pointer_request(&mut self) -> Option<PointerRequest> {
        self.request.take()
    }

    /// Platform notification that capture was granted or revoked
    pub fn on_pointer_lock_change(&mut self, locked: bool) {
        let next = if locked {
            PointerLock::Locked
        } else {
            PointerLock::Unlocked
        };
        if next != self.pointer {
            log::info!("Pointer lock: {:?} -> {:?}", self.pointer, next);
        }
        self.pointer = next;
        if !locked {
            self.mouse_delta = Vec2::ZERO;
        }
    }

    /// Confirmed pointer capture state
    pub fn pointer_lock(&self) -> PointerLock {
        self.pointer
    }

    /// Apply accumulated mouse movement to the view and drain it.
    ///
    /// Returns whether the view changed.
    pub fn update(&mut self) -> bool {
        if !self.is_looking() {
            return false;
        }

        let turn = self.mouse_delta * self.look_sensitivity * LOOK_SCALE;
        self.yaw -= turn.x;
        self.pitch = (self.pitch - turn.y).clamp(0.0, PI);
        self.mouse_delta = Vec2::ZERO;
        true
    }

    /// Whether mouse movement is waiting to be applied
    pub fn is_looking(&self) -> bool {
        self.mouse_delta != Vec2::ZERO
    }

    /// Whether any horizontal movement key is held
    pub fn is_moving(&self) -> bool {
        self.pressed_keys.iter().any(|code| {
            matches!(
                self.mapper.get_action(*code),
                Some(
                    InputAction::MoveForward
                        | InputAction::MoveBackward
                        | InputAction::MoveLeft
                        | InputAction::MoveRight
                )
            )
        })
    }

    /// Whether a key is held
    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed_keys.contains(&code)
    }

    /// Pending mouse movement
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Full view rotation (yaw then pitch, Z up)
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::ZYX, self.yaw, 0.0, self.pitch)
    }

    /// Ground-plane facing, ignoring pitch
    pub fn heading(&self) -> Quat {
        Quat::from_rotation_z(self.yaw)
    }

    /// Rotation about Z in radians
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in radians, within `[0, PI]`
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set the view angles directly; pitch is clamped
    pub fn set_angles(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(0.0, PI);
    }

    /// Combined impulse from held movement keys, in world space.
    ///
    /// Each held key contributes `acceleration` along its local axis. The
    /// sum is capped at `max_acceleration` and turned to the heading.
    pub fn movement_impulse(&self) -> Vec3 {
        let local: Vec3 = self
            .pressed_keys
            .iter()
            .filter_map(|code| self.mapper.get_action(*code)?.movement_axis())
            .sum::<Vec3>()
            * self.acceleration;

        if local == Vec3::ZERO {
            return Vec3::ZERO;
        }
        let capped = if self.max_acceleration > 0.0 {
            local.clamp_length_max(self.max_acceleration)
        } else {
            local
        };
        self.heading() * capped
    }

    /// Turn the body to the heading and push it with the movement impulse.
    ///
    /// Call once per physics tick. Vertical movement only reaches noclip
    /// bodies.
    pub fn apply_movement(&self, body: &mut Body) {
        body.orientation = self.heading();

        let mut impulse = self.movement_impulse();
        if !body.noclip {
            impulse.z = 0.0;
        }
        if impulse != Vec3::ZERO {
            body.apply_impulse(impulse);
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}
