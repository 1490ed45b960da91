//! Key bindings
//!
//! Physical keys map to logical actions so movement code never looks at key
//! codes directly and bindings can change at runtime.

use glam::Vec3;
use rustc_hash::FxHashMap;
use winit::keyboard::KeyCode;

// ============================================================================
// Input Actions
// ============================================================================

/// Logical input actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InputAction {
    /// Move forward
    MoveForward,
    /// Move backward
    MoveBackward,
    /// Strafe left
    MoveLeft,
    /// Strafe right
    MoveRight,
    /// Rise (noclip flight)
    MoveUp,
    /// Sink (noclip flight)
    MoveDown,
    /// Give up pointer capture
    ReleasePointer,
}

impl InputAction {
    /// Local-frame direction of a movement action (Z up, Y forward).
    ///
    /// Vertical actions are scaled to a quarter, matching flight controls.
    pub fn movement_axis(self) -> Option<Vec3> {
        match self {
            InputAction::MoveForward => Some(Vec3::Y),
            InputAction::MoveBackward => Some(Vec3::NEG_Y),
            InputAction::MoveLeft => Some(Vec3::NEG_X),
            InputAction::MoveRight => Some(Vec3::X),
            InputAction::MoveUp => Some(Vec3::Z * 0.25),
            InputAction::MoveDown => Some(Vec3::NEG_Z * 0.25),
            InputAction::ReleasePointer => None,
        }
    }
}

/// Bindings installed by [`InputMapper::with_defaults`]
const DEFAULT_BINDINGS: [(KeyCode, InputAction); 11] = [
    (KeyCode::KeyW, InputAction::MoveForward),
    (KeyCode::KeyS, InputAction::MoveBackward),
    (KeyCode::KeyA, InputAction::MoveLeft),
    (KeyCode::KeyD, InputAction::MoveRight),
    (KeyCode::ArrowUp, InputAction::MoveForward),
    (KeyCode::ArrowDown, InputAction::MoveBackward),
    (KeyCode::ArrowLeft, InputAction::MoveLeft),
    (KeyCode::ArrowRight, InputAction::MoveRight),
    (KeyCode::Space, InputAction::MoveUp),
    (KeyCode::ShiftLeft, InputAction::MoveDown),
    (KeyCode::Escape, InputAction::ReleasePointer),
];

/// Key to action table with a reverse index for listing an action's keys.
///
/// A key drives at most one action; an action may have several keys.
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    actions: FxHashMap<KeyCode, InputAction>,
    keys: FxHashMap<InputAction, Vec<KeyCode>>,
}

impl InputMapper {
    /// Mapper with nothing bound
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// WASD and arrows to walk, Space/ShiftLeft to fly, Escape to release
    /// the pointer
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut mapper = Self::new();
        for (key, action) in DEFAULT_BINDINGS {
            mapper.bind(key, action);
        }
        mapper
    }

    /// Bind `key` to `action`, moving it off whatever it drove before
    pub fn bind(&mut self, key: KeyCode, action: InputAction) {
        self.unbind(key);
        self.actions.insert(key, action);
        self.keys.entry(action).or_default().push(key);
    }

    /// Drop the binding of `key`, returning the action it drove
    pub fn unbind(&mut self, key: KeyCode) -> Option<InputAction> {
        let action = self.actions.remove(&key)?;
        if let Some(keys) = self.keys.get_mut(&action) {
            keys.retain(|bound| *bound != key);
        }
        Some(action)
    }

    /// Action driven by `key`
    #[must_use]
    pub fn get_action(&self, key: KeyCode) -> Option<InputAction> {
        self.actions.get(&key).copied()
    }

    /// Keys bound to `action`, in binding order
    #[must_use]
    pub fn get_keys(&self, action: InputAction) -> &[KeyCode] {
        self.keys.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}
