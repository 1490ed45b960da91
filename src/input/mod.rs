//! Input handling module
//!
//! Platform events are queued, drained once per frame into `Controls`, and
//! turned into a view rotation and a per-tick movement impulse.

mod bindings;
mod controls;
mod events;

pub use bindings::{InputAction, InputMapper};
pub use controls::{Controls, PointerLock, PointerRequest};
pub use events::{InputEvent, InputQueue};
