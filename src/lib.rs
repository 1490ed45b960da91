//! Fixed-timestep simulation loop with probe-based body physics
//!
//! This crate provides:
//! - A pausable clock and a fixed-step physics / capped render driver
//! - Bodies that collide with static geometry through six ray probes
//! - Worlds that step bodies in order at a shared tick rate
//! - First-person mouse-look and keyboard movement controls
//! - A winit application shell around all of it

pub mod core;
pub mod input;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use rapier3d;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{
        Clock, DebugInfo, Engine, EngineConfig, EngineContext, FixedTimestep, FrameStats,
        FrameStep, Game, ImpulseScaling, RenderFrame, Scene, SceneDescription, SimulationConfig,
        Transform,
    };
    pub use crate::input::{Controls, InputAction, InputEvent, InputMapper, PointerLock};
    pub use crate::physics::{
        Body, BodyId, ColliderGeometry, Contacts, Direction, Geometry, Shape, StaticGeometry,
        World,
    };
    pub use glam::{Mat4, Quat, Vec2, Vec3};
    pub use winit::keyboard::KeyCode;
}
