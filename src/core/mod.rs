//! Core engine module
//!
//! Clock, fixed-timestep driver, configuration, scene members and the
//! application context that ties them together.

mod config;
mod debug;
mod engine;
mod scene;
mod time;
mod timestep;

pub(crate) use config::tick_interval;
pub use config::{ConfigError, DEFAULT_TICK_RATE, ImpulseScaling, SimulationConfig};
pub use debug::{DebugInfo, FrameStats};
pub use engine::{Engine, EngineConfig, EngineContext, Game, RenderFrame};
pub use scene::{
    Animator, BodyDescription, MemberKind, Scene, SceneDescription, SceneError, SceneMember,
    StaticDescription, Transform,
};
pub use time::Clock;
pub use timestep::{FixedTimestep, FrameStep};
