//! Simulation tunables
//!
//! Loaded from RON (or JSON) and validated once at startup. Everything
//! downstream of `validate` assumes positive rates and sane factors.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tick rate used wherever a configured rate cannot be
pub const DEFAULT_TICK_RATE: f32 = 30.0;

/// Seconds per tick, or `None` for a rate that is not finite and positive
pub(crate) fn tick_interval(rate: f32) -> Option<f32> {
    (rate.is_finite() && rate > 0.0).then(|| 1.0 / rate)
}

fn interval_or_default(name: &str, rate: f32) -> f32 {
    tick_interval(rate).unwrap_or_else(|| {
        log::warn!("Invalid {name} {rate}, using {DEFAULT_TICK_RATE}");
        1.0 / DEFAULT_TICK_RATE
    })
}

/// How `Body::apply_impulse` treats the configured tick rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImpulseScaling {
    /// Add the impulse to velocity unchanged
    #[default]
    Raw,
    /// Scale by `tick duration / reference tick` so impulse strength does
    /// not depend on the physics rate
    TickRelative,
}

/// Every recognized simulation tunable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics ticks per second
    pub physics_tick_rate: f32,
    /// Rendered frames per second, `<= 0` for unlimited
    pub render_tick_rate: f32,
    /// Rate at which one unit of velocity moves one unit per tick
    pub reference_tick_rate: f32,
    /// Clock time dilation
    pub time_scale: f32,
    /// Gravity magnitude given to new bodies
    pub gravity: f32,
    /// World gravity direction (Z up)
    pub gravity_direction: Vec3,
    /// Per-axis velocity decay per reference tick
    pub damping: Vec3,
    /// Horizontal speed cap, `<= 0` disables it
    pub max_speed: f32,
    /// Default collision probe length
    pub body_radius: f32,
    /// Mouse look multiplier
    pub look_sensitivity: f32,
    /// Impulse added per held movement key per tick
    pub acceleration: f32,
    /// Cap on the combined movement impulse
    pub max_acceleration: f32,
    /// Impulse scaling mode
    pub impulse_scaling: ImpulseScaling,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics_tick_rate: 30.0,
            render_tick_rate: -1.0,
            reference_tick_rate: 30.0,
            time_scale: 1.0,
            gravity: 9.8,
            gravity_direction: Vec3::NEG_Z,
            damping: Vec3::new(0.75, 0.75, 0.9),
            max_speed: 0.25,
            body_radius: 1.0,
            look_sensitivity: 1.0,
            acceleration: 0.05,
            max_acceleration: 0.25,
            impulse_scaling: ImpulseScaling::Raw,
        }
    }
}

impl SimulationConfig {
    /// Set the physics rate in ticks per second
    pub fn with_physics_tick_rate(mut self, rate: f32) -> Self {
        self.physics_tick_rate = rate;
        self
    }

    /// Set the render cap in frames per second (`<= 0` for unlimited)
    pub fn with_render_tick_rate(mut self, rate: f32) -> Self {
        self.render_tick_rate = rate;
        self
    }

    /// Set the gravity magnitude
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set per-axis damping
    pub fn with_damping(mut self, damping: Vec3) -> Self {
        self.damping = damping;
        self
    }

    /// Set the look sensitivity
    pub fn with_look_sensitivity(mut self, sensitivity: f32) -> Self {
        self.look_sensitivity = sensitivity;
        self
    }

    /// Set the impulse scaling mode
    pub fn with_impulse_scaling(mut self, scaling: ImpulseScaling) -> Self {
        self.impulse_scaling = scaling;
        self
    }

    /// Seconds per physics tick; an unusable rate falls back to 30 Hz
    pub fn physics_interval(&self) -> f32 {
        interval_or_default("physics_tick_rate", self.physics_tick_rate)
    }

    /// Seconds per reference tick; an unusable rate falls back to 30 Hz
    pub fn reference_interval(&self) -> f32 {
        interval_or_default("reference_tick_rate", self.reference_tick_rate)
    }

    /// Reject values the simulation cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        }

        positive("physics_tick_rate", self.physics_tick_rate)?;
        positive("reference_tick_rate", self.reference_tick_rate)?;
        positive("body_radius", self.body_radius)?;

        if !self.render_tick_rate.is_finite() {
            return Err(ConfigError::Invalid("render_tick_rate must be finite".into()));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be non-negative, got {}",
                self.time_scale
            )));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite".into()));
        }
        if !self.gravity_direction.is_finite() || self.gravity_direction.length_squared() == 0.0 {
            return Err(ConfigError::Invalid("gravity_direction must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.damping.min_element())
            || !(0.0..=1.0).contains(&self.damping.max_element())
        {
            return Err(ConfigError::Invalid(format!(
                "damping components must lie in [0, 1], got {}",
                self.damping
            )));
        }
        for (name, value) in [
            ("max_speed", self.max_speed),
            ("look_sensitivity", self.look_sensitivity),
            ("acceleration", self.acceleration),
            ("max_acceleration", self.max_acceleration),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite")));
            }
        }
        Ok(())
    }

    /// Parse and validate a RON document
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::from_str(source).map_err(|e| ConfigError::DeserializeError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load and validate a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::DeserializeError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// A value the simulation cannot run with
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
