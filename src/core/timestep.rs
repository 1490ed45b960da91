//! Fixed-timestep loop driver
//!
//! Physics always advances in whole ticks of `physics_interval`. Whatever
//! frame time is left over stays in the accumulator for the next frame and
//! becomes the interpolation factor (`alpha`) for rendering.

use super::config::{DEFAULT_TICK_RATE, tick_interval};

/// Largest alpha handed to renderers. Keeps alpha strictly below 1.
const ALPHA_MAX: f32 = 1.0 - f32::EPSILON / 2.0;

/// What a single frame should do
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Number of fixed physics ticks to run this frame
    pub physics_steps: u32,
    /// Fraction of the next tick already elapsed, in `[0, 1)`
    pub alpha: f32,
    /// Render delta, if a render is due this frame
    pub render: Option<f32>,
}

impl FrameStep {
    /// Whether at least one physics tick runs this frame
    pub fn stepped(&self) -> bool {
        self.physics_steps > 0
    }
}

/// Accumulator-based frame scheduler
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    physics_interval: f32,
    /// `None` renders every frame
    render_interval: Option<f32>,
    physics_accumulator: f32,
    render_accumulator: f32,
    alpha: f32,
}

impl FixedTimestep {
    /// Create a scheduler from tick rates in ticks per second.
    ///
    /// A render rate `<= 0` means unlimited. The physics rate must be
    /// positive; `SimulationConfig::validate` rejects anything else before it
    /// gets here, and a non-positive value falls back to 30 ticks per second.
    pub fn new(physics_tick_rate: f32, render_tick_rate: f32) -> Self {
        Self {
            physics_interval: physics_interval(physics_tick_rate),
            render_interval: tick_interval(render_tick_rate),
            physics_accumulator: 0.0,
            render_accumulator: 0.0,
            alpha: 0.0,
        }
    }

    /// Feed one frame's delta and decide what the frame runs.
    ///
    /// Non-finite or negative deltas count as zero.
    pub fn advance(&mut self, delta: f32) -> FrameStep {
        let delta = if delta.is_finite() && delta > 0.0 {
            delta
        } else {
            0.0
        };

        self.physics_accumulator += delta;
        let mut physics_steps = 0;
        while self.physics_accumulator >= self.physics_interval {
            self.physics_accumulator -= self.physics_interval;
            physics_steps += 1;
        }
        self.alpha = (self.physics_accumulator / self.physics_interval).clamp(0.0, ALPHA_MAX);

        if physics_steps > 1 {
            log::debug!("Catch-up frame: {physics_steps} physics steps for {delta:.4}s");
        }

        self.render_accumulator += delta;
        let render = match self.render_interval {
            None => Some(delta),
            Some(interval) => {
                let due = self.render_accumulator >= interval;
                if due {
                    self.render_accumulator %= interval;
                }
                (due || physics_steps > 0).then_some(interval)
            }
        };

        FrameStep {
            physics_steps,
            alpha: self.alpha,
            render,
        }
    }

    /// Seconds per physics tick
    pub fn physics_interval(&self) -> f32 {
        self.physics_interval
    }

    /// Seconds per rendered frame, `None` when unlimited
    pub fn render_interval(&self) -> Option<f32> {
        self.render_interval
    }

    /// Unconsumed simulation time
    pub fn physics_accumulator(&self) -> f32 {
        self.physics_accumulator
    }

    /// Time since the last capped render
    pub fn render_accumulator(&self) -> f32 {
        self.render_accumulator
    }

    /// Interpolation factor computed by the last `advance`
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Change the physics rate. The accumulated remainder is kept.
    ///
    /// Rates that are not finite and positive are ignored. Returns whether
    /// the rate was applied.
    pub fn set_physics_tick_rate(&mut self, rate: f32) -> bool {
        let Some(interval) = tick_interval(rate) else {
            log::warn!("Ignoring invalid physics tick rate {rate}");
            return false;
        };
        self.physics_interval = interval;
        true
    }

    /// Change the render cap; `<= 0` means unlimited
    pub fn set_render_tick_rate(&mut self, rate: f32) {
        self.render_interval = tick_interval(rate);
        self.render_accumulator = 0.0;
    }

    /// Drop all accumulated time
    pub fn reset(&mut self) {
        self.physics_accumulator = 0.0;
        self.render_accumulator = 0.0;
        self.alpha = 0.0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(30.0, -1.0)
    }
}

fn physics_interval(rate: f32) -> f32 {
    tick_interval(rate).unwrap_or_else(|| {
        log::warn!("Invalid physics tick rate {rate}, using {DEFAULT_TICK_RATE}");
        1.0 / DEFAULT_TICK_RATE
    })
}
