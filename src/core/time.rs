//! Wall-clock time tracking with pause and time dilation

use std::time::Instant;

/// Frame clock.
///
/// `tick` reports the scaled wall time since the previous call. Stopping the
/// clock freezes `elapsed`; starting it again resumes from the frozen value
/// with a fresh baseline, so a paused session never sees a time jump.
#[derive(Debug, Clone)]
pub struct Clock {
    /// Scaled seconds accumulated while running
    elapsed: f64,
    /// Elapsed value captured by the last `stop`
    paused_elapsed: f64,
    /// Time dilation factor
    pub scale: f32,
    /// Timestamp of the previous tick (or start)
    last: Option<Instant>,
    running: bool,
}

impl Clock {
    /// Create a stopped clock with scale 1
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            paused_elapsed: 0.0,
            scale: 1.0,
            last: None,
            running: false,
        }
    }

    /// Create a clock that is already running
    pub fn started() -> Self {
        let mut clock = Self::new();
        clock.start();
        clock
    }

    /// Set the time dilation factor
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Scaled seconds since the previous tick
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Tick against an explicit timestamp.
    ///
    /// Returns 0 while stopped. Timestamps earlier than the previous one
    /// count as no time passing.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        if !self.running {
            return 0.0;
        }

        let raw = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);

        let delta = raw * self.scale;
        if delta.is_finite() && delta > 0.0 {
            self.elapsed += f64::from(delta);
            delta
        } else {
            0.0
        }
    }

    /// Resume the clock
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Resume the clock using `now` as the new baseline
    pub fn start_at(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.elapsed = self.paused_elapsed;
        self.last = Some(now);
        self.running = true;
        log::debug!("Clock started at {:.3}s", self.elapsed);
    }

    /// Pause the clock, freezing `elapsed`
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.paused_elapsed = self.elapsed;
        self.last = None;
        self.running = false;
        log::debug!("Clock stopped at {:.3}s", self.elapsed);
    }

    /// Scaled seconds accumulated while running
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Whether the clock is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tick_measures_scaled_time() {
        let base = Instant::now();
        let mut clock = Clock::new().with_scale(2.0);
        clock.start_at(base);

        let delta = clock.tick_at(base + Duration::from_millis(100));
        assert!((delta - 0.2).abs() < 1e-5);
        assert!((clock.elapsed() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_tick_while_stopped_returns_zero() {
        let base = Instant::now();
        let mut clock = Clock::new();
        assert_eq!(clock.tick_at(base), 0.0);

        clock.start_at(base);
        clock.tick_at(base + Duration::from_millis(50));
        clock.stop();

        assert_eq!(clock.tick_at(base + Duration::from_secs(5)), 0.0);
        assert!((clock.elapsed() - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_stop_start_preserves_elapsed() {
        let base = Instant::now();
        let mut clock = Clock::new();
        clock.start_at(base);
        clock.tick_at(base + Duration::from_millis(250));
        let before = clock.elapsed();

        clock.stop();
        clock.start_at(base + Duration::from_millis(250));
        assert_eq!(clock.elapsed(), before);
    }

    #[test]
    fn test_resume_has_no_time_jump() {
        let base = Instant::now();
        let mut clock = Clock::new();
        clock.start_at(base);
        clock.tick_at(base + Duration::from_millis(100));
        clock.stop();

        // Ten seconds hidden
        let resume = base + Duration::from_secs(10);
        clock.start_at(resume);
        let delta = clock.tick_at(resume + Duration::from_millis(16));

        assert!((delta - 0.016).abs() < 1e-5);
        assert!((clock.elapsed() - 0.116).abs() < 1e-5);
    }

    #[test]
    fn test_backwards_timestamp_is_zero() {
        let base = Instant::now() + Duration::from_secs(1);
        let mut clock = Clock::new();
        clock.start_at(base);
        assert_eq!(clock.tick_at(base - Duration::from_millis(10)), 0.0);
    }
}
