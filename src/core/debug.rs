//! Debug and statistics module

use std::collections::VecDeque;

use super::timestep::FrameStep;

/// Frame and tick statistics tracker
#[derive(Debug)]
pub struct FrameStats {
    /// Frame time history in seconds
    frame_times: VecDeque<f32>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Current FPS
    fps: f32,
    /// Average frame time in milliseconds
    avg_frame_time_ms: f32,
    /// Maximum frame time in milliseconds
    max_frame_time_ms: f32,
    /// Total frames processed
    total_frames: u64,
    /// Total frames that rendered
    total_renders: u64,
    /// Total physics ticks
    total_steps: u64,
    /// Physics ticks taken by the last frame
    last_steps: u32,
}

impl FrameStats {
    /// Create a new frame stats tracker
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
            total_renders: 0,
            total_steps: 0,
            last_steps: 0,
        }
    }

    /// Record a frame with its delta and what it ran
    pub fn record_frame(&mut self, delta: f32, step: &FrameStep) {
        self.total_frames += 1;
        self.total_steps += u64::from(step.physics_steps);
        self.last_steps = step.physics_steps;
        if step.render.is_some() {
            self.total_renders += 1;
        }

        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total: f32 = self.frame_times.iter().sum();
        let max = self.frame_times.iter().copied().fold(0.0, f32::max);
        let count = self.frame_times.len() as f32;

        // Guard against division by zero
        if total > 0.0 {
            self.avg_frame_time_ms = (total / count) * 1000.0;
            self.fps = count / total;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }
        self.max_frame_time_ms = max * 1000.0;
    }

    /// Get current FPS
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get average frame time in milliseconds
    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    /// Get maximum frame time in milliseconds
    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    /// Get total frames processed
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Get total frames that rendered
    pub fn total_renders(&self) -> u64 {
        self.total_renders
    }

    /// Get total physics ticks
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (max: {:.2}) | Steps: {} (last frame {})",
            self.fps, self.avg_frame_time_ms, self.max_frame_time_ms, self.total_steps, self.last_steps
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug overlay information
#[derive(Debug, Default)]
pub struct DebugInfo {
    /// Whether debug output is enabled
    pub enabled: bool,
    /// Frame statistics
    pub frame_stats: FrameStats,
    /// Custom debug lines
    custom_lines: Vec<String>,
}

impl DebugInfo {
    /// Create new debug info
    pub fn new() -> Self {
        Self {
            enabled: false,
            frame_stats: FrameStats::new(),
            custom_lines: Vec::new(),
        }
    }

    /// Toggle debug output
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Add a custom debug line
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.custom_lines.push(line.into());
    }

    /// Clear custom lines
    pub fn clear_lines(&mut self) {
        self.custom_lines.clear();
    }

    /// Get all debug lines
    pub fn get_all_lines(&self) -> Vec<String> {
        let mut lines = vec![self.frame_stats.format_stats()];
        lines.extend(self.custom_lines.iter().cloned());
        lines
    }

    /// Record a frame
    pub fn record_frame(&mut self, delta: f32, step: &FrameStep) {
        self.frame_stats.record_frame(delta, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(physics_steps: u32, render: bool) -> FrameStep {
        FrameStep {
            physics_steps,
            alpha: 0.0,
            render: render.then_some(0.016),
        }
    }

    #[test]
    fn test_frame_stats_counts() {
        let mut stats = FrameStats::new();
        stats.record_frame(0.02, &step(1, true));
        stats.record_frame(0.02, &step(0, false));
        stats.record_frame(0.02, &step(2, true));

        assert_eq!(stats.total_frames(), 3);
        assert_eq!(stats.total_renders(), 2);
        assert_eq!(stats.total_steps(), 3);
        assert!((stats.fps() - 50.0).abs() < 0.1);
        assert!((stats.avg_frame_time_ms() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_deltas_do_not_divide() {
        let mut stats = FrameStats::new();
        stats.record_frame(0.0, &step(0, true));
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.max_frame_time_ms(), 0.0);
    }

    #[test]
    fn test_debug_lines() {
        let mut debug = DebugInfo::new();
        debug.toggle();
        debug.add_line("player: (0, 0, 1)");

        let lines = debug.get_all_lines();
        assert!(debug.enabled);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("FPS"));

        debug.clear_lines();
        assert_eq!(debug.get_all_lines().len(), 1);
    }
}
