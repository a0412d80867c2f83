//! Frame clock for driving the simulators.
//!
//! [`Time`] can be fed from the wall clock with [`Time::update`] or stepped
//! by hand with [`Time::advance`]. Both paths honour pause, time scale and an
//! optional fixed delta, so a render loop and a deterministic test share the
//! same bookkeeping.
//!
//! ```ignore
//! let mut time = Time::new();
//! time.set_fixed_delta(Some(1.0 / 60.0));
//!
//! loop {
//!     let dt = time.update();
//!     field.update(dt);
//!     swarm.update(dt);
//! }
//! ```

use std::time::{Duration, Instant};

/// How often the FPS estimate is refreshed.
const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Elapsed time, frame delta and frame rate for a simulation loop.
#[derive(Debug, Clone)]
pub struct Time {
    last_tick: Instant,
    /// Scaled simulation seconds since start, excluding pauses.
    sim_elapsed: f64,
    last_delta: f32,
    frames: u64,
    fps: f32,
    fps_frames: u64,
    fps_window_start: Instant,
    paused: bool,
    fixed_delta: Option<f32>,
    time_scale: f32,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            sim_elapsed: 0.0,
            last_delta: 0.0,
            frames: 0,
            fps: 0.0,
            fps_frames: 0,
            fps_window_start: now,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Measure the wall time since the previous frame and record a frame.
    ///
    /// Returns the simulation delta in seconds (zero while paused).
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let fps_elapsed = now.duration_since(self.fps_window_start);
        if fps_elapsed >= FPS_WINDOW {
            let frames = self.frames + 1 - self.fps_frames;
            self.fps = frames as f32 / fps_elapsed.as_secs_f32();
            self.fps_frames = self.frames + 1;
            self.fps_window_start = now;
        }

        self.advance(raw)
    }

    /// Record a frame that took `raw_delta` seconds without reading the clock.
    ///
    /// Returns the simulation delta in seconds (zero while paused).
    pub fn advance(&mut self, raw_delta: f32) -> f32 {
        self.frames += 1;
        if self.paused {
            self.last_delta = 0.0;
            return 0.0;
        }
        let raw_delta = if raw_delta.is_finite() { raw_delta.max(0.0) } else { 0.0 };
        self.last_delta = self.fixed_delta.unwrap_or(raw_delta) * self.time_scale;
        self.sim_elapsed += self.last_delta as f64;
        self.last_delta
    }

    /// Scaled simulation seconds since start, excluding pauses.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.sim_elapsed
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.last_delta
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frames
    }

    /// Frames per second over the last measurement window (wall-clock updates only).
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            // Do not count the paused interval as one long frame.
            self.last_tick = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Use a constant delta instead of the measured one. `None` restores
    /// measured timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Multiplier on every delta. Negative values clamp to zero.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn reset(&mut self) {
        let fixed_delta = self.fixed_delta;
        let time_scale = self.time_scale;
        *self = Self::new();
        self.fixed_delta = fixed_delta;
        self.time_scale = time_scale;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_advance_accumulates() {
        let mut time = Time::new();
        assert_eq!(time.advance(0.25), 0.25);
        assert_eq!(time.advance(0.5), 0.5);
        assert_eq!(time.frame(), 2);
        assert!((time.elapsed() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_wall_clock_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(5));
        assert!(time.update() > 0.0);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut time = Time::new();
        time.advance(1.0);
        time.pause();
        assert_eq!(time.advance(1.0), 0.0);
        assert_eq!(time.elapsed(), 1.0);
        time.toggle_pause();
        assert!(!time.is_paused());
        assert_eq!(time.advance(1.0), 1.0);
    }

    #[test]
    fn test_fixed_delta_and_scale() {
        let mut time = Time::new();
        time.set_fixed_delta(Some(0.5));
        time.set_time_scale(2.0);
        assert_eq!(time.advance(0.001), 1.0);

        time.set_time_scale(-3.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_bad_raw_delta_is_zero() {
        let mut time = Time::new();
        assert_eq!(time.advance(-1.0), 0.0);
        assert_eq!(time.advance(f32::NAN), 0.0);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut time = Time::new();
        time.set_fixed_delta(Some(0.1));
        time.advance(0.0);
        time.reset();
        assert_eq!(time.frame(), 0);
        assert!((time.advance(3.0) - 0.1).abs() < 1e-7);
    }
}
