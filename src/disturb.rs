//! Periodic random splashes on a [`WaveField`].
//!
//! The scheduler owns its own clock, so the splash cadence is explicit state
//! that can be configured, paused and tested.

use crate::error::{ensure_positive, SimError};
use crate::spawn::SpawnContext;
use crate::waves::WaveField;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Shortest accepted splash interval in seconds.
pub const MIN_INTERVAL: f32 = 1.0e-3;

/// Cadence and size of automatic splashes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceConfig {
    /// Seconds between splashes.
    pub interval: f32,
    /// Smallest splash magnitude (inclusive).
    pub min_magnitude: f32,
    /// Largest splash magnitude (exclusive).
    pub max_magnitude: f32,
    /// Cells kept clear along each edge of the grid.
    pub margin: usize,
    /// Upper bound on splashes dropped by a single `tick`.
    pub max_splashes_per_tick: u32,
    /// Whether `tick` drops splashes at all.
    pub enabled: bool,
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self {
            interval: 0.25,
            min_magnitude: 1.0,
            max_magnitude: 2.0,
            margin: 5,
            max_splashes_per_tick: 4,
            enabled: true,
        }
    }
}

impl DisturbanceConfig {
    /// Default cadence with splashing switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        ensure_positive("interval", self.interval)?;
        if self.interval < MIN_INTERVAL {
            return Err(SimError::config(format!(
                "splash interval must be at least {MIN_INTERVAL}s, got {}",
                self.interval
            )));
        }
        if self.max_splashes_per_tick == 0 {
            return Err(SimError::config("max_splashes_per_tick must be at least 1"));
        }
        let finite = self.min_magnitude.is_finite() && self.max_magnitude.is_finite();
        if !finite || self.min_magnitude > self.max_magnitude {
            return Err(SimError::config(format!(
                "splash magnitude range [{}, {}) is invalid",
                self.min_magnitude, self.max_magnitude
            )));
        }
        Ok(())
    }
}

/// A splash that was applied to the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splash {
    pub row: usize,
    pub col: usize,
    pub magnitude: f32,
}

/// Drops a random splash on a wave field every `interval` seconds.
#[derive(Clone, Debug)]
pub struct DisturbanceScheduler {
    config: DisturbanceConfig,
    elapsed: f32,
    rng: SpawnContext,
}

impl DisturbanceScheduler {
    pub fn new(config: DisturbanceConfig) -> Result<Self, SimError> {
        Self::with_rng(config, SpawnContext::from_entropy())
    }

    pub fn with_seed(config: DisturbanceConfig, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(config, SpawnContext::with_seed(seed))
    }

    fn with_rng(config: DisturbanceConfig, rng: SpawnContext) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            elapsed: 0.0,
            rng,
        })
    }

    pub fn config(&self) -> &DisturbanceConfig {
        &self.config
    }

    /// Switch splashing on or off, restarting the interval clock.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        self.elapsed = 0.0;
    }

    /// Advance the clock by `dt` and splash `field` once per elapsed interval.
    ///
    /// At most `max_splashes_per_tick` splashes land per call; any backlog
    /// beyond that is dropped.
    pub fn tick(&mut self, dt: f32, field: &mut WaveField) -> Result<Vec<Splash>, SimError> {
        let mut splashes = Vec::new();
        if !self.config.enabled || !dt.is_finite() || dt <= 0.0 {
            return Ok(splashes);
        }

        self.elapsed += dt;
        let cap = self.config.max_splashes_per_tick as usize;
        while self.elapsed >= self.config.interval && splashes.len() < cap {
            self.elapsed -= self.config.interval;
            let splash = self.pick(field);
            field.disturb(splash.row, splash.col, splash.magnitude)?;
            trace!(
                "splash at ({}, {}) magnitude {:.3}",
                splash.row,
                splash.col,
                splash.magnitude
            );
            splashes.push(splash);
        }

        if self.elapsed >= self.config.interval {
            debug!(
                "dropping {:.3}s of splash backlog after {} splashes",
                self.elapsed,
                splashes.len()
            );
            self.elapsed %= self.config.interval;
        }
        Ok(splashes)
    }

    /// Random interior cell away from the edges, and a random magnitude.
    fn pick(&mut self, field: &WaveField) -> Splash {
        let (rows, cols) = (field.rows(), field.cols());
        let margin = self.config.margin.max(1);

        let (row_lo, row_hi) = span(margin, rows);
        let (col_lo, col_hi) = span(margin, cols);

        Splash {
            row: self.rng.random_index(row_lo, row_hi),
            col: self.rng.random_index(col_lo, col_hi),
            magnitude: self
                .rng
                .random_range(self.config.min_magnitude, self.config.max_magnitude),
        }
    }
}

/// Index range `[margin, len - margin)`, widened to the interior
/// `[1, len - 1)` when the grid is too small for the margin.
fn span(margin: usize, len: usize) -> (usize, usize) {
    if len > 2 * margin {
        (margin, len - margin)
    } else {
        (1, len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waves::WaveConfig;

    fn field(size: usize) -> WaveField {
        WaveField::new(WaveConfig::new(size, size)).unwrap()
    }

    #[test]
    fn test_one_splash_per_interval() {
        let mut field = field(32);
        let mut scheduler = DisturbanceScheduler::with_seed(DisturbanceConfig::default(), 11).unwrap();

        assert!(scheduler.tick(0.1, &mut field).unwrap().is_empty());
        assert!(scheduler.tick(0.1, &mut field).unwrap().is_empty());
        assert_eq!(scheduler.tick(0.1, &mut field).unwrap().len(), 1);
        assert_eq!(scheduler.tick(1.0, &mut field).unwrap().len(), 4);
    }

    #[test]
    fn test_splashes_respect_margin_and_range() {
        let mut field = field(32);
        let mut scheduler = DisturbanceScheduler::with_seed(DisturbanceConfig::default(), 12).unwrap();
        let splashes: Vec<Splash> = (0..100)
            .flat_map(|_| scheduler.tick(0.25, &mut field).unwrap())
            .collect();
        assert_eq!(splashes.len(), 100);
        for s in splashes {
            assert!((5..27).contains(&s.row));
            assert!((5..27).contains(&s.col));
            assert!((1.0..2.0).contains(&s.magnitude));
        }
        assert!(field.energy() > 0.0);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut field = field(32);
        let mut scheduler = DisturbanceScheduler::with_seed(DisturbanceConfig::default(), 15).unwrap();

        let splashes = scheduler.tick(3600.0, &mut field).unwrap();
        assert_eq!(splashes.len(), 4);
        // The backlog is gone, so the next short frame stays quiet.
        assert!(scheduler.tick(0.1, &mut field).unwrap().is_empty());
        assert_eq!(scheduler.tick(0.2, &mut field).unwrap().len(), 1);
    }

    #[test]
    fn test_single_splash_cap() {
        let mut field = field(32);
        let config = DisturbanceConfig {
            max_splashes_per_tick: 1,
            ..Default::default()
        };
        let mut scheduler = DisturbanceScheduler::with_seed(config, 16).unwrap();
        assert_eq!(scheduler.tick(1.0, &mut field).unwrap().len(), 1);
        assert_eq!(scheduler.tick(f32::MAX, &mut field).unwrap().len(), 1);
    }

    #[test]
    fn test_small_grid_falls_back_to_interior() {
        let mut field = field(3);
        let mut scheduler = DisturbanceScheduler::with_seed(DisturbanceConfig::default(), 13).unwrap();
        let splashes = scheduler.tick(1.0, &mut field).unwrap();
        assert!(splashes.iter().all(|s| s.row == 1 && s.col == 1));
    }

    #[test]
    fn test_disabled_scheduler_is_silent() {
        let mut field = field(16);
        let mut scheduler = DisturbanceScheduler::with_seed(DisturbanceConfig::disabled(), 14).unwrap();
        assert!(scheduler.tick(10.0, &mut field).unwrap().is_empty());
        assert_eq!(field.energy(), 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = DisturbanceConfig {
            interval: 0.0,
            ..Default::default()
        };
        assert!(DisturbanceScheduler::new(config).is_err());

        let config = DisturbanceConfig {
            min_magnitude: 3.0,
            max_magnitude: 1.0,
            ..Default::default()
        };
        assert!(DisturbanceScheduler::new(config).is_err());

        let config = DisturbanceConfig {
            interval: 1.0e-10,
            ..Default::default()
        };
        assert!(DisturbanceScheduler::new(config).is_err());

        let config = DisturbanceConfig {
            max_splashes_per_tick: 0,
            ..Default::default()
        };
        assert!(DisturbanceScheduler::new(config).is_err());

        let config = DisturbanceConfig {
            interval: MIN_INTERVAL,
            ..Default::default()
        };
        assert!(DisturbanceScheduler::new(config).is_ok());
    }
}
