//! Scene files for the runner.
//!
//! A scene bundles every simulator config plus the run length into one JSON
//! document. Every field has a default, so a scene file only needs the values
//! it changes:
//!
//! ```json
//! {
//!   "name": "calm",
//!   "seed": 7,
//!   "wave": { "damping": 0.8 },
//!   "run": { "ticks": 1200 }
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tidepool::{
    BoidParameter, DisturbanceConfig, SimError, SimulationBuilder, SimulationDriver, SpawnRegion,
    SwarmParams, WaveConfig,
};

/// How long to run a scene and how often to report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to simulate.
    pub ticks: u64,
    /// Seconds per frame.
    pub dt: f32,
    /// Log a report every this many frames. Zero disables periodic reports.
    pub report_every: u64,
    /// Boids spawned before the first frame.
    pub boid_count: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            dt: 1.0 / 60.0,
            report_every: 60,
            boid_count: tidepool::swarm::DEFAULT_BOID_COUNT,
        }
    }
}

/// Complete scene configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub name: String,
    /// Seed for spawning and splashes. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub wave: WaveConfig,
    pub swarm: SwarmParams,
    pub spawn_region: SpawnRegion,
    pub disturbances: DisturbanceConfig,
    pub run: RunConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            seed: Some(42),
            wave: WaveConfig::default(),
            swarm: SwarmParams::default(),
            spawn_region: SpawnRegion::default(),
            disturbances: DisturbanceConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Save the scene as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("failed to write scene {}", path.display()))
    }

    /// Load a scene from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("scene {} is not a valid scene file", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse scene JSON")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to format scene JSON")
    }

    /// Check the run settings and every simulator config.
    pub fn validate(&self) -> Result<()> {
        if !(self.run.dt.is_finite() && self.run.dt >= 0.0) {
            bail!("run.dt must be a non-negative number, got {}", self.run.dt);
        }
        self.wave.validate()?;
        self.swarm.validate()?;
        self.spawn_region.validate()?;
        self.disturbances.validate()?;
        Ok(())
    }

    /// Apply a `name=value` swarm parameter override.
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got '{assignment}'"))?;
        let param: BoidParameter = name.trim().parse()?;
        let value: f32 = value
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a number", value.trim()))?;
        self.swarm.set(param, value)?;
        Ok(())
    }

    pub fn builder(&self) -> SimulationBuilder {
        let builder = SimulationBuilder::new()
            .with_wave(self.wave)
            .with_swarm(self.swarm)
            .with_spawn_region(self.spawn_region)
            .with_disturbances(self.disturbances)
            .with_boid_count(self.run.boid_count)
            .with_fixed_delta(Some(self.run.dt));
        match self.seed {
            Some(seed) => builder.with_seed(seed),
            None => builder,
        }
    }

    pub fn build(&self) -> Result<SimulationDriver, SimError> {
        self.builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let scene = SceneConfig::from_json("{}").unwrap();
        assert_eq!(scene, SceneConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let scene = SceneConfig::from_json(
            r#"{
                "name": "calm",
                "seed": 7,
                "wave": { "damping": 0.8, "rows": 64 },
                "swarm": { "max_speed": 0.4 },
                "run": { "ticks": 120 }
            }"#,
        )
        .unwrap();

        assert_eq!(scene.name, "calm");
        assert_eq!(scene.seed, Some(7));
        assert_eq!(scene.wave.damping, 0.8);
        assert_eq!(scene.wave.rows, 64);
        assert_eq!(scene.wave.cols, WaveConfig::default().cols);
        assert_eq!(scene.swarm.max_speed, 0.4);
        assert_eq!(scene.swarm.avoid_factor, SwarmParams::default().avoid_factor);
        assert_eq!(scene.run.ticks, 120);
        assert_eq!(scene.run.report_every, RunConfig::default().report_every);
        assert_eq!(scene.disturbances, DisturbanceConfig::default());
    }

    #[test]
    fn test_null_seed_means_entropy() {
        let scene = SceneConfig::from_json(r#"{ "seed": null }"#).unwrap();
        assert_eq!(scene.seed, None);
    }

    #[test]
    fn test_json_text_survives_save_format() {
        let mut scene = SceneConfig::default();
        scene.name = "storm".into();
        scene.wave.damping = 0.1;
        let parsed = SceneConfig::from_json(&scene.to_json().unwrap()).unwrap();
        assert_eq!(parsed, scene);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(SceneConfig::from_json("{ \"wave\": 3 }").is_err());
        assert!(SceneConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_validate_catches_bad_sections() {
        let mut scene = SceneConfig::default();
        assert!(scene.validate().is_ok());

        scene.wave.rows = 2;
        assert!(scene.validate().is_err());

        let mut scene = SceneConfig::default();
        scene.run.dt = f32::NAN;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_apply_override() {
        let mut scene = SceneConfig::default();
        scene.apply_override("max_speed=0.6").unwrap();
        scene.apply_override(" avoid_factor = 0.3 ").unwrap();
        assert_eq!(scene.swarm.max_speed, 0.6);
        assert_eq!(scene.swarm.avoid_factor, 0.3);

        assert!(scene.apply_override("max_speed").is_err());
        assert!(scene.apply_override("warp_factor=9").is_err());
        assert!(scene.apply_override("max_speed=fast").is_err());
        assert!(scene.apply_override("max_speed=-1").is_err());
        assert_eq!(scene.swarm.max_speed, 0.6);
    }

    #[test]
    fn test_build_uses_scene_values() {
        let mut scene = SceneConfig::default();
        scene.wave = WaveConfig::new(16, 20);
        scene.run.boid_count = 9;
        let driver = scene.build().unwrap();
        assert_eq!(driver.waves().rows(), 16);
        assert_eq!(driver.waves().cols(), 20);
        assert_eq!(driver.swarm().len(), 9);
    }
}
