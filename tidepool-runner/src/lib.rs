//! Headless runner for tidepool scenes.
//!
//! Loads a [`SceneConfig`] from JSON, builds the simulation it describes and
//! ticks it for a fixed number of frames, logging progress along the way.

pub mod config;
pub mod run;

pub use config::{RunConfig, SceneConfig};
pub use run::{run_driver, run_scene, RunSummary};
