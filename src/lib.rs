//! # tidepool
//!
//! CPU simulation core for real-time water and flocking demos.
//!
//! tidepool owns the numerical half of a demo scene and hands the renderer
//! plain arrays each frame. It contains two independent simulators:
//!
//! - [`WaveField`]: a damped 2D wave equation on a regular height-field grid,
//!   advanced with an explicit finite-difference stencil. Produces per-vertex
//!   positions, normals and tangents.
//! - [`Swarm`]: a boids flock steered by cohesion, separation, velocity
//!   matching and bounds avoidance. Produces one world transform per boid.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tidepool::prelude::*;
//!
//! let mut driver = SimulationBuilder::new()
//!     .with_wave(WaveConfig::new(128, 128).with_damping(0.4))
//!     .with_swarm(SwarmParams::default())
//!     .with_boid_count(200)
//!     .with_seed(7)
//!     .build()?;
//!
//! let mut vertices = Vec::new();
//! let mut instances = Vec::new();
//! loop {
//!     driver.step()?;
//!     driver.waves().write_vertices(&mut vertices);
//!     driver.swarm().write_instances(&mut instances);
//!     // upload `vertices` and `instances` to the GPU
//! }
//! ```
//!
//! ## Determinism
//!
//! `update` never draws random numbers and always reads pre-tick state, so
//! identical state, parameters and update sequences give identical output.
//! Randomness is confined to spawning boids and scheduling splashes, both of
//! which can be seeded.
//!
//! ## Threading
//!
//! Neither simulator synchronizes internally. Share a driver through
//! [`SharedDriver`] and let [`RenderLoop`] take the lock once per frame. The
//! `parallel` feature spreads the O(n²) swarm update over rayon's pool
//! without changing results.
//!
//! ## Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`waves`] | [`WaveField`], [`WaveConfig`], [`WaveVertex`] |
//! | [`swarm`] | [`Swarm`], [`SwarmParams`], [`BoidParameter`], [`BoidInstance`] |
//! | [`boid`] | [`Boid`] |
//! | [`disturb`] | [`DisturbanceScheduler`] for periodic random splashes |
//! | [`spawn`] | [`SpawnContext`], [`SpawnRegion`] |
//! | [`time`] | [`Time`] frame clock |
//! | [`driver`] | [`SimulationDriver`], [`SimulationBuilder`], [`RenderLoop`] |

pub mod boid;
pub mod disturb;
pub mod driver;
mod error;
pub mod spawn;
pub mod swarm;
pub mod time;
pub mod waves;

pub use boid::Boid;
pub use bytemuck;
pub use disturb::{DisturbanceConfig, DisturbanceScheduler, Splash};
pub use driver::{RenderLoop, SharedDriver, SimulationBuilder, SimulationDriver, TickReport};
pub use error::SimError;
pub use glam::{Mat4, Vec3};
pub use spawn::{SpawnContext, SpawnRegion};
pub use swarm::{BoidInstance, BoidParameter, Swarm, SwarmParams};
pub use time::Time;
pub use waves::{WaveConfig, WaveField, WaveVertex};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use tidepool::prelude::*;
/// ```
pub mod prelude {
    pub use crate::boid::Boid;
    pub use crate::disturb::{DisturbanceConfig, DisturbanceScheduler};
    pub use crate::driver::{RenderLoop, SharedDriver, SimulationBuilder, SimulationDriver};
    pub use crate::error::SimError;
    pub use crate::spawn::SpawnRegion;
    pub use crate::swarm::{BoidParameter, Swarm, SwarmParams};
    pub use crate::time::Time;
    pub use crate::waves::{WaveConfig, WaveField};
    pub use crate::{Mat4, Vec3};
}
