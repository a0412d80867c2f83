//! Boids flocking simulation.
//!
//! Every tick each boid sums four steering contributions computed from the
//! pre-tick state of the whole flock:
//!
//! | Rule | Contribution |
//! |------|--------------|
//! | Cohesion | average position of the others minus own position, × `move_to_center_factor` |
//! | Separation | sum of `own - other` for others closer than `boid_radius + min_distance`, × `avoid_factor` |
//! | Velocity matching | average velocity of the others (optionally only those within `visual_range`) minus own velocity, × `matching_factor` |
//! | Bounds | `∓turn_factor` on each axis where the position is past `±box_edge_length` |
//!
//! The sum is scaled by the frame time and handed to [`Boid::apply`], which
//! clamps the speed and moves the boid by its full velocity.
//!
//! Separation (and range-limited matching) scan every pair, so a tick costs
//! O(n²). That is fine for the few hundred boids a demo shows.
//!
//! # Example
//!
//! ```ignore
//! use tidepool::swarm::{Swarm, SwarmParams, BoidParameter};
//!
//! let mut swarm = Swarm::with_seed(SwarmParams::default(), 42)?;
//! swarm.add_boids(200);
//! swarm.set_parameter(BoidParameter::MaxSpeed, 0.4)?;
//!
//! // In the frame loop:
//! swarm.update(frame_dt);
//! swarm.write_instances(&mut instances);
//! ```

use crate::boid::Boid;
use crate::error::{ensure_non_negative, ensure_positive, SimError};
use crate::spawn::{SpawnContext, SpawnRegion};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Population the demo starts with.
pub const DEFAULT_BOID_COUNT: usize = 200;
/// Boids added per "add" request in the demo UI.
pub const ADD_BATCH: usize = 20;
/// Boids removed per "remove" request in the demo UI.
pub const REMOVE_BATCH: usize = 10;

/// Tunable flocking parameters shared by the whole swarm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    /// Collision radius of a single boid.
    pub boid_radius: f32,
    /// Extra clearance beyond the radius before separation kicks in.
    pub min_distance: f32,
    /// Strength of velocity matching.
    pub matching_factor: f32,
    /// Speed cap in world units per tick.
    pub max_speed: f32,
    /// Strength of separation.
    pub avoid_factor: f32,
    /// Fixed nudge applied per axis when outside the box.
    pub turn_factor: f32,
    /// Neighbour radius for range-limited velocity matching.
    pub visual_range: f32,
    /// Strength of cohesion.
    pub move_to_center_factor: f32,
    /// Half-size of the cube the flock is steered to stay inside.
    pub box_edge_length: f32,
    /// Match velocity only with boids within `visual_range`.
    pub limit_matching_to_visual_range: bool,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            boid_radius: 0.5,
            min_distance: 1.5,
            matching_factor: 0.05,
            max_speed: 0.25,
            avoid_factor: 0.1,
            turn_factor: 0.5,
            visual_range: 8.0,
            move_to_center_factor: 0.01,
            box_edge_length: 20.0,
            limit_matching_to_visual_range: false,
        }
    }
}

impl SwarmParams {
    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), SimError> {
        for param in BoidParameter::ALL {
            param.validate(self.get(param))?;
        }
        Ok(())
    }

    /// Read a parameter by name.
    pub fn get(&self, param: BoidParameter) -> f32 {
        match param {
            BoidParameter::BoidRadius => self.boid_radius,
            BoidParameter::MinDistance => self.min_distance,
            BoidParameter::MatchingFactor => self.matching_factor,
            BoidParameter::MaxSpeed => self.max_speed,
            BoidParameter::AvoidFactor => self.avoid_factor,
            BoidParameter::TurnFactor => self.turn_factor,
            BoidParameter::VisualRange => self.visual_range,
            BoidParameter::MoveToCenterFactor => self.move_to_center_factor,
            BoidParameter::BoxEdgeLength => self.box_edge_length,
        }
    }

    /// Validate and write a parameter by name.
    pub fn set(&mut self, param: BoidParameter, value: f32) -> Result<(), SimError> {
        param.validate(value)?;
        *self.slot(param) = value;
        Ok(())
    }

    fn slot(&mut self, param: BoidParameter) -> &mut f32 {
        match param {
            BoidParameter::BoidRadius => &mut self.boid_radius,
            BoidParameter::MinDistance => &mut self.min_distance,
            BoidParameter::MatchingFactor => &mut self.matching_factor,
            BoidParameter::MaxSpeed => &mut self.max_speed,
            BoidParameter::AvoidFactor => &mut self.avoid_factor,
            BoidParameter::TurnFactor => &mut self.turn_factor,
            BoidParameter::VisualRange => &mut self.visual_range,
            BoidParameter::MoveToCenterFactor => &mut self.move_to_center_factor,
            BoidParameter::BoxEdgeLength => &mut self.box_edge_length,
        }
    }
}

/// Names of the numeric swarm parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoidParameter {
    BoidRadius,
    MinDistance,
    MatchingFactor,
    MaxSpeed,
    AvoidFactor,
    TurnFactor,
    VisualRange,
    MoveToCenterFactor,
    BoxEdgeLength,
}

impl BoidParameter {
    pub const ALL: [BoidParameter; 9] = [
        BoidParameter::BoidRadius,
        BoidParameter::MinDistance,
        BoidParameter::MatchingFactor,
        BoidParameter::MaxSpeed,
        BoidParameter::AvoidFactor,
        BoidParameter::TurnFactor,
        BoidParameter::VisualRange,
        BoidParameter::MoveToCenterFactor,
        BoidParameter::BoxEdgeLength,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BoidParameter::BoidRadius => "boid_radius",
            BoidParameter::MinDistance => "min_distance",
            BoidParameter::MatchingFactor => "matching_factor",
            BoidParameter::MaxSpeed => "max_speed",
            BoidParameter::AvoidFactor => "avoid_factor",
            BoidParameter::TurnFactor => "turn_factor",
            BoidParameter::VisualRange => "visual_range",
            BoidParameter::MoveToCenterFactor => "move_to_center_factor",
            BoidParameter::BoxEdgeLength => "box_edge_length",
        }
    }

    /// Speed cap, box and visual range must be positive; factors may be zero.
    fn validate(&self, value: f32) -> Result<(), SimError> {
        match self {
            BoidParameter::MaxSpeed | BoidParameter::VisualRange | BoidParameter::BoxEdgeLength => {
                ensure_positive(self.name(), value)
            }
            _ => ensure_non_negative(self.name(), value),
        }
    }
}

impl fmt::Display for BoidParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoidParameter {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoidParameter::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| SimError::config(format!("unknown boid parameter '{s}'")))
    }
}

/// GPU-ready per-boid instance data: a column-major world matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BoidInstance {
    pub model: [[f32; 4]; 4],
}

/// Flock-wide sums shared by every boid's steering computation.
struct Totals {
    position: Vec3,
    velocity: Vec3,
}

/// A flock of boids plus the parameters that steer it.
#[derive(Clone, Debug)]
pub struct Swarm {
    boids: Vec<Boid>,
    params: SwarmParams,
    spawn_region: SpawnRegion,
    spawner: SpawnContext,
}

impl Swarm {
    /// Empty swarm whose spawns are seeded from entropy.
    pub fn new(params: SwarmParams) -> Result<Self, SimError> {
        Self::with_spawner(params, SpawnContext::from_entropy())
    }

    /// Empty swarm with reproducible spawns.
    pub fn with_seed(params: SwarmParams, seed: u64) -> Result<Self, SimError> {
        Self::with_spawner(params, SpawnContext::with_seed(seed))
    }

    fn with_spawner(params: SwarmParams, spawner: SpawnContext) -> Result<Self, SimError> {
        params.validate()?;
        debug!("swarm created with {:?}", params);
        Ok(Self {
            boids: Vec::new(),
            params,
            spawn_region: SpawnRegion::default(),
            spawner,
        })
    }

    /// Replace the region new and reset boids are drawn from.
    pub fn with_spawn_region(mut self, region: SpawnRegion) -> Result<Self, SimError> {
        self.set_spawn_region(region)?;
        Ok(self)
    }

    /// Replace the spawn region in place.
    pub fn set_spawn_region(&mut self, region: SpawnRegion) -> Result<(), SimError> {
        region.validate()?;
        self.spawn_region = region;
        Ok(())
    }

    // ========== Population ==========

    /// Append `count` randomly placed boids heading in random directions.
    pub fn add_boids(&mut self, count: usize) {
        self.boids.reserve(count);
        for _ in 0..count {
            let (position, velocity) = self.random_state();
            self.boids
                .push(Boid::new(position, velocity, self.params.max_speed));
        }
        debug!("added {} boids, swarm size {}", count, self.boids.len());
    }

    /// Append a specific boid.
    pub fn push_boid(&mut self, boid: Boid) {
        self.boids.push(boid);
    }

    /// Remove up to `count` boids from the end. Removing more than exist
    /// empties the swarm.
    pub fn remove_boids(&mut self, count: usize) {
        let keep = self.boids.len().saturating_sub(count);
        self.boids.truncate(keep);
        debug!("removed boids, swarm size {}", self.boids.len());
    }

    pub fn clear(&mut self) {
        self.boids.clear();
    }

    /// Re-randomize every boid's position and velocity in place.
    pub fn reset_boids(&mut self) {
        for i in 0..self.boids.len() {
            let (position, velocity) = self.random_state();
            self.boids[i].respawn(position, velocity);
        }
    }

    fn random_state(&mut self) -> (Vec3, Vec3) {
        let position = self.spawner.random_in_region(&self.spawn_region);
        let velocity = self.spawner.random_direction() * self.params.max_speed;
        (position, velocity)
    }

    // ========== Simulation ==========

    /// Advance the flock by one tick of `time_delta` seconds.
    ///
    /// Steering for every boid is computed from the pre-tick state before
    /// any boid moves. Negative or non-finite `time_delta` is ignored.
    pub fn update(&mut self, time_delta: f32) {
        if !time_delta.is_finite() || time_delta < 0.0 {
            debug!("ignoring swarm update with dt = {}", time_delta);
            return;
        }
        if self.boids.is_empty() {
            return;
        }

        let deltas = self.steering(time_delta);
        for (boid, delta) in self.boids.iter_mut().zip(deltas) {
            boid.apply(delta);
        }
        trace!("swarm of {} advanced by {:.4}s", self.boids.len(), time_delta);
    }

    /// Velocity change for every boid, in order.
    fn steering(&self, time_delta: f32) -> Vec<Vec3> {
        let boids = &self.boids;
        let params = &self.params;
        let totals = Totals {
            position: boids.iter().map(Boid::position).sum(),
            velocity: boids.iter().map(Boid::velocity).sum(),
        };

        #[cfg(feature = "parallel")]
        let deltas = (0..boids.len())
            .into_par_iter()
            .map(|i| steer(i, boids, &totals, params) * time_delta)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let deltas = (0..boids.len())
            .map(|i| steer(i, boids, &totals, params) * time_delta)
            .collect();

        deltas
    }

    // ========== Parameters ==========

    pub fn params(&self) -> &SwarmParams {
        &self.params
    }

    pub fn parameter(&self, param: BoidParameter) -> f32 {
        self.params.get(param)
    }

    /// Update one parameter. A new max speed is pushed to every boid.
    pub fn set_parameter(&mut self, param: BoidParameter, value: f32) -> Result<(), SimError> {
        self.params.set(param, value)?;
        if param == BoidParameter::MaxSpeed {
            self.propagate_max_speed();
        }
        debug!("swarm parameter {} = {}", param, value);
        Ok(())
    }

    /// Replace all parameters at once.
    pub fn set_params(&mut self, params: SwarmParams) -> Result<(), SimError> {
        params.validate()?;
        self.params = params;
        self.propagate_max_speed();
        Ok(())
    }

    fn propagate_max_speed(&mut self) {
        let max_speed = self.params.max_speed;
        for boid in &mut self.boids {
            boid.set_max_speed(max_speed);
        }
    }

    /// Set the speed cap and push it to every boid.
    pub fn set_max_speed(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::MaxSpeed, value)
    }

    /// Set the clearance beyond the boid radius that triggers separation.
    pub fn set_min_distance(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::MinDistance, value)
    }

    /// Set the velocity-matching strength.
    pub fn set_matching_factor(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::MatchingFactor, value)
    }

    /// Set the separation strength.
    pub fn set_avoid_factor(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::AvoidFactor, value)
    }

    /// Set the per-axis nudge applied outside the box.
    pub fn set_turn_factor(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::TurnFactor, value)
    }

    /// Set the neighbour radius for range-limited matching.
    pub fn set_visual_range(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::VisualRange, value)
    }

    /// Set the cohesion strength.
    pub fn set_move_to_center_factor(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::MoveToCenterFactor, value)
    }

    /// Set the half-size of the steering box.
    pub fn set_box_edge_length(&mut self, value: f32) -> Result<(), SimError> {
        self.set_parameter(BoidParameter::BoxEdgeLength, value)
    }

    /// Match velocity only with boids inside the visual range.
    pub fn set_limit_matching_to_visual_range(&mut self, limit: bool) {
        self.params.limit_matching_to_visual_range = limit;
    }

    // ========== Output ==========

    #[inline]
    pub fn len(&self) -> usize {
        self.boids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn boid_mut(&mut self, index: usize) -> Option<&mut Boid> {
        self.boids.get_mut(index)
    }

    /// One world transform per boid, in population order.
    pub fn transforms(&self) -> impl Iterator<Item = Mat4> + '_ {
        self.boids.iter().map(Boid::transform)
    }

    /// Write one [`BoidInstance`] per boid into `out`, replacing its contents.
    pub fn write_instances(&self, out: &mut Vec<BoidInstance>) {
        out.clear();
        out.extend(self.transforms().map(|m| BoidInstance {
            model: m.to_cols_array_2d(),
        }));
    }

    /// Mean position of the flock, if it has any boids.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.boids.is_empty() {
            return None;
        }
        let sum: Vec3 = self.boids.iter().map(Boid::position).sum();
        Some(sum / self.boids.len() as f32)
    }

    pub fn average_speed(&self) -> f32 {
        if self.boids.is_empty() {
            return 0.0;
        }
        self.boids.iter().map(Boid::speed).sum::<f32>() / self.boids.len() as f32
    }
}

/// Unscaled steering for boid `index` against the whole flock.
fn steer(index: usize, boids: &[Boid], totals: &Totals, params: &SwarmParams) -> Vec3 {
    let me = &boids[index];
    let others = (boids.len() - 1) as f32;

    let cohesion = if others > 0.0 {
        ((totals.position - me.position()) / others - me.position()) * params.move_to_center_factor
    } else {
        Vec3::ZERO
    };

    let reach = params.boid_radius + params.min_distance;
    let reach_sq = reach * reach;
    let range_sq = params.visual_range * params.visual_range;

    let mut separation = Vec3::ZERO;
    let mut seen_velocity = Vec3::ZERO;
    let mut seen = 0usize;
    for (j, other) in boids.iter().enumerate() {
        if j == index {
            continue;
        }
        let offset = other.position() - me.position();
        let dist_sq = offset.length_squared();
        if dist_sq < reach_sq {
            separation -= offset;
        }
        if params.limit_matching_to_visual_range && dist_sq < range_sq {
            seen_velocity += other.velocity();
            seen += 1;
        }
    }

    let average_velocity = if params.limit_matching_to_visual_range {
        (seen > 0).then(|| seen_velocity / seen as f32)
    } else {
        (others > 0.0).then(|| (totals.velocity - me.velocity()) / others)
    };
    let matching = average_velocity
        .map(|v| (v - me.velocity()) * params.matching_factor)
        .unwrap_or(Vec3::ZERO);

    let bounds = bounds_nudge(me.position(), params.box_edge_length, params.turn_factor);

    cohesion + separation * params.avoid_factor + matching + bounds
}

/// Fixed per-axis push back toward the box, independent of overshoot.
fn bounds_nudge(position: Vec3, edge: f32, turn: f32) -> Vec3 {
    let axis = |p: f32| {
        if p > edge {
            -turn
        } else if p < -edge {
            turn
        } else {
            0.0
        }
    };
    Vec3::new(axis(position.x), axis(position.y), axis(position.z))
}
