//! Height-field water simulation.
//!
//! [`WaveField`] solves the damped 2D wave equation
//!
//! ```text
//! ∂²h/∂t² + μ ∂h/∂t = c² (∂²h/∂x² + ∂²h/∂z²)
//! ```
//!
//! on a regular `rows × cols` grid with an explicit finite-difference stencil.
//! Each step computes
//!
//! ```text
//! next[i,j] = k1*prev[i,j] + k2*curr[i,j]
//!           + k3*(curr[i+1,j] + curr[i-1,j] + curr[i,j+1] + curr[i,j-1])
//! ```
//!
//! for every interior cell. The one-cell border is a fixed boundary and stays
//! at height zero forever.
//!
//! # Example
//!
//! ```ignore
//! use tidepool::waves::{WaveConfig, WaveField};
//!
//! let mut field = WaveField::new(WaveConfig::new(64, 64).with_damping(0.4))?;
//! field.disturb(32, 32, 1.5)?;
//!
//! // In the frame loop:
//! field.update(frame_dt);
//! field.write_vertices(&mut vertices);
//! ```

use crate::error::{ensure_non_negative, ensure_positive, SimError};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// Default normal of a flat vertex.
const REST_NORMAL: Vec3 = Vec3::Y;
/// Default x-tangent of a flat vertex.
const REST_TANGENT: Vec3 = Vec3::X;
/// Fraction of the stability limit used when a requested step is too large.
const STABILITY_MARGIN: f32 = 0.99;

/// Construction parameters for a [`WaveField`].
///
/// Defaults describe the demo lake: a 200×200 grid with 0.8 unit spacing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Number of grid rows (along z).
    pub rows: usize,
    /// Number of grid columns (along x).
    pub cols: usize,
    /// Distance between neighbouring grid points in world units.
    pub spatial_step: f32,
    /// Requested simulation step in seconds. Clamped below the stability limit.
    pub time_step: f32,
    /// Wave propagation speed in world units per second.
    pub speed: f32,
    /// Damping coefficient (0 = no energy loss).
    pub damping: f32,
    /// Upper bound on stencil steps executed by a single `update` call.
    pub max_substeps: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            rows: 200,
            cols: 200,
            spatial_step: 0.8,
            time_step: 0.03,
            speed: 3.25,
            damping: 0.4,
            max_substeps: 8,
        }
    }
}

impl WaveConfig {
    /// Default parameters on a grid of the given size.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Default::default()
        }
    }

    /// Set the grid spacing in world units.
    pub fn with_spatial_step(mut self, dx: f32) -> Self {
        self.spatial_step = dx;
        self
    }

    /// Set the requested stencil step in seconds.
    pub fn with_time_step(mut self, dt: f32) -> Self {
        self.time_step = dt;
        self
    }

    /// Set the wave propagation speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the damping coefficient (0 = undamped).
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Set how many stencil steps one `update` may run.
    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.rows < 3 || self.cols < 3 {
            return Err(SimError::config(format!(
                "wave grid must be at least 3x3, got {}x{}",
                self.rows, self.cols
            )));
        }
        ensure_positive("spatial_step", self.spatial_step)?;
        ensure_positive("time_step", self.time_step)?;
        ensure_positive("speed", self.speed)?;
        ensure_non_negative("damping", self.damping)?;
        if self.max_substeps == 0 {
            return Err(SimError::config("max_substeps must be at least 1"));
        }
        Ok(())
    }

    /// Largest stable time step for these parameters.
    pub fn max_stable_time_step(&self) -> f32 {
        max_stable_time_step(self.spatial_step, self.speed, self.damping)
    }
}

/// Stability limit of the damped explicit stencil.
///
/// The scheme is stable while `c < dx / (2 dt) * sqrt(μ dt + 2)`. Solving for
/// `dt` gives `(dx² μ + sqrt(dx⁴ μ² + 32 c² dx²)) / (8 c²)`, which reduces to
/// `dx / (c √2)` without damping.
pub fn max_stable_time_step(spatial_step: f32, speed: f32, damping: f32) -> f32 {
    let dx2 = spatial_step * spatial_step;
    let c2 = speed * speed;
    (dx2 * damping + (dx2 * dx2 * damping * damping + 32.0 * c2 * dx2).sqrt()) / (8.0 * c2)
}

/// GPU-ready vertex for one grid point.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WaveVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent_x: [f32; 3],
}

/// Damped wave equation on a regular height-field grid.
///
/// Topology (rows, columns, spacing) is fixed at construction; only heights,
/// normals and tangents change afterwards. Not internally synchronized: wrap
/// it in a lock (see [`crate::driver::SharedDriver`]) to share across threads.
#[derive(Clone, Debug)]
pub struct WaveField {
    rows: usize,
    cols: usize,
    spatial_step: f32,
    /// Effective step after stability clamping.
    time_step: f32,
    max_stable: f32,
    max_substeps: u32,
    k1: f32,
    k2: f32,
    k3: f32,
    /// Two solutions ping-ponged by `current`; the other one is the previous.
    solutions: [Vec<Vec3>; 2],
    current: usize,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    accumulator: f32,
    total_steps: u64,
}

impl WaveField {
    /// Build a flat field from `config`.
    ///
    /// A `time_step` at or above the stability limit is clamped just below it
    /// and a warning is logged.
    pub fn new(config: WaveConfig) -> Result<Self, SimError> {
        config.validate()?;

        let dx = config.spatial_step;
        let max_stable = config.max_stable_time_step();
        let time_step = if config.time_step >= max_stable {
            let clamped = max_stable * STABILITY_MARGIN;
            warn!(
                "wave time step {:.4}s exceeds stability limit {:.4}s, using {:.4}s",
                config.time_step, max_stable, clamped
            );
            clamped
        } else {
            config.time_step
        };

        let mu = config.damping;
        let d = mu * time_step + 2.0;
        let e = (config.speed * config.speed) * (time_step * time_step) / (dx * dx);
        let k1 = (mu * time_step - 2.0) / d;
        let k2 = (4.0 - 8.0 * e) / d;
        let k3 = (2.0 * e) / d;

        let rest = rest_positions(config.rows, config.cols, dx);
        let count = rest.len();

        debug!(
            "wave field {}x{} (dx {}, dt {:.4}s, stable max {:.4}s, k = [{:.5}, {:.5}, {:.5}])",
            config.rows, config.cols, dx, time_step, max_stable, k1, k2, k3
        );

        Ok(Self {
            rows: config.rows,
            cols: config.cols,
            spatial_step: dx,
            time_step,
            max_stable,
            max_substeps: config.max_substeps,
            k1,
            k2,
            k3,
            solutions: [rest.clone(), rest],
            current: 0,
            normals: vec![REST_NORMAL; count],
            tangents: vec![REST_TANGENT; count],
            accumulator: 0.0,
            total_steps: 0,
        })
    }

    /// Advance the simulation by `dt` seconds of wall time.
    ///
    /// Time accumulates until it covers whole stencil steps; at most
    /// `max_substeps` run per call and any backlog beyond that is dropped.
    /// Negative or non-finite `dt` is ignored. Returns the number of steps run.
    pub fn update(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt < 0.0 {
            debug!("ignoring wave update with dt = {}", dt);
            return 0;
        }

        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= self.time_step && steps < self.max_substeps {
            self.step();
            self.accumulator -= self.time_step;
            steps += 1;
        }

        if self.accumulator >= self.time_step {
            debug!(
                "dropping {:.4}s of wave backlog after {} substeps",
                self.accumulator, steps
            );
            self.accumulator %= self.time_step;
        }

        if steps > 0 {
            self.compute_normals();
            trace!("wave field advanced {} steps (total {})", steps, self.total_steps);
        }
        steps
    }

    /// One stencil step: write `next` over `prev`, then swap roles.
    fn step(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        let (k1, k2, k3) = (self.k1, self.k2, self.k3);

        let [a, b] = &mut self.solutions;
        let (curr, prev) = if self.current == 0 { (&*a, b) } else { (&*b, a) };

        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let idx = i * cols + j;
                let neighbours =
                    curr[idx + cols].y + curr[idx - cols].y + curr[idx + 1].y + curr[idx - 1].y;
                prev[idx].y = k1 * prev[idx].y + k2 * curr[idx].y + k3 * neighbours;
            }
        }

        self.current = 1 - self.current;
        self.total_steps += 1;
    }

    /// Central-difference normals and x-tangents for interior vertices.
    fn compute_normals(&mut self) {
        let cols = self.cols;
        let two_dx = 2.0 * self.spatial_step;
        let curr = &self.solutions[self.current];

        for i in 1..self.rows - 1 {
            for j in 1..cols - 1 {
                let idx = i * cols + j;
                let l = curr[idx - 1].y;
                let r = curr[idx + 1].y;
                let t = curr[idx - cols].y;
                let b = curr[idx + cols].y;

                self.normals[idx] = Vec3::new(l - r, two_dx, b - t).normalize();
                self.tangents[idx] = Vec3::new(two_dx, r - l, 0.0).normalize();
            }
        }
    }

    /// Drop a splash at interior cell `(i, j)`.
    ///
    /// Adds `magnitude` to the cell and half of it to each direct neighbour
    /// that is itself interior; border cells are never touched.
    pub fn disturb(&mut self, i: usize, j: usize, magnitude: f32) -> Result<(), SimError> {
        let (rows, cols) = (self.rows, self.cols);
        let interior = |r: usize, c: usize| r >= 1 && r + 1 < rows && c >= 1 && c + 1 < cols;

        if !interior(i, j) {
            return Err(SimError::OutOfRange {
                row: i,
                col: j,
                rows,
                cols,
            });
        }
        if !magnitude.is_finite() {
            return Err(SimError::config(format!(
                "disturbance magnitude must be finite, got {magnitude}"
            )));
        }

        let half = 0.5 * magnitude;
        let curr = &mut self.solutions[self.current];
        curr[i * cols + j].y += magnitude;
        for (r, c) in [(i - 1, j), (i + 1, j), (i, j - 1), (i, j + 1)] {
            if interior(r, c) {
                curr[r * cols + c].y += half;
            }
        }
        Ok(())
    }

    /// Disturb the grid cell nearest to world position `(x, z)`.
    pub fn disturb_at(&mut self, x: f32, z: f32, magnitude: f32) -> Result<(), SimError> {
        let (row, col) = self.cell_at(x, z);
        self.disturb(row, col, magnitude)
    }

    /// Nearest grid cell to world position `(x, z)`, saturating at zero.
    pub fn cell_at(&self, x: f32, z: f32) -> (usize, usize) {
        let col = ((x + 0.5 * self.width()) / self.spatial_step).round() as usize;
        let row = ((0.5 * self.depth() - z) / self.spatial_step).round() as usize;
        (row, col)
    }

    /// Flatten the surface back to rest, keeping the configuration.
    pub fn reset(&mut self) {
        for solution in &mut self.solutions {
            for p in solution.iter_mut() {
                p.y = 0.0;
            }
        }
        self.normals.fill(REST_NORMAL);
        self.tangents.fill(REST_TANGENT);
        self.accumulator = 0.0;
    }

    /// Write one [`WaveVertex`] per grid point into `out`, replacing its contents.
    pub fn write_vertices(&self, out: &mut Vec<WaveVertex>) {
        out.clear();
        out.extend(
            self.positions()
                .iter()
                .zip(&self.normals)
                .zip(&self.tangents)
                .map(|((p, n), t)| WaveVertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                    tangent_x: t.to_array(),
                }),
        );
    }

    // ========== Accessors ==========

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        (self.rows - 1) * (self.cols - 1) * 2
    }

    /// Extent along x (across columns) in world units.
    #[inline]
    pub fn width(&self) -> f32 {
        (self.cols - 1) as f32 * self.spatial_step
    }

    /// Extent along z (across rows) in world units.
    #[inline]
    pub fn depth(&self) -> f32 {
        (self.rows - 1) as f32 * self.spatial_step
    }

    #[inline]
    pub fn spatial_step(&self) -> f32 {
        self.spatial_step
    }

    /// Effective stencil step in seconds.
    #[inline]
    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    #[inline]
    pub fn max_stable_time_step(&self) -> f32 {
        self.max_stable
    }

    /// Stencil coefficients `(k1, k2, k3)`.
    #[inline]
    pub fn coefficients(&self) -> (f32, f32, f32) {
        (self.k1, self.k2, self.k3)
    }

    /// Total stencil steps taken since construction.
    #[inline]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Whether `(i, j)` is a disturbable interior cell.
    #[inline]
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        i >= 1 && i + 1 < self.rows && j >= 1 && j + 1 < self.cols
    }

    /// Height of cell `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if the cell lies outside the grid.
    #[inline]
    pub fn height(&self, i: usize, j: usize) -> f32 {
        assert!(i < self.rows && j < self.cols, "cell ({i}, {j}) outside grid");
        self.solutions[self.current][i * self.cols + j].y
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec3 {
        self.solutions[self.current][index]
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals[index]
    }

    #[inline]
    pub fn tangent_x(&self, index: usize) -> Vec3 {
        self.tangents[index]
    }

    /// Current positions, row-major.
    pub fn positions(&self) -> &[Vec3] {
        &self.solutions[self.current]
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tangents(&self) -> &[Vec3] {
        &self.tangents
    }

    /// Sum of squared heights, a proxy for the energy left in the surface.
    pub fn energy(&self) -> f64 {
        self.positions()
            .iter()
            .map(|p| (p.y as f64) * (p.y as f64))
            .sum()
    }
}

/// Flat grid centred on the origin; row `i` at `z = halfDepth - i*dx`.
fn rest_positions(rows: usize, cols: usize, dx: f32) -> Vec<Vec3> {
    let half_width = (cols - 1) as f32 * dx * 0.5;
    let half_depth = (rows - 1) as f32 * dx * 0.5;

    let mut positions = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let z = half_depth - i as f32 * dx;
        for j in 0..cols {
            let x = -half_width + j as f32 * dx;
            positions.push(Vec3::new(x, 0.0, z));
        }
    }
    positions
}
