//! Simulation driver and background frame loop.
//!
//! [`SimulationDriver`] bundles a wave field, a swarm, the splash scheduler
//! and a clock, and advances all of them once per frame. [`RenderLoop`] runs
//! that on a dedicated thread, taking the driver's lock once per frame so a
//! renderer can read consistent buffers from the frame callback.
//!
//! ```ignore
//! let driver = SimulationBuilder::new()
//!     .with_wave(WaveConfig::default())
//!     .with_boid_count(200)
//!     .with_seed(42)
//!     .build()?;
//!
//! let shared = driver.into_shared();
//! let frames = RenderLoop::spawn(shared.clone(), Duration::from_millis(16), |sim, _report| {
//!     sim.waves().write_vertices(&mut vertex_staging);
//! });
//! // ...
//! frames.stop()?;
//! ```

use crate::disturb::{DisturbanceConfig, DisturbanceScheduler};
use crate::error::SimError;
use crate::spawn::SpawnRegion;
use crate::swarm::{Swarm, SwarmParams, DEFAULT_BOID_COUNT};
use crate::time::Time;
use crate::waves::{WaveConfig, WaveField};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Driver shared between a frame loop and its owner.
pub type SharedDriver = Arc<Mutex<SimulationDriver>>;

/// Lock a shared driver, mapping poisoning to [`SimError::Poisoned`].
pub fn lock(shared: &SharedDriver) -> Result<MutexGuard<'_, SimulationDriver>, SimError> {
    shared.lock().map_err(|_| SimError::Poisoned)
}

/// What one frame did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// Frame number after this tick.
    pub frame: u64,
    /// Simulation seconds this frame advanced.
    pub dt: f32,
    /// Wave stencil steps taken.
    pub wave_steps: u32,
    /// Automatic splashes dropped.
    pub splashes: usize,
    /// Boids alive after the tick.
    pub boids: usize,
}

/// Builder for a [`SimulationDriver`].
#[derive(Clone, Debug)]
pub struct SimulationBuilder {
    wave: WaveConfig,
    swarm: SwarmParams,
    spawn_region: SpawnRegion,
    disturbances: DisturbanceConfig,
    boid_count: usize,
    seed: Option<u64>,
    fixed_delta: Option<f32>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self {
            wave: WaveConfig::default(),
            swarm: SwarmParams::default(),
            spawn_region: SpawnRegion::default(),
            disturbances: DisturbanceConfig::default(),
            boid_count: DEFAULT_BOID_COUNT,
            seed: None,
            fixed_delta: None,
        }
    }

    /// Wave field configuration.
    pub fn with_wave(mut self, wave: WaveConfig) -> Self {
        self.wave = wave;
        self
    }

    /// Flocking parameters.
    pub fn with_swarm(mut self, swarm: SwarmParams) -> Self {
        self.swarm = swarm;
        self
    }

    /// Region new boids spawn in.
    pub fn with_spawn_region(mut self, region: SpawnRegion) -> Self {
        self.spawn_region = region;
        self
    }

    /// Automatic splash cadence.
    pub fn with_disturbances(mut self, disturbances: DisturbanceConfig) -> Self {
        self.disturbances = disturbances;
        self
    }

    /// Number of boids spawned at build time.
    pub fn with_boid_count(mut self, count: usize) -> Self {
        self.boid_count = count;
        self
    }

    /// Seed every random source for a reproducible run.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Constant frame delta for [`SimulationDriver::step`].
    pub fn with_fixed_delta(mut self, delta: Option<f32>) -> Self {
        self.fixed_delta = delta;
        self
    }

    pub fn build(self) -> Result<SimulationDriver, SimError> {
        let waves = WaveField::new(self.wave)?;
        let (swarm, splashes) = match self.seed {
            Some(seed) => (
                Swarm::with_seed(self.swarm, seed)?,
                DisturbanceScheduler::with_seed(self.disturbances, seed.wrapping_add(1))?,
            ),
            None => (
                Swarm::new(self.swarm)?,
                DisturbanceScheduler::new(self.disturbances)?,
            ),
        };
        let mut swarm = swarm.with_spawn_region(self.spawn_region)?;
        swarm.add_boids(self.boid_count);

        let mut time = Time::new();
        time.set_fixed_delta(self.fixed_delta);

        debug!(
            "driver built: {}x{} waves, {} boids, seed {:?}",
            waves.rows(),
            waves.cols(),
            swarm.len(),
            self.seed
        );
        Ok(SimulationDriver {
            waves,
            swarm,
            splashes,
            time,
        })
    }
}

/// Wave field, swarm, splash scheduler and clock advanced together.
#[derive(Clone, Debug)]
pub struct SimulationDriver {
    waves: WaveField,
    swarm: Swarm,
    splashes: DisturbanceScheduler,
    time: Time,
}

impl SimulationDriver {
    pub fn new(
        waves: WaveField,
        swarm: Swarm,
        splashes: DisturbanceScheduler,
    ) -> Self {
        Self {
            waves,
            swarm,
            splashes,
            time: Time::new(),
        }
    }

    /// Advance by a caller-supplied frame time.
    pub fn tick(&mut self, raw_dt: f32) -> Result<TickReport, SimError> {
        let dt = self.time.advance(raw_dt);
        self.run_frame(dt)
    }

    /// Advance by the wall time since the previous frame.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        let dt = self.time.update();
        self.run_frame(dt)
    }

    fn run_frame(&mut self, dt: f32) -> Result<TickReport, SimError> {
        let splashes = self.splashes.tick(dt, &mut self.waves)?;
        let wave_steps = self.waves.update(dt);
        self.swarm.update(dt);

        Ok(TickReport {
            frame: self.time.frame(),
            dt,
            wave_steps,
            splashes: splashes.len(),
            boids: self.swarm.len(),
        })
    }

    pub fn into_shared(self) -> SharedDriver {
        Arc::new(Mutex::new(self))
    }

    pub fn waves(&self) -> &WaveField {
        &self.waves
    }

    pub fn waves_mut(&mut self) -> &mut WaveField {
        &mut self.waves
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn swarm_mut(&mut self) -> &mut Swarm {
        &mut self.swarm
    }

    pub fn disturbances_mut(&mut self) -> &mut DisturbanceScheduler {
        &mut self.splashes
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }
}

/// Background thread stepping a [`SharedDriver`] once per frame.
///
/// Each frame takes the lock once, steps the driver, calls the frame callback
/// while still holding it, then releases it and sleeps out the rest of the
/// frame interval. The loop always runs at least one frame.
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<u64, SimError>>>,
}

impl RenderLoop {
    pub fn spawn<F>(driver: SharedDriver, frame_interval: Duration, mut on_frame: F) -> Self
    where
        F: FnMut(&SimulationDriver, &TickReport) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            debug!("render loop started, interval {:?}", frame_interval);
            let mut frames = 0u64;
            loop {
                let started = Instant::now();
                {
                    let mut sim = lock(&driver)?;
                    let report = sim.step()?;
                    on_frame(&sim, &report);
                }
                frames += 1;

                if !flag.load(Ordering::Acquire) {
                    break;
                }
                if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
            debug!("render loop stopped after {} frames", frames);
            Ok(frames)
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Whether the loop thread is still going.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to finish and wait for it. Returns the frame count.
    pub fn stop(mut self) -> Result<u64, SimError> {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!("render loop thread panicked");
                Err(SimError::Poisoned)
            }),
            None => Ok(0),
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_builder() -> SimulationBuilder {
        SimulationBuilder::new()
            .with_wave(WaveConfig::new(24, 24))
            .with_boid_count(12)
            .with_seed(99)
    }

    #[test]
    fn test_build_spawns_boids() {
        let driver = small_builder().build().unwrap();
        assert_eq!(driver.swarm().len(), 12);
        assert_eq!(driver.waves().rows(), 24);
    }

    #[test]
    fn test_build_rejects_bad_config() {
        let result = small_builder().with_wave(WaveConfig::new(1, 1)).build();
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_tick_reports_work() {
        let mut driver = small_builder().build().unwrap();
        let report = driver.tick(0.25).unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.splashes, 1);
        assert_eq!(report.boids, 12);
        assert!(report.wave_steps >= 1);
        assert!(driver.waves().energy() > 0.0);
    }

    #[test]
    fn test_render_loop_runs_and_stops() {
        let shared = small_builder()
            .with_fixed_delta(Some(1.0 / 60.0))
            .build()
            .unwrap()
            .into_shared();

        let frame_loop = RenderLoop::spawn(shared.clone(), Duration::from_millis(1), |sim, report| {
            assert_eq!(sim.swarm().len(), report.boids);
        });
        thread::sleep(Duration::from_millis(20));
        let frames = frame_loop.stop().unwrap();

        assert!(frames >= 1);
        assert_eq!(lock(&shared).unwrap().time().frame(), frames);
    }

    #[test]
    fn test_render_loop_reports_poisoned_lock() {
        let shared = small_builder().build().unwrap().into_shared();
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the driver lock");
        })
        .join();

        let frame_loop = RenderLoop::spawn(shared, Duration::from_millis(1), |_, _| {});
        assert_eq!(frame_loop.stop(), Err(SimError::Poisoned));
    }
}
