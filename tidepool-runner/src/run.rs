//! Headless frame loop for a scene.

use crate::config::SceneConfig;
use log::{debug, info};
use std::fmt;
use std::time::{Duration, Instant};
use tidepool::{SimError, SimulationDriver, TickReport, Vec3};

/// Totals collected over a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub simulated_secs: f64,
    pub wave_steps: u64,
    pub splashes: u64,
    pub final_energy: f64,
    pub boids: usize,
    pub centroid: Option<Vec3>,
    pub average_speed: f32,
    pub wall_time: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks ({:.2}s simulated) in {:.2?}: {} wave steps, {} splashes, energy {:.4}, {} boids at {:.3} avg speed",
            self.ticks,
            self.simulated_secs,
            self.wall_time,
            self.wave_steps,
            self.splashes,
            self.final_energy,
            self.boids,
            self.average_speed,
        )?;
        if let Some(c) = self.centroid {
            write!(f, ", centroid ({:.2}, {:.2}, {:.2})", c.x, c.y, c.z)?;
        }
        Ok(())
    }
}

/// Build the scene's driver and run it to completion.
pub fn run_scene(scene: &SceneConfig) -> Result<RunSummary, SimError> {
    let mut driver = scene.build()?;
    run_driver(&mut driver, scene, |driver, report| {
        info!(
            "frame {:>6}: energy {:.4}, {} boids, avg speed {:.3}",
            report.frame,
            driver.waves().energy(),
            report.boids,
            driver.swarm().average_speed()
        );
    })
}

/// Tick `driver` for `scene.run.ticks` frames, calling `on_report` every
/// `report_every` frames.
pub fn run_driver<F>(
    driver: &mut SimulationDriver,
    scene: &SceneConfig,
    mut on_report: F,
) -> Result<RunSummary, SimError>
where
    F: FnMut(&SimulationDriver, &TickReport),
{
    let run = scene.run;
    debug!("running '{}' for {} ticks of {}s", scene.name, run.ticks, run.dt);

    let started = Instant::now();
    let mut simulated_secs = 0.0f64;
    let mut wave_steps = 0u64;
    let mut splashes = 0u64;

    for _ in 0..run.ticks {
        let report = driver.tick(run.dt)?;
        simulated_secs += f64::from(report.dt);
        wave_steps += u64::from(report.wave_steps);
        splashes += report.splashes as u64;

        if run.report_every > 0 && report.frame % run.report_every == 0 {
            on_report(driver, &report);
        }
    }

    Ok(RunSummary {
        ticks: run.ticks,
        simulated_secs,
        wave_steps,
        splashes,
        final_energy: driver.waves().energy(),
        boids: driver.swarm().len(),
        centroid: driver.swarm().centroid(),
        average_speed: driver.swarm().average_speed(),
        wall_time: started.elapsed(),
    })
}
