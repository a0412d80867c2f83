//! Whole-flock properties of the boids simulation.

use tidepool::swarm::{ADD_BATCH, DEFAULT_BOID_COUNT, REMOVE_BATCH};
use tidepool::{Boid, BoidParameter, Swarm, SwarmParams, Vec3};

const FRAME: f32 = 1.0 / 60.0;

fn seeded_swarm(seed: u64, count: usize) -> Swarm {
    let mut swarm = Swarm::with_seed(SwarmParams::default(), seed).unwrap();
    swarm.add_boids(count);
    swarm
}

#[test]
fn test_speed_never_exceeds_cap() {
    let params = SwarmParams {
        avoid_factor: 5.0,
        matching_factor: 2.0,
        move_to_center_factor: 1.0,
        turn_factor: 4.0,
        ..Default::default()
    };
    let mut swarm = Swarm::with_seed(params, 21).unwrap();
    swarm.add_boids(80);

    for _ in 0..200 {
        swarm.update(FRAME);
        let cap = swarm.params().max_speed;
        for boid in swarm.boids() {
            assert!(boid.speed() <= cap + 1e-5, "speed {} above cap {}", boid.speed(), cap);
        }
    }
}

#[test]
fn test_population_batches() {
    let mut swarm = seeded_swarm(1, DEFAULT_BOID_COUNT);
    assert_eq!(swarm.len(), 200);

    swarm.add_boids(ADD_BATCH);
    assert_eq!(swarm.len(), 220);

    swarm.remove_boids(REMOVE_BATCH);
    assert_eq!(swarm.len(), 210);

    swarm.remove_boids(1_000);
    assert_eq!(swarm.len(), 0);

    swarm.add_boids(0);
    assert!(swarm.is_empty());
}

#[test]
fn test_identical_runs_are_identical() {
    let run = || {
        let mut swarm = seeded_swarm(77, 60);
        for frame in 0..150 {
            swarm.update(FRAME);
            if frame == 50 {
                swarm.set_parameter(BoidParameter::AvoidFactor, 0.3).unwrap();
            }
        }
        swarm.boids().to_vec()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_update_draws_no_randomness() {
    let mut a = seeded_swarm(5, 20);
    let mut b = a.clone();

    for _ in 0..30 {
        a.update(FRAME);
    }
    // Spawns after updating must match spawns without updating.
    a.add_boids(3);
    b.add_boids(3);
    assert_eq!(&a.boids()[20..], &b.boids()[20..]);
}

#[test]
fn test_cohesion_pulls_pair_together() {
    let params = SwarmParams {
        move_to_center_factor: 0.5,
        matching_factor: 0.0,
        avoid_factor: 0.0,
        turn_factor: 0.0,
        ..Default::default()
    };
    let mut swarm = Swarm::with_seed(params, 0).unwrap();
    swarm.push_boid(Boid::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::ZERO, params.max_speed));
    swarm.push_boid(Boid::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, params.max_speed));

    swarm.update(0.1);

    let left = swarm.boids()[0].velocity();
    let right = swarm.boids()[1].velocity();
    assert!(left.x > 0.0 && left.y == 0.0 && left.z == 0.0);
    assert!(right.x < 0.0 && right.y == 0.0 && right.z == 0.0);
    // (2.0 * 0.5) * 0.1 on each side, under the speed cap.
    assert!((left.x - 0.1).abs() < 1e-6);
    assert!((right.x + 0.1).abs() < 1e-6);
}

#[test]
fn test_bounds_steer_strays_home() {
    let params = SwarmParams {
        move_to_center_factor: 0.0,
        matching_factor: 0.0,
        avoid_factor: 0.0,
        turn_factor: 1.0,
        max_speed: 0.5,
        box_edge_length: 10.0,
        ..Default::default()
    };
    let mut swarm = Swarm::with_seed(params, 0).unwrap();
    swarm.push_boid(Boid::new(Vec3::new(40.0, 0.0, -40.0), Vec3::ZERO, 0.5));

    for _ in 0..200 {
        swarm.update(0.1);
    }
    let p = swarm.boids()[0].position();
    assert!(p.x < 40.0 && p.z > -40.0);
    assert!(p.x.abs() < 12.0 && p.z.abs() < 12.0, "boid still far out at {p}");
}

#[test]
fn test_reset_keeps_size_and_caps() {
    let mut swarm = seeded_swarm(3, 40);
    swarm.set_parameter(BoidParameter::MaxSpeed, 0.4).unwrap();
    swarm.reset_boids();

    assert_eq!(swarm.len(), 40);
    for boid in swarm.boids() {
        assert!((boid.speed() - 0.4).abs() < 1e-5);
        assert_eq!(boid.max_speed(), 0.4);
    }
}
