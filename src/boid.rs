//! A single flocking agent.

use glam::{Mat4, Vec3};

/// Point-mass agent steered by the swarm rules.
///
/// Velocity is measured in world units per tick: [`Boid::apply`] adds the
/// whole velocity to the position, it is not scaled by the frame time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boid {
    position: Vec3,
    velocity: Vec3,
    max_speed: f32,
}

impl Boid {
    /// A negative or NaN `max_speed` becomes a cap of zero.
    pub fn new(position: Vec3, velocity: Vec3, max_speed: f32) -> Self {
        Self {
            position,
            velocity,
            max_speed: sanitize_cap(max_speed),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Override this boid's speed cap. The next swarm-wide max speed change
    /// overwrites it again. Negative or NaN caps clamp to zero.
    pub fn set_max_speed(&mut self, max_speed: f32) {
        self.max_speed = sanitize_cap(max_speed);
    }

    pub(crate) fn respawn(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    /// Add `delta_velocity`, clamp the speed to the cap, then move.
    pub fn apply(&mut self, delta_velocity: Vec3) {
        self.velocity += delta_velocity;
        let speed = self.velocity.length();
        if speed > self.max_speed {
            self.velocity *= self.max_speed / speed;
        }
        self.position += self.velocity;
    }

    /// World transform placing a unit model at this boid.
    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }
}

fn sanitize_cap(max_speed: f32) -> f32 {
    if max_speed.is_nan() {
        0.0
    } else {
        max_speed.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_integrates_raw_velocity() {
        let mut boid = Boid::new(Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0), 1.0);
        boid.apply(Vec3::new(0.0, 0.2, 0.0));
        assert!((boid.velocity() - Vec3::new(0.1, 0.2, 0.0)).length() < 1e-6);
        assert!((boid.position() - Vec3::new(0.1, 0.2, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_apply_clamps_speed() {
        let mut boid = Boid::new(Vec3::ZERO, Vec3::ZERO, 0.5);
        boid.apply(Vec3::new(3.0, 4.0, 0.0));
        assert!((boid.speed() - 0.5).abs() < 1e-6);
        assert!((boid.velocity().normalize() - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-6);
        assert!((boid.position() - Vec3::new(0.3, 0.4, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_bad_caps_stop_the_boid() {
        let mut reversed = Boid::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), -2.0);
        assert_eq!(reversed.max_speed(), 0.0);
        reversed.apply(Vec3::ZERO);
        assert_eq!(reversed.velocity(), Vec3::ZERO);
        assert_eq!(reversed.position(), Vec3::ZERO);

        let mut unbounded = Boid::new(Vec3::ZERO, Vec3::ZERO, 1.0);
        unbounded.set_max_speed(f32::NAN);
        assert_eq!(unbounded.max_speed(), 0.0);
        unbounded.apply(Vec3::new(5.0, 0.0, 0.0));
        assert!(unbounded.speed() <= unbounded.max_speed());
    }

    #[test]
    fn test_transform_is_translation() {
        let boid = Boid::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 1.0);
        let m = boid.transform();
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }
}
