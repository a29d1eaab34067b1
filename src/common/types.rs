//! Common types used throughout rust_dynamic_planning

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use nalgebra::{DVector, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::common::error::{PlanningError, PlanningResult};
use crate::common::traits::State;

/// Purely geometric state: 3D position and velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionVelocity {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl PositionVelocity {
    pub fn new(x: f64, y: f64, z: f64, vx: f64, vy: f64, vz: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            velocity: Vector3::new(vx, vy, vz),
        }
    }

    pub fn from_parts(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    pub fn x(&self) -> f64 {
        self.position[0]
    }

    pub fn y(&self) -> f64 {
        self.position[1]
    }

    pub fn z(&self) -> f64 {
        self.position[2]
    }
}

impl AddAssign for PositionVelocity {
    fn add_assign(&mut self, rhs: Self) {
        self.position += rhs.position;
        self.velocity += rhs.velocity;
    }
}

impl SubAssign for PositionVelocity {
    fn sub_assign(&mut self, rhs: Self) {
        self.position -= rhs.position;
        self.velocity -= rhs.velocity;
    }
}

impl MulAssign<f64> for PositionVelocity {
    fn mul_assign(&mut self, s: f64) {
        self.position *= s;
        self.velocity *= s;
    }
}

impl DivAssign<f64> for PositionVelocity {
    fn div_assign(&mut self, s: f64) {
        self.position /= s;
        self.velocity /= s;
    }
}

impl Add for PositionVelocity {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sub for PositionVelocity {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl Mul<f64> for PositionVelocity {
    type Output = Self;

    fn mul(mut self, s: f64) -> Self {
        self *= s;
        self
    }
}

impl Div<f64> for PositionVelocity {
    type Output = Self;

    fn div(mut self, s: f64) -> Self {
        self /= s;
        self
    }
}

impl State for PositionVelocity {
    type Domain = StateBounds;

    fn to_vector(&self) -> DVector<f64> {
        DVector::from_iterator(6, self.position.iter().chain(self.velocity.iter()).copied())
    }

    fn sample<R: Rng + ?Sized>(domain: &StateBounds, rng: &mut R) -> Self {
        let mut draw = |lo: &Vector3<f64>, hi: &Vector3<f64>| {
            Vector3::from_fn(|i, _| Uniform::new_inclusive(lo[i], hi[i]).sample(&mut *rng))
        };
        let position = draw(&domain.position_min, &domain.position_max);
        let velocity = draw(&domain.velocity_min, &domain.velocity_max);
        Self { position, velocity }
    }
}

/// Axis-aligned sampling domain for [`PositionVelocity`]
#[derive(Debug, Clone, PartialEq)]
pub struct StateBounds {
    pub position_min: Vector3<f64>,
    pub position_max: Vector3<f64>,
    pub velocity_min: Vector3<f64>,
    pub velocity_max: Vector3<f64>,
}

impl StateBounds {
    pub fn new(
        position_min: Vector3<f64>,
        position_max: Vector3<f64>,
        velocity_min: Vector3<f64>,
        velocity_max: Vector3<f64>,
    ) -> PlanningResult<Self> {
        let ordered = |lo: &Vector3<f64>, hi: &Vector3<f64>| {
            (0..3).all(|i| lo[i].is_finite() && hi[i].is_finite() && lo[i] <= hi[i])
        };
        if !ordered(&position_min, &position_max) || !ordered(&velocity_min, &velocity_max) {
            return Err(PlanningError::InvalidParameter(
                "state bounds must be finite with min <= max".to_string(),
            ));
        }
        Ok(Self {
            position_min,
            position_max,
            velocity_min,
            velocity_max,
        })
    }

    /// Planar box `[xmin, xmax] x [ymin, ymax]` at z = 0 with zero velocity
    pub fn planar(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> PlanningResult<Self> {
        Self::new(
            Vector3::new(xmin, ymin, 0.0),
            Vector3::new(xmax, ymax, 0.0),
            Vector3::zeros(),
            Vector3::zeros(),
        )
    }

    pub fn contains_position(&self, position: &Vector3<f64>) -> bool {
        (0..3).all(|i| {
            position[i] >= self.position_min[i] && position[i] <= self.position_max[i]
        })
    }
}

/// Spherical obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereObstacle {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl SphereObstacle {
    pub fn new(x: f64, y: f64, z: f64, radius: f64) -> Self {
        Self {
            center: Vector3::new(x, y, z),
            radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_position_velocity_arithmetic() {
        let a = PositionVelocity::new(1.0, 2.0, 3.0, 0.5, 0.5, 0.5);
        let b = PositionVelocity::new(3.0, 2.0, 1.0, -0.5, 0.5, 1.5);
        let mid = a * 0.5 + b * 0.5;
        assert_eq!(mid, PositionVelocity::new(2.0, 2.0, 2.0, 0.0, 0.5, 1.0));
        assert_eq!((b - a) / 2.0, PositionVelocity::new(1.0, 0.0, -1.0, -0.5, 0.0, 0.5));
    }

    #[test]
    fn test_to_vector_layout() {
        let s = PositionVelocity::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let v = s.to_vector();
        assert_eq!(v.len(), 6);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sample_stays_in_bounds() {
        let bounds = StateBounds::new(
            Vector3::new(-1.0, 0.0, 2.0),
            Vector3::new(1.0, 5.0, 2.0),
            Vector3::new(-0.1, -0.1, 0.0),
            Vector3::new(0.1, 0.1, 0.0),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let s = PositionVelocity::sample(&bounds, &mut rng);
            assert!(bounds.contains_position(&s.position));
            assert_eq!(s.z(), 2.0);
            assert!(s.velocity[0].abs() <= 0.1 && s.velocity[1].abs() <= 0.1);
        }
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = StateBounds::planar(1.0, 0.0, 0.0, 1.0);
        assert!(matches!(result, Err(PlanningError::InvalidParameter(_))));
    }
}
