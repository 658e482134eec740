// Motor power values and throttle scale for the three-motor base

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

/// Largest magnitude a single motor accepts
pub const MOTOR_LIMIT: i16 = 255;

/// Top of the percentage throttle range
pub const SCALE_MAX: u8 = 100;

/// Clamp any integer into the motor range
fn clamp_motor(value: i32) -> i16 {
    value.clamp(-(MOTOR_LIMIT as i32), MOTOR_LIMIT as i32) as i16
}

/// Signed power for motors 1..3, always within [-255, 255]
///
/// Motor 1 is the front wheel, motors 2 and 3 the rear pair.
/// Out-of-range inputs are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i16; 3]")]
pub struct MotorVector {
    m1: i16,
    m2: i16,
    m3: i16,
}

impl MotorVector {
    pub const ZERO: MotorVector = MotorVector { m1: 0, m2: 0, m3: 0 };

    pub fn new(m1: i32, m2: i32, m3: i32) -> Self {
        Self {
            m1: clamp_motor(m1),
            m2: clamp_motor(m2),
            m3: clamp_motor(m3),
        }
    }

    pub fn m1(&self) -> i16 {
        self.m1
    }

    pub fn m2(&self) -> i16 {
        self.m2
    }

    pub fn m3(&self) -> i16 {
        self.m3
    }

    /// Returns values as array [m1, m2, m3]
    pub fn as_array(&self) -> [i16; 3] {
        [self.m1, self.m2, self.m3]
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[i32; 3]> for MotorVector {
    fn from([m1, m2, m3]: [i32; 3]) -> Self {
        Self::new(m1, m2, m3)
    }
}

impl From<MotorVector> for [i16; 3] {
    fn from(v: MotorVector) -> Self {
        v.as_array()
    }
}

// Range is symmetric, so negation never leaves it
impl Neg for MotorVector {
    type Output = MotorVector;

    fn neg(self) -> Self::Output {
        Self {
            m1: -self.m1,
            m2: -self.m2,
            m3: -self.m3,
        }
    }
}

impl fmt::Display for MotorVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M1={}, M2={}, M3={}", self.m1, self.m2, self.m3)
    }
}

/// Percentage throttle in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "u8")]
pub struct SpeedScale(u8);

impl SpeedScale {
    pub const FULL: SpeedScale = SpeedScale(SCALE_MAX);

    /// Build a scale, clamping into [0, 100]
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(0, SCALE_MAX as i32) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Motor magnitude for this scale: floor(scale * 2.55)
    ///
    /// Integer arithmetic keeps floor exact (2.55 has no exact binary form).
    pub fn magnitude(&self) -> i16 {
        (self.0 as i16 * MOTOR_LIMIT) / SCALE_MAX as i16
    }

    /// Step the scale up or down, saturating at the ends
    pub fn step(&self, delta: i32) -> Self {
        Self::new(self.0 as i32 + delta)
    }
}

impl From<i32> for SpeedScale {
    fn from(percent: i32) -> Self {
        Self::new(percent)
    }
}

impl From<SpeedScale> for u8 {
    fn from(scale: SpeedScale) -> Self {
        scale.0
    }
}

impl fmt::Display for SpeedScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_each_component() {
        let v = MotorVector::new(300, -10, 0);
        assert_eq!(v.as_array(), [255, -10, 0]);

        let v = MotorVector::new(-1000, 1000, i32::MIN);
        assert_eq!(v.as_array(), [-255, 255, -255]);
    }

    #[test]
    fn test_equality_is_componentwise() {
        assert_eq!(MotorVector::new(1, 2, 3), MotorVector::new(1, 2, 3));
        assert_ne!(MotorVector::new(1, 2, 3), MotorVector::new(1, 2, 4));
        // Clamped values compare equal to the limit
        assert_eq!(MotorVector::new(999, 0, 0), MotorVector::new(255, 0, 0));
    }

    #[test]
    fn test_negation_stays_in_range() {
        let v = MotorVector::new(255, -255, 0);
        assert_eq!((-v).as_array(), [-255, 255, 0]);
    }

    #[test]
    fn test_magnitude_endpoints() {
        assert_eq!(SpeedScale::new(0).magnitude(), 0);
        assert_eq!(SpeedScale::new(100).magnitude(), 255);
        assert_eq!(SpeedScale::new(80).magnitude(), 204);
        assert_eq!(SpeedScale::new(1).magnitude(), 2);
        assert_eq!(SpeedScale::new(50).magnitude(), 127);
    }

    #[test]
    fn test_scale_clamps() {
        assert_eq!(SpeedScale::new(150).percent(), 100);
        assert_eq!(SpeedScale::new(-5).percent(), 0);
        assert_eq!(SpeedScale::new(95).step(10).percent(), 100);
        assert_eq!(SpeedScale::new(5).step(-10).percent(), 0);
    }

    #[test]
    fn test_serde_clamps_on_the_way_in() {
        let v: MotorVector = serde_json::from_str("[300, -10, 0]").unwrap();
        assert_eq!(v.as_array(), [255, -10, 0]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[255,-10,0]");

        let s: SpeedScale = serde_json::from_str("120").unwrap();
        assert_eq!(s.percent(), 100);
    }
}
