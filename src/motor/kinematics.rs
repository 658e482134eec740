// Directional kinematics for the three-motor base
// Maps a logical intent plus a throttle scale to per-motor power values.
//
// The drivetrain only supports four directional primitives plus direct motor
// addressing, so each profile is a fixed lookup table rather than a solver.

use serde::{Deserialize, Serialize};

use super::vector::{MotorVector, SpeedScale};

/// A movement command before kinematic resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Forward,
    Backward,
    #[serde(alias = "left")]
    TurnLeft,
    #[serde(alias = "right")]
    TurnRight,
    Stop,
    /// Raw motor values, clamped on resolution and independent of scale
    Direct(i32, i32, i32),
}

impl Intent {
    pub fn is_stop(&self) -> bool {
        matches!(self, Intent::Stop)
    }
}

/// Lookup table used to turn directional intents into motor values
///
/// Both tables keep Forward/Backward and TurnLeft/TurnRight exact opposites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KinematicsProfile {
    /// Front wheel on motor 1, rear pair on motors 2/3
    #[default]
    Trike,
    /// All three motors share the forward axis (autonomy host wiring)
    Uniform,
}

impl KinematicsProfile {
    /// Resolve an intent with this profile's table
    pub fn resolve(&self, intent: Intent, scale: SpeedScale) -> MotorVector {
        let mag = scale.magnitude() as i32;

        match (self, intent) {
            (_, Intent::Stop) => MotorVector::ZERO,
            (_, Intent::Direct(m1, m2, m3)) => MotorVector::new(m1, m2, m3),

            (KinematicsProfile::Trike, Intent::Forward) => MotorVector::new(0, mag, -mag),
            (KinematicsProfile::Trike, Intent::Backward) => MotorVector::new(0, -mag, mag),
            (KinematicsProfile::Trike, Intent::TurnRight) => MotorVector::new(-mag, 0, mag),
            (KinematicsProfile::Trike, Intent::TurnLeft) => MotorVector::new(mag, -mag, 0),

            (KinematicsProfile::Uniform, Intent::Forward) => MotorVector::new(mag, mag, mag),
            (KinematicsProfile::Uniform, Intent::Backward) => MotorVector::new(-mag, -mag, -mag),
            (KinematicsProfile::Uniform, Intent::TurnRight) => MotorVector::new(mag, -mag, 0),
            (KinematicsProfile::Uniform, Intent::TurnLeft) => MotorVector::new(-mag, mag, 0),
        }
    }
}

/// Resolve an intent with the default (trike) profile
pub fn resolve(intent: Intent, scale: SpeedScale) -> MotorVector {
    resolve_with_profile(intent, scale, KinematicsProfile::default())
}

/// Resolve an intent with an explicit profile
pub fn resolve_with_profile(
    intent: Intent,
    scale: SpeedScale,
    profile: KinematicsProfile,
) -> MotorVector {
    profile.resolve(intent, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: [KinematicsProfile; 2] = [KinematicsProfile::Trike, KinematicsProfile::Uniform];

    #[test]
    fn test_stop_is_zero_for_every_scale() {
        for profile in PROFILES {
            for s in 0..=100 {
                let v = profile.resolve(Intent::Stop, SpeedScale::new(s));
                assert_eq!(v, MotorVector::ZERO, "profile {:?} scale {}", profile, s);
            }
        }
    }

    #[test]
    fn test_directions_are_pairwise_opposite() {
        for profile in PROFILES {
            for s in 0..=100 {
                let scale = SpeedScale::new(s);
                assert_eq!(
                    profile.resolve(Intent::Forward, scale),
                    -profile.resolve(Intent::Backward, scale)
                );
                assert_eq!(
                    profile.resolve(Intent::TurnLeft, scale),
                    -profile.resolve(Intent::TurnRight, scale)
                );
            }
        }
    }

    #[test]
    fn test_trike_table() {
        let scale = SpeedScale::new(80);
        assert_eq!(resolve(Intent::Forward, scale).as_array(), [0, 204, -204]);
        assert_eq!(resolve(Intent::Backward, scale).as_array(), [0, -204, 204]);
        assert_eq!(resolve(Intent::TurnRight, scale).as_array(), [-204, 0, 204]);
        assert_eq!(resolve(Intent::TurnLeft, scale).as_array(), [204, -204, 0]);
    }

    #[test]
    fn test_uniform_table() {
        let scale = SpeedScale::FULL;
        let p = KinematicsProfile::Uniform;
        assert_eq!(p.resolve(Intent::Forward, scale).as_array(), [255, 255, 255]);
        assert_eq!(p.resolve(Intent::TurnLeft, scale).as_array(), [-255, 255, 0]);
        assert_eq!(p.resolve(Intent::TurnRight, scale).as_array(), [255, -255, 0]);
    }

    #[test]
    fn test_direct_clamps_and_ignores_scale() {
        let v = resolve(Intent::Direct(300, -10, 0), SpeedScale::new(0));
        assert_eq!(v.as_array(), [255, -10, 0]);

        let v = resolve_with_profile(
            Intent::Direct(-400, 17, 255),
            SpeedScale::new(42),
            KinematicsProfile::Uniform,
        );
        assert_eq!(v.as_array(), [-255, 17, 255]);
    }

    #[test]
    fn test_zero_scale_yields_zero_motion() {
        for intent in [Intent::Forward, Intent::Backward, Intent::TurnLeft, Intent::TurnRight] {
            assert!(resolve(intent, SpeedScale::new(0)).is_zero());
        }
    }

    #[test]
    fn test_intent_wire_names() {
        let i: Intent = serde_json::from_str("\"turn_left\"").unwrap();
        assert_eq!(i, Intent::TurnLeft);
        let i: Intent = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(i, Intent::TurnRight);
        let i: Intent = serde_json::from_str("{\"direct\":[10,-20,30]}").unwrap();
        assert_eq!(i, Intent::Direct(10, -20, 30));
    }
}
