// Motor model for the three-motor base
//
// Provides:
// - Motor power vector and throttle scale
// - Directional kinematics (intent -> motor values)

pub mod kinematics;
pub mod vector;

pub use kinematics::{resolve, resolve_with_profile, Intent, KinematicsProfile};
pub use vector::{MotorVector, SpeedScale, MOTOR_LIMIT};
