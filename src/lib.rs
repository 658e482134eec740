// Teleoperation front end for a three-motor robot on a serial link
//
// Data flow: input/autonomy intent -> mode gate -> kinematics -> framed serial write.
// Telemetry from the autonomy peer flows the other way and never reaches the link.

pub mod channel;
pub mod config;
pub mod error;
pub mod input;
pub mod messages;
pub mod mode;
pub mod motor;
pub mod pipeline;
pub mod runtime;
pub mod telemetry;

pub use error::{ConnectError, Error, SendError};
pub use pipeline::{Outcome, Pipeline, RepeatPolicy};
