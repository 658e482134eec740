// Timeouts, key expressions, link parameters and command-line settings
use clap::Parser;
use std::time::Duration;

use crate::motor::KinematicsProfile;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// ManualActive falls back to ManualIdle after this long without an intent
pub const MANUAL_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

// Serial link: 9600 baud, 8N1
pub const BAUD_RATE: u32 = 9600;

// The board resets when the port opens; wait before the first frame
pub const LINK_SETTLE: Duration = Duration::from_secs(2);

// Throttle
pub const DEFAULT_SPEED_SCALE: u8 = 80;
pub const SCALE_STEP: i32 = 10;

// Direct-motor panel slider step per key press
pub const SLIDER_STEP: i32 = 5;

// Zenoh key expressions
pub const TOPIC_AUTONOMY_INTENT: &str = "trimotor/autonomy/intent"; // autonomy peer -> us
pub const TOPIC_AUTONOMY_TELEMETRY: &str = "trimotor/autonomy/telemetry"; // autonomy peer -> us
pub const TOPIC_AUTONOMY_ENABLE: &str = "trimotor/autonomy/enable"; // us -> autonomy peer
pub const TOPIC_REMOTE_INPUT: &str = "trimotor/remote/input"; // remote button panel -> us
pub const TOPIC_STATUS: &str = "trimotor/state/status"; // status heartbeat

/// Teleoperation front end for a three-motor serial robot
#[derive(Debug, Clone, Parser)]
#[command(name = "trimotor-teleop", version)]
pub struct Settings {
    /// Serial port (e.g. /dev/ttyUSB0); prompts from the port list when omitted
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(long, default_value_t = BAUD_RATE)]
    pub baud: u32,

    /// Initial speed scale in percent
    #[arg(short, long, default_value_t = DEFAULT_SPEED_SCALE,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    pub scale: u8,

    /// Kinematics table used for directional intents
    #[arg(long, value_enum, default_value_t = KinematicsProfile::Trike)]
    pub profile: KinematicsProfile,

    /// Skip frames identical to the last one transmitted
    #[arg(long)]
    pub suppress_repeats: bool,

    /// Connect at startup instead of waiting for the connect key
    #[arg(long)]
    pub connect: bool,

    /// Milliseconds to wait after opening the port
    #[arg(long, default_value_t = LINK_SETTLE.as_millis() as u64)]
    pub settle_ms: u64,

    /// Write frames to an in-memory loopback instead of a serial port
    #[arg(long)]
    pub dry_run: bool,
}

impl Settings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::parse_from(["trimotor-teleop"]);
        assert_eq!(s.port, None);
        assert_eq!(s.baud, 9600);
        assert_eq!(s.scale, 80);
        assert_eq!(s.profile, KinematicsProfile::Trike);
        assert!(!s.suppress_repeats);
        assert_eq!(s.settle(), LINK_SETTLE);
    }

    #[test]
    fn test_overrides() {
        let s = Settings::parse_from([
            "trimotor-teleop",
            "--port",
            "/dev/ttyACM0",
            "--scale",
            "55",
            "--profile",
            "uniform",
            "--suppress-repeats",
            "--settle-ms",
            "0",
        ]);
        assert_eq!(s.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(s.scale, 55);
        assert_eq!(s.profile, KinematicsProfile::Uniform);
        assert!(s.suppress_repeats);
        assert!(s.settle().is_zero());
    }

    #[test]
    fn test_scale_out_of_range_rejected() {
        assert!(Settings::try_parse_from(["trimotor-teleop", "--scale", "101"]).is_err());
    }
}
