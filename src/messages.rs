// Message types exchanged over zenoh with the autonomy peer and remote panels

use serde::{Deserialize, Serialize};

use crate::input::{Button, InputEvent, MotorSlot};
use crate::mode::ControlMode;
use crate::motor::{Intent, KinematicsProfile, SpeedScale};
use crate::telemetry::{CameraFrame, ObstacleReading, SectorReading};

// Autonomy peer -> runtime
// Scale is optional; the operator's current scale applies when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomyCommand {
    #[serde(alias = "direction")]
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<SpeedScale>,
}

// Runtime -> autonomy peer: start or stop producing intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutonomyEnable {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorDistances {
    pub left: f32,
    pub center: f32,
    pub right: f32,
}

/// Obstacle block as the peer sends it: flags plus distances in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReport {
    pub left: bool,
    pub center: bool,
    pub right: bool,
    pub distances: SectorDistances,
}

// The peer already classified the sectors, so its flags are kept as-is
impl From<ObstacleReport> for ObstacleReading {
    fn from(r: ObstacleReport) -> Self {
        Self {
            left: SectorReading { blocked: r.left, distance_m: r.distances.left },
            center: SectorReading { blocked: r.center, distance_m: r.distances.center },
            right: SectorReading { blocked: r.right, distance_m: r.distances.right },
        }
    }
}

impl From<&ObstacleReading> for ObstacleReport {
    fn from(r: &ObstacleReading) -> Self {
        Self {
            left: r.left.blocked,
            center: r.center.blocked,
            right: r.right.blocked,
            distances: SectorDistances {
                left: r.left.distance_m,
                center: r.center.distance_m,
                right: r.right.distance_m,
            },
        }
    }
}

/// Sensor update from the autonomy peer (camera is a base64 JPEG)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorData {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub obstacles: Option<ObstacleReport>,
    #[serde(default)]
    pub camera: Option<String>,
}

impl SensorData {
    pub fn into_parts(self) -> (Option<CameraFrame>, Option<ObstacleReading>, Option<f64>) {
        (
            self.camera.map(CameraFrame),
            self.obstacles.map(ObstacleReading::from),
            self.timestamp,
        )
    }
}

/// Input from a remote button panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteInput {
    Button { button: Button },
    Slider { slot: MotorSlot, value: i32 },
    Go,
    Stop,
}

impl From<RemoteInput> for InputEvent {
    fn from(r: RemoteInput) -> Self {
        match r {
            RemoteInput::Button { button } => InputEvent::Button(button),
            RemoteInput::Slider { slot, value } => InputEvent::Slider { slot, value },
            RemoteInput::Go => InputEvent::Go,
            RemoteInput::Stop => InputEvent::DirectStop,
        }
    }
}

/// Status published by the runtime whenever it changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub mode: ControlMode,
    pub scale: u8,
    pub profile: KinematicsProfile,
    pub port: Option<String>,
    pub last_frame: Option<String>,
}
