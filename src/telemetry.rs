// Latest camera frame and obstacle sectors reported by the autonomy peer
//
// Read-only to the rest of the pipeline; never touches the command channel.

use serde::{Deserialize, Serialize};

/// Distance separating "clear" from "blocked"
pub const OBSTACLE_THRESHOLD_M: f32 = 0.8;

/// One obstacle sector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorReading {
    pub blocked: bool,
    pub distance_m: f32,
}

impl SectorReading {
    /// Classify a distance against the threshold
    pub fn from_distance(distance_m: f32) -> Self {
        Self {
            blocked: distance_m < OBSTACLE_THRESHOLD_M,
            distance_m,
        }
    }
}

/// Left/center/right obstacle sectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReading {
    pub left: SectorReading,
    pub center: SectorReading,
    pub right: SectorReading,
}

impl ObstacleReading {
    pub fn from_distances(left: f32, center: f32, right: f32) -> Self {
        Self {
            left: SectorReading::from_distance(left),
            center: SectorReading::from_distance(center),
            right: SectorReading::from_distance(right),
        }
    }

    pub fn all_clear(&self) -> bool {
        !(self.left.blocked || self.center.blocked || self.right.blocked)
    }
}

/// Camera frame as delivered (base64 JPEG); not decoded here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFrame(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub frame: Option<CameraFrame>,
    pub obstacles: Option<ObstacleReading>,
    /// Peer-side timestamp in seconds, when provided
    pub timestamp: Option<f64>,
}

/// Last-write-wins holder, no history
#[derive(Debug, Default)]
pub struct TelemetrySink {
    latest: Option<TelemetrySnapshot>,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whichever parts are provided; absent parts keep their last value
    pub fn update(&mut self, frame: Option<CameraFrame>, obstacles: Option<ObstacleReading>) {
        self.update_at(frame, obstacles, None);
    }

    pub fn update_at(
        &mut self,
        frame: Option<CameraFrame>,
        obstacles: Option<ObstacleReading>,
        timestamp: Option<f64>,
    ) {
        if frame.is_none() && obstacles.is_none() {
            return;
        }
        let snapshot = self.latest.get_or_insert_with(TelemetrySnapshot::default);
        if frame.is_some() {
            snapshot.frame = frame;
        }
        if obstacles.is_some() {
            snapshot.obstacles = obstacles;
        }
        if timestamp.is_some() {
            snapshot.timestamp = timestamp;
        }
    }

    /// Latest snapshot, or None before any data arrived
    pub fn current(&self) -> Option<&TelemetrySnapshot> {
        self.latest.as_ref()
    }
}
