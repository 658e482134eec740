// Stand-in autonomy peer: synthetic obstacle telemetry + intents while enabled
//
// Usage: cargo run --example autonomy_peer
// Start the teleop runtime, connect, then press M to hand it the robot.
use std::time::Duration;
use tracing::{info, warn};

use trimotor_teleop::config::{
    TOPIC_AUTONOMY_ENABLE, TOPIC_AUTONOMY_INTENT, TOPIC_AUTONOMY_TELEMETRY,
};
use trimotor_teleop::messages::{AutonomyCommand, AutonomyEnable, ObstacleReport, SensorData};
use trimotor_teleop::motor::{Intent, SpeedScale};
use trimotor_teleop::telemetry::ObstacleReading;

const PUBLISH_HZ: u64 = 10;

/// Slowly sweeping fake distances so every sector blocks now and then
fn fake_distances(t: f32) -> (f32, f32, f32) {
    let wave = |phase: f32| 1.2 + (t * 0.5 + phase).sin();
    (wave(0.0), wave(2.1), wave(4.2))
}

/// Pick a direction from the sectors: straight if clear, else sidestep
fn choose(reading: &ObstacleReading) -> (Intent, SpeedScale) {
    if !reading.center.blocked {
        (Intent::Forward, SpeedScale::new(60))
    } else if !reading.right.blocked {
        (Intent::TurnRight, SpeedScale::new(47))
    } else if !reading.left.blocked {
        (Intent::TurnLeft, SpeedScale::new(47))
    } else {
        (Intent::Backward, SpeedScale::new(40))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let sub_enable = session.declare_subscriber(TOPIC_AUTONOMY_ENABLE).await?;
    let pub_intent = session.declare_publisher(TOPIC_AUTONOMY_INTENT).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_AUTONOMY_TELEMETRY).await?;

    let mut enabled = false;
    let mut tick = tokio::time::interval(Duration::from_millis(1000 / PUBLISH_HZ));
    let started = tokio::time::Instant::now();

    loop {
        tick.tick().await;

        while let Ok(Some(sample)) = sub_enable.try_recv() {
            match serde_json::from_slice::<AutonomyEnable>(&sample.payload().to_bytes()) {
                Ok(msg) => {
                    enabled = msg.enabled;
                    info!("Autonomy {}", if enabled { "ENABLED" } else { "disabled" });
                }
                Err(e) => warn!("Bad enable message: {}", e),
            }
        }

        let t = started.elapsed().as_secs_f32();
        let (l, c, r) = fake_distances(t);
        let reading = ObstacleReading::from_distances(l, c, r);

        let data = SensorData {
            timestamp: Some(t as f64),
            obstacles: Some(ObstacleReport::from(&reading)),
            camera: None,
        };
        pub_telemetry.put(serde_json::to_string(&data)?).await?;

        if enabled {
            let (intent, scale) = choose(&reading);
            let cmd = AutonomyCommand { intent, scale: Some(scale) };
            pub_intent.put(serde_json::to_string(&cmd)?).await?;
        }
    }
}
