// Drive test: careful, step-by-step check of every directional frame
//
// Usage: cargo run --example drive_test -- [port] [scale]
// Example: cargo run --example drive_test -- /dev/ttyUSB0 30
//
// Safety features:
// - Explicit confirmation before any writes
// - Starts with a stop frame
// - Low default scale
// - Stop frame between every step

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use trimotor_teleop::channel::{frame, CommandChannel, SerialPortProvider};
use trimotor_teleop::motor::{resolve, Intent, MotorVector, SpeedScale};

const DEFAULT_TEST_SCALE: i32 = 20;

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next();
    let scale = SpeedScale::new(
        args.next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TEST_SCALE),
    );

    println!("Three-motor drive test (WITH WRITES)");
    println!("  This tool WILL move the motors.");
    println!("  Keep the wheels OFF THE GROUND.");
    println!();
    println!("Serial port: {}", port.as_deref().unwrap_or("<choose from list>"));
    println!("Speed scale: {} (magnitude {})", scale, scale.magnitude());
    println!();

    if !confirm("Are the robot's wheels OFF THE GROUND?") {
        println!("Please elevate the robot so wheels can spin freely.");
        return Ok(());
    }

    let channel = CommandChannel::new(Arc::new(SerialPortProvider::new(port)));
    let info = channel.connect().await?;
    println!("Connected to {} at {} baud", info.port, info.baud_rate);

    // ========== STEP 1: Stop frame ==========
    println!("Step 1: Sending a stop frame (no movement expected)...");
    channel.send(MotorVector::ZERO).await?;
    println!("  sent {:?}", frame::format_frame(&MotorVector::ZERO));
    println!();

    // ========== STEP 2: Directions ==========
    if !confirm("Proceed with the direction test?") {
        channel.disconnect().await;
        return Ok(());
    }

    let step = Duration::from_millis(300);
    let pause = Duration::from_millis(500);
    let tests = [
        ("Forward", Intent::Forward),
        ("Backward", Intent::Backward),
        ("Turn left", Intent::TurnLeft),
        ("Turn right", Intent::TurnRight),
    ];

    for (name, intent) in tests {
        let v = resolve(intent, scale);
        println!("  Testing: {} -> {:?}", name, frame::format_frame(&v));
        channel.send(v).await?;
        tokio::time::sleep(step).await;

        channel.send(MotorVector::ZERO).await?;
        tokio::time::sleep(pause).await;
    }

    // ========== FINAL: Stop and release ==========
    println!();
    println!("Stopping motors...");
    channel.send(MotorVector::ZERO).await?;
    channel.disconnect().await;
    println!("Done. If each step moved as named, the wiring matches the trike table.");

    Ok(())
}
