// 50 Hz teleop loop: keyboard, remote panel and autonomy peer -> pipeline
// Each tick drains every input source, lets the mode machine expire manual
// activity, then publishes the autonomy enable signal and status if changed.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::channel::{frame, CommandChannel, LinkProvider, Loopback, SerialPortProvider};
use crate::config::{
    Settings, LOOP_HZ, SCALE_STEP, TOPIC_AUTONOMY_ENABLE, TOPIC_AUTONOMY_INTENT,
    TOPIC_AUTONOMY_TELEMETRY, TOPIC_REMOTE_INPUT, TOPIC_STATUS,
};
use crate::error::Error;
use crate::input::{action_for_key, Command, InputDispatcher, InputEvent, KeyAction, MotorSlot};
use crate::messages::{AutonomyCommand, AutonomyEnable, RemoteInput, RuntimeStatus, SensorData};
use crate::mode::{ControlMode, IntentSource};
use crate::motor::SpeedScale;
use crate::pipeline::{Outcome, Pipeline, RepeatPolicy};
use crate::telemetry::TelemetrySink;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Everything the loop owns besides the zenoh handles
pub struct Teleop {
    pipeline: Pipeline,
    dispatcher: InputDispatcher,
    telemetry: TelemetrySink,
    selected: MotorSlot,
}

impl Teleop {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            dispatcher: InputDispatcher::new(),
            telemetry: TelemetrySink::new(),
            selected: MotorSlot::M1,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn telemetry(&self) -> &TelemetrySink {
        &self.telemetry
    }

    /// Connect with the terminal in cooked mode (port selection may prompt)
    async fn connect_interactive(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Could not leave raw mode for connect: {}", e);
        }
        if let Err(e) = self.connect().await {
            debug!("Interactive connect did not complete: {}", e);
        }
        if let Err(e) = enable_raw_mode() {
            warn!("Could not re-enter raw mode: {}", e);
        }
    }

    async fn connect(&mut self) -> Result<(), Error> {
        self.pipeline.connect().await.map(|info| {
            info!("Connected: {} @ {} baud", info.port, info.baud_rate);
        })
    }

    async fn on_key(&mut self, code: KeyCode) -> Flow {
        let Some(action) = action_for_key(code) else {
            return Flow::Continue;
        };

        match action {
            KeyAction::Command(cmd) => return self.on_command(cmd).await,
            KeyAction::SelectSlot(slot) => {
                self.selected = slot;
                info!("Direct panel: {:?} selected", slot);
            }
            KeyAction::Nudge(steps) => {
                let ev = self.dispatcher.nudge(self.selected, steps);
                self.on_input(ev).await;
            }
            KeyAction::Input(ev) => self.on_input(ev).await,
        }
        Flow::Continue
    }

    async fn on_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Connect => self.connect_interactive().await,
            Command::Disconnect => self.pipeline.disconnect().await,
            Command::EmergencyStop => {
                if let Err(e) = self.pipeline.emergency_stop().await {
                    error!("Emergency stop frame not delivered: {}", e);
                }
            }
            Command::Reset => {
                if self.pipeline.reset() {
                    info!("Emergency stop cleared");
                }
            }
            Command::ToggleAutonomous => {
                let enable = self.pipeline.mode() != ControlMode::Autonomous;
                if !self.pipeline.set_autonomous(enable) {
                    warn!("Autonomous mode unavailable in {}", self.pipeline.mode());
                }
            }
            Command::SpeedUp => self.step_scale(SCALE_STEP),
            Command::SpeedDown => self.step_scale(-SCALE_STEP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn step_scale(&mut self, delta: i32) {
        let next = self.pipeline.scale().step(delta);
        self.pipeline.set_scale(next);
    }

    /// Operator input (keyboard or remote panel)
    pub async fn on_input(&mut self, ev: InputEvent) {
        let Some(intent) = self.dispatcher.dispatch(self.pipeline.mode(), ev) else {
            return;
        };
        match self.pipeline.submit(IntentSource::Operator, intent).await {
            Ok(Outcome::Rejected(r)) => debug!("Operator intent rejected: {:?}", r),
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
    }

    pub async fn on_autonomy(&mut self, cmd: AutonomyCommand) {
        match self
            .pipeline
            .submit_scaled(IntentSource::Autonomy, cmd.intent, cmd.scale)
            .await
        {
            Ok(Outcome::Rejected(r)) => debug!("Autonomy intent rejected: {:?}", r),
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
    }

    pub fn on_sensor_data(&mut self, data: SensorData) {
        let (frame, obstacles, timestamp) = data.into_parts();
        self.telemetry.update_at(frame, obstacles, timestamp);
    }

    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            mode: self.pipeline.mode(),
            scale: self.pipeline.scale().percent(),
            profile: self.pipeline.profile(),
            port: self.pipeline.link().map(|l| l.port.clone()),
            last_frame: self.pipeline.last_sent().map(|v| frame::format_frame(&v)),
        }
    }

    /// One-line summary for the operator
    pub fn status_line(&self) -> String {
        let [m1, m2, m3] = self.dispatcher.sliders();
        let obstacles = match self.telemetry.current().and_then(|s| s.obstacles) {
            Some(o) if o.all_clear() => format!(
                "clear L{:.2}m C{:.2}m R{:.2}m",
                o.left.distance_m, o.center.distance_m, o.right.distance_m
            ),
            Some(o) => format!(
                "L{}{:.2}m C{}{:.2}m R{}{:.2}m",
                if o.left.blocked { "!" } else { " " },
                o.left.distance_m,
                if o.center.blocked { "!" } else { " " },
                o.center.distance_m,
                if o.right.blocked { "!" } else { " " },
                o.right.distance_m,
            ),
            None => "no sensor data".to_string(),
        };
        format!(
            "[{}] speed {} | direct {}/{}/{} ({:?}) | {}",
            self.pipeline.mode(),
            self.pipeline.scale(),
            m1,
            m2,
            m3,
            self.selected,
            obstacles
        )
    }
}

fn parse<T: serde::de::DeserializeOwned>(topic: &str, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice::<T>(payload) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Dropping malformed message on {}: {}", topic, e);
            None
        }
    }
}

pub async fn run(settings: Settings) -> Result<(), BoxError> {
    let provider: Arc<dyn LinkProvider> = if settings.dry_run {
        info!("Dry run: frames go to an in-memory loopback");
        Arc::new(Loopback::new())
    } else {
        Arc::new(SerialPortProvider::new(settings.port.clone()))
    };
    let channel = CommandChannel::new(provider)
        .with_baud_rate(settings.baud)
        .with_settle(settings.settle());
    let repeat_policy = if settings.suppress_repeats {
        RepeatPolicy::SuppressRepeats
    } else {
        RepeatPolicy::TransmitAll
    };
    let pipeline = Pipeline::new(channel)
        .with_profile(settings.profile)
        .with_scale(SpeedScale::new(settings.scale as i32))
        .with_repeat_policy(repeat_policy);
    let mut teleop = Teleop::new(pipeline);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_intent = session.declare_subscriber(TOPIC_AUTONOMY_INTENT).await?;
    let sub_telemetry = session.declare_subscriber(TOPIC_AUTONOMY_TELEMETRY).await?;
    let sub_remote = session.declare_subscriber(TOPIC_REMOTE_INPUT).await?;
    let pub_enable = session.declare_publisher(TOPIC_AUTONOMY_ENABLE).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    if settings.connect {
        if let Err(e) = teleop.connect().await {
            warn!("Starting disconnected: {}", e);
        }
    }

    info!(
        "Controls: WASD/arrows=move, Space=stop, C=connect, V=disconnect, E/Esc=emergency stop, \
         R=reset, M=autonomous, +/-=speed, 1-3 select motor, ,/. slide, G=GO, X=STOP, Q=quit"
    );

    enable_raw_mode()?;
    let result = async {
        let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
        let mut announced_autonomy = false;
        let mut last_status: Option<RuntimeStatus> = None;
        let mut last_line = String::new();

        'running: loop {
            tick.tick().await;

            // 1. Drain keyboard (press and repeat both count)
            while event::poll(Duration::ZERO)? {
                if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                    if kind == KeyEventKind::Release {
                        continue;
                    }
                    if teleop.on_key(code).await == Flow::Quit {
                        break 'running;
                    }
                }
            }

            // 2. Drain remote panel, autonomy intents and telemetry
            while let Ok(Some(sample)) = sub_remote.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(msg) = parse::<RemoteInput>(TOPIC_REMOTE_INPUT, &payload) {
                    teleop.on_input(msg.into()).await;
                }
            }
            while let Ok(Some(sample)) = sub_intent.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(cmd) = parse::<AutonomyCommand>(TOPIC_AUTONOMY_INTENT, &payload) {
                    teleop.on_autonomy(cmd).await;
                }
            }
            while let Ok(Some(sample)) = sub_telemetry.try_recv() {
                let payload = sample.payload().to_bytes();
                if let Some(data) = parse::<SensorData>(TOPIC_AUTONOMY_TELEMETRY, &payload) {
                    teleop.on_sensor_data(data);
                }
            }

            // 3. Manual idle timeout
            teleop.pipeline.tick(Instant::now());

            // 4. Tell the autonomy peer whether it owns the robot
            let autonomy = teleop.pipeline.mode() == ControlMode::Autonomous;
            if autonomy != announced_autonomy {
                let msg = serde_json::to_string(&AutonomyEnable { enabled: autonomy })?;
                pub_enable.put(msg).await?;
                announced_autonomy = autonomy;
            }

            // 5. Status heartbeat and operator line, on change only
            let status = teleop.status();
            if last_status.as_ref() != Some(&status) {
                pub_status.put(serde_json::to_string(&status)?).await?;
                last_status = Some(status);
            }
            let line = teleop.status_line();
            if line != last_line {
                info!("{}", line);
                last_line = line;
            }
        }

        // Leaving: make sure the peer stands down and the robot stops
        if announced_autonomy {
            let msg = serde_json::to_string(&AutonomyEnable { enabled: false })?;
            pub_enable.put(msg).await?;
        }
        Ok::<(), BoxError>(())
    }
    .await;

    teleop.pipeline.disconnect().await;
    disable_raw_mode()?;
    info!("Teleop stopped");
    result
}
