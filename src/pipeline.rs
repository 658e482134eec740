// Command pipeline: intent -> mode gate -> kinematics -> channel
//
// Owns the control mode machine and the command channel as one unit, so the
// connection state and the mode can never disagree.

use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::channel::{CommandChannel, LinkInfo};
use crate::error::{Error, Result};
use crate::mode::{ControlMode, ControlModeMachine, IntentSource, Rejection};
use crate::motor::{Intent, KinematicsProfile, MotorVector, SpeedScale};

/// What to do with a frame identical to the last one transmitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Send every intent, repeats included (key-repeat floods the link)
    #[default]
    TransmitAll,
    /// Skip a motor vector equal to the last one written
    SuppressRepeats,
}

/// Result of submitting one intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent(MotorVector),
    /// Same as the last frame and repeats are suppressed
    Suppressed(MotorVector),
    /// Gated by the current mode; nothing was resolved or sent
    Rejected(Rejection),
}

pub struct Pipeline {
    channel: CommandChannel,
    modes: ControlModeMachine,
    profile: KinematicsProfile,
    scale: SpeedScale,
    repeat_policy: RepeatPolicy,
    link: Option<LinkInfo>,
    last_sent: Option<MotorVector>,
}

impl Pipeline {
    pub fn new(channel: CommandChannel) -> Self {
        Self {
            channel,
            modes: ControlModeMachine::new(),
            profile: KinematicsProfile::default(),
            scale: SpeedScale::new(crate::config::DEFAULT_SPEED_SCALE as i32),
            repeat_policy: RepeatPolicy::default(),
            link: None,
            last_sent: None,
        }
    }

    pub fn with_profile(mut self, profile: KinematicsProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_scale(mut self, scale: SpeedScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_repeat_policy(mut self, policy: RepeatPolicy) -> Self {
        self.repeat_policy = policy;
        self
    }

    pub fn mode(&self) -> ControlMode {
        self.modes.mode()
    }

    pub fn scale(&self) -> SpeedScale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: SpeedScale) {
        if scale != self.scale {
            info!("Speed scale: {}", scale);
            self.scale = scale;
        }
    }

    pub fn profile(&self) -> KinematicsProfile {
        self.profile
    }

    pub fn link(&self) -> Option<&LinkInfo> {
        self.link.as_ref()
    }

    /// Last motor vector successfully written
    pub fn last_sent(&self) -> Option<MotorVector> {
        self.last_sent
    }

    /// Open the link. A no-op when already connected.
    pub async fn connect(&mut self) -> Result<LinkInfo> {
        if let Some(ref info) = self.link {
            debug!("Already connected to {}", info.port);
            return Ok(info.clone());
        }

        match self.channel.connect().await {
            Ok(info) => {
                self.link = Some(info.clone());
                self.last_sent = None;
                self.modes.on_connected();
                Ok(info)
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Stop the robot if possible, then release the link. Idempotent.
    pub async fn disconnect(&mut self) {
        if self.link.is_some() {
            if let Err(e) = self.channel.send(MotorVector::ZERO).await {
                warn!("Stop before disconnect failed: {}", e);
            }
        }
        self.release().await;
    }

    /// The transport reported the link gone: release without another frame
    pub async fn link_lost(&mut self) {
        error!("Serial link lost; treating as emergency stop");
        self.release().await;
    }

    async fn release(&mut self) {
        self.channel.disconnect().await;
        self.link = None;
        self.last_sent = None;
        self.modes.on_disconnected();
    }

    /// Submit an intent at the current speed scale
    pub async fn submit(&mut self, source: IntentSource, intent: Intent) -> Result<Outcome> {
        self.submit_scaled(source, intent, None).await
    }

    /// Submit an intent, optionally overriding the speed scale for this one
    pub async fn submit_scaled(
        &mut self,
        source: IntentSource,
        intent: Intent,
        scale: Option<SpeedScale>,
    ) -> Result<Outcome> {
        if let Err(rejection) = self.modes.admit(source, &intent) {
            debug!("{:?} intent {:?} rejected: {:?}", source, intent, rejection);
            return Ok(Outcome::Rejected(rejection));
        }

        let v = self.profile.resolve(intent, scale.unwrap_or(self.scale));
        if self.repeat_policy == RepeatPolicy::SuppressRepeats && self.last_sent == Some(v) {
            debug!("Suppressed repeat {}", v);
            return Ok(Outcome::Suppressed(v));
        }

        self.transmit(v).await?;
        Ok(Outcome::Sent(v))
    }

    /// Latch the emergency stop and send a stop frame right away
    ///
    /// The stop frame bypasses the repeat policy. A no-op while disconnected.
    pub async fn emergency_stop(&mut self) -> Result<()> {
        if !self.modes.emergency_stop() {
            return Ok(());
        }
        warn!("EMERGENCY STOP");
        self.transmit(MotorVector::ZERO).await
    }

    /// Clear a latched emergency stop
    pub fn reset(&mut self) -> bool {
        self.modes.reset()
    }

    pub fn set_autonomous(&mut self, enabled: bool) -> bool {
        self.modes.set_autonomous(enabled)
    }

    /// Periodic housekeeping (manual idle timeout)
    pub fn tick(&mut self, now: Instant) {
        self.modes.expire_idle(now);
    }

    async fn transmit(&mut self, v: MotorVector) -> Result<()> {
        match self.channel.send(v).await {
            Ok(()) => {
                self.last_sent = Some(v);
                Ok(())
            }
            Err(e) if e.is_link_lost() => {
                self.link_lost().await;
                Err(Error::ChannelClosedUnexpectedly)
            }
            Err(e) => {
                // The board's state is unknown now; never suppress the next frame
                self.last_sent = None;
                error!("Send failed: {}", e);
                Err(e.into())
            }
        }
    }
}
