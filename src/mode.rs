// Control mode arbitration: which source may drive the robot right now
//
// Disconnected -> ManualIdle <-> ManualActive
// ManualIdle/ManualActive <-> Autonomous
// any connected mode -> EmergencyStopped -> ManualIdle (explicit reset only)
// any -> Disconnected

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::MANUAL_IDLE_TIMEOUT;
use crate::motor::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Disconnected,
    ManualIdle,
    ManualActive,
    Autonomous,
    EmergencyStopped,
}

impl ControlMode {
    pub fn is_manual(&self) -> bool {
        matches!(self, ControlMode::ManualIdle | ControlMode::ManualActive)
    }

    pub fn is_connected(&self) -> bool {
        *self != ControlMode::Disconnected
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControlMode::Disconnected => "DISCONNECTED",
            ControlMode::ManualIdle => "MANUAL (idle)",
            ControlMode::ManualActive => "MANUAL (active)",
            ControlMode::Autonomous => "AUTONOMOUS",
            ControlMode::EmergencyStopped => "EMERGENCY STOP",
        };
        f.write_str(label)
    }
}

/// Where an intent came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    /// Keyboard, buttons, direct-motor panel
    Operator,
    /// External autonomy peer
    Autonomy,
}

/// Why an intent was not let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotConnected,
    EmergencyStopped,
    /// Source does not own the robot in the current mode
    WrongSource,
}

pub struct ControlModeMachine {
    mode: ControlMode,
    last_intent_at: Instant,
    idle_timeout: Duration,
}

impl Default for ControlModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModeMachine {
    pub fn new() -> Self {
        Self::with_idle_timeout(MANUAL_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            mode: ControlMode::Disconnected,
            last_intent_at: Instant::now(),
            idle_timeout,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    fn transition(&mut self, next: ControlMode) {
        if self.mode != next {
            info!("Mode: {} -> {}", self.mode, next);
            self.mode = next;
        }
    }

    /// A link was opened
    pub fn on_connected(&mut self) {
        if self.mode == ControlMode::Disconnected {
            self.transition(ControlMode::ManualIdle);
        }
    }

    /// The link is gone (explicitly or not)
    pub fn on_disconnected(&mut self) {
        self.transition(ControlMode::Disconnected);
    }

    /// Enter or leave autonomous mode. Returns whether the mode changed.
    ///
    /// Ignored while disconnected or emergency-stopped.
    pub fn set_autonomous(&mut self, enabled: bool) -> bool {
        let next = match (self.mode, enabled) {
            (m, true) if m.is_manual() => ControlMode::Autonomous,
            (ControlMode::Autonomous, false) => ControlMode::ManualIdle,
            (m, _) => {
                debug!("Autonomous toggle ({}) ignored in {}", enabled, m);
                return false;
            }
        };
        self.transition(next);
        true
    }

    /// Latch the emergency stop. Returns whether a stop frame should be sent
    /// (false when there is no link to send it on).
    pub fn emergency_stop(&mut self) -> bool {
        if !self.mode.is_connected() {
            warn!("Emergency stop while disconnected: nothing to stop");
            return false;
        }
        self.transition(ControlMode::EmergencyStopped);
        true
    }

    /// Clear a latched emergency stop. Returns whether the mode changed.
    pub fn reset(&mut self) -> bool {
        if self.mode != ControlMode::EmergencyStopped {
            return false;
        }
        self.transition(ControlMode::ManualIdle);
        true
    }

    /// Gate an intent against the current mode, updating manual activity
    pub fn admit(&mut self, source: IntentSource, intent: &Intent) -> Result<(), Rejection> {
        self.admit_at(source, intent, Instant::now())
    }

    pub fn admit_at(
        &mut self,
        source: IntentSource,
        intent: &Intent,
        now: Instant,
    ) -> Result<(), Rejection> {
        match (self.mode, source) {
            (ControlMode::Disconnected, _) => Err(Rejection::NotConnected),
            (ControlMode::EmergencyStopped, _) => Err(Rejection::EmergencyStopped),
            (ControlMode::Autonomous, IntentSource::Autonomy) => Ok(()),
            (ControlMode::Autonomous, IntentSource::Operator) => Err(Rejection::WrongSource),
            (_, IntentSource::Autonomy) => Err(Rejection::WrongSource),
            (_, IntentSource::Operator) => {
                if intent.is_stop() {
                    self.transition(ControlMode::ManualIdle);
                } else {
                    self.last_intent_at = now;
                    self.transition(ControlMode::ManualActive);
                }
                Ok(())
            }
        }
    }

    /// Drop back to ManualIdle once manual input has gone quiet
    pub fn expire_idle(&mut self, now: Instant) {
        if self.mode == ControlMode::ManualActive
            && now.saturating_duration_since(self.last_intent_at) > self.idle_timeout
        {
            self.transition(ControlMode::ManualIdle);
        }
    }
}
