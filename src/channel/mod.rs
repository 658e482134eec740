// Command channel: serial link lifecycle and frame transmission
//
// The channel exclusively owns the one open link. Every write goes through a
// FIFO async mutex, so frames leave in the order they were issued and never
// interleave; disconnect takes the same lock and therefore waits for any
// in-flight write to settle before the link is released.

pub mod frame;
pub mod link;

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{BAUD_RATE, LINK_SETTLE};
use crate::error::{ConnectError, SendError};
use crate::motor::MotorVector;

pub use link::{
    FirstPortSelector, LinkEvent, LinkProvider, Loopback, PortSelector, PromptSelector, Refusal,
    SerialLink, SerialPortProvider,
};

/// The open link; never cloned or handed out
struct ConnectionHandle {
    link: Box<dyn SerialLink>,
}

impl ConnectionHandle {
    fn release(mut self) {
        let name = self.link.name().to_string();
        match self.link.close() {
            Ok(()) => info!("Closed serial link {}", name),
            Err(e) => warn!("Closing serial link {} failed: {}", name, e),
        }
    }
}

/// Description of a successfully opened link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub port: String,
    pub baud_rate: u32,
}

pub struct CommandChannel {
    provider: Arc<dyn LinkProvider>,
    baud_rate: u32,
    settle: Duration,
    handle: Arc<Mutex<Option<ConnectionHandle>>>,
}

impl CommandChannel {
    /// Channel at the default baud rate and settle delay
    pub fn new(provider: Arc<dyn LinkProvider>) -> Self {
        Self {
            provider,
            baud_rate: BAUD_RATE,
            settle: LINK_SETTLE,
            handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Delay after opening before the link is reported usable
    /// (the board resets when the port opens)
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Request and open a link. An already open link is released first.
    pub async fn connect(&self) -> Result<LinkInfo, ConnectError> {
        // Held for the whole open so no send can slip in between
        let mut slot = self.handle.lock().await;
        if let Some(old) = slot.take() {
            warn!("Replacing open serial link");
            old.release();
        }

        let provider = Arc::clone(&self.provider);
        let baud_rate = self.baud_rate;
        // Device selection may prompt and opening blocks
        let link = tokio::task::spawn_blocking(move || provider.open_link(baud_rate))
            .await
            .map_err(|e| ConnectError::OpenFailed {
                port: "<unknown>".into(),
                source: io::Error::other(e),
            })??;

        if !self.settle.is_zero() {
            info!("Waiting {:?} for the board to settle", self.settle);
            tokio::time::sleep(self.settle).await;
        }

        let info = LinkInfo {
            port: link.name().to_string(),
            baud_rate,
        };
        info!("Connected to {} at {} baud", info.port, info.baud_rate);
        *slot = Some(ConnectionHandle { link });
        Ok(info)
    }

    /// Encode and write one frame. Waits behind any write already in flight.
    pub async fn send(&self, v: MotorVector) -> Result<(), SendError> {
        let frame = frame::encode(&v);
        let mut slot = Arc::clone(&self.handle).lock_owned().await;
        if slot.is_none() {
            return Err(SendError::NotConnected);
        }

        // The guard moves into the blocking task, so the lock is held until
        // the write has completed or failed
        let written = tokio::task::spawn_blocking(move || match slot.as_mut() {
            Some(handle) => handle.link.write_frame(&frame),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        })
        .await
        .map_err(io::Error::other)?;

        written?;
        debug!("Sent {}", v);
        Ok(())
    }

    /// Release the link. Idempotent; close failures are only logged.
    pub async fn disconnect(&self) {
        let mut slot = self.handle.lock().await;
        match slot.take() {
            Some(handle) => handle.release(),
            None => debug!("Disconnect with no open link"),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }
}
