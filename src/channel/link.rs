// Transport seam for the command channel
//
// A LinkProvider plays the role of the host's "request device + open" step,
// a SerialLink is the opened port. The real implementation sits on the
// serialport crate; Loopback is an in-memory stand-in for dry runs and tests.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConnectError;

/// Write timeout on the real port
pub const WRITE_TIMEOUT_MS: u64 = 1000;

/// An open, exclusively owned serial link
pub trait SerialLink: Send {
    /// Port name, for logs and status
    fn name(&self) -> &str;

    /// Write one complete frame (blocking until it is handed to the driver)
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Release the underlying device
    fn close(&mut self) -> io::Result<()>;
}

/// Source of serial links (device selection + open)
pub trait LinkProvider: Send + Sync {
    fn open_link(&self, baud_rate: u32) -> Result<Box<dyn SerialLink>, ConnectError>;
}

/// Picks one port out of the enumerated list; None means the user declined
pub trait PortSelector: Send + Sync {
    fn select(&self, ports: &[String]) -> Option<usize>;
}

/// Always takes the first enumerated port
pub struct FirstPortSelector;

impl PortSelector for FirstPortSelector {
    fn select(&self, ports: &[String]) -> Option<usize> {
        if ports.is_empty() { None } else { Some(0) }
    }
}

/// Asks on stdin which port to use
pub struct PromptSelector;

impl PortSelector for PromptSelector {
    fn select(&self, ports: &[String]) -> Option<usize> {
        println!("Available serial ports:");
        for (i, port) in ports.iter().enumerate() {
            println!("  [{}] {}", i + 1, port);
        }
        print!("Select port [1-{}] (empty to cancel): ", ports.len());
        if io::stdout().flush().is_err() {
            return None;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return None;
        }
        parse_selection(&input, ports.len())
    }
}

/// Parse a 1-based port choice; anything else cancels
fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}

/// Opens real serial ports (8N1, no flow control)
pub struct SerialPortProvider {
    port: Option<String>,
    selector: Box<dyn PortSelector>,
}

impl SerialPortProvider {
    /// Use `port` when given, otherwise enumerate and prompt
    pub fn new(port: Option<String>) -> Self {
        Self::with_selector(port, Box::new(PromptSelector))
    }

    pub fn with_selector(port: Option<String>, selector: Box<dyn PortSelector>) -> Self {
        Self { port, selector }
    }

    fn choose_port(&self) -> Result<String, ConnectError> {
        if let Some(ref port) = self.port {
            return Ok(port.clone());
        }

        let ports: Vec<String> = serialport::available_ports()
            .map_err(|e| ConnectError::Unsupported(e.to_string()))?
            .into_iter()
            .map(|p| p.port_name)
            .collect();
        debug!("Enumerated serial ports: {:?}", ports);

        if ports.is_empty() {
            return Err(ConnectError::NoDevice);
        }

        let idx = self
            .selector
            .select(&ports)
            .ok_or(ConnectError::UserCancelled)?;
        ports.get(idx).cloned().ok_or(ConnectError::UserCancelled)
    }
}

impl LinkProvider for SerialPortProvider {
    fn open_link(&self, baud_rate: u32) -> Result<Box<dyn SerialLink>, ConnectError> {
        let name = self.choose_port()?;

        let port = serialport::new(&name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(WRITE_TIMEOUT_MS))
            .open()
            .map_err(|e| ConnectError::OpenFailed {
                port: name.clone(),
                source: e.into(),
            })?;

        info!("Opened serial port {} at {} baud", name, baud_rate);
        Ok(Box::new(SerialPortLink {
            name,
            port: Some(port),
        }))
    }
}

struct SerialPortLink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink for SerialPortLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        port.write_all(frame)?;
        port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // serialport closes the descriptor on drop
        match self.port.take() {
            Some(port) => {
                drop(port);
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }
}

/// Observable events on a loopback link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened { baud_rate: u32 },
    Frame(String),
    Closed,
}

/// How a loopback provider refuses to connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Unsupported,
    NoDevice,
    UserCancelled,
    OpenFailed,
}

/// Failure injected into loopback writes (io::Error is not Clone)
#[derive(Debug, Clone, Copy)]
enum WriteFailure {
    Kind(io::ErrorKind),
    Os(i32),
}

impl WriteFailure {
    fn to_error(self) -> io::Error {
        match self {
            WriteFailure::Kind(kind) => io::Error::from(kind),
            WriteFailure::Os(code) => io::Error::from_raw_os_error(code),
        }
    }
}

#[derive(Default)]
struct LoopbackState {
    events: Vec<LinkEvent>,
    write_delay: Duration,
    fail_writes: Option<WriteFailure>,
    refusal: Option<Refusal>,
}

/// In-memory link that records every frame instead of driving hardware
///
/// Clones share state, so a test can keep one copy and hand another to the
/// channel.
#[derive(Clone, Default)]
pub struct Loopback {
    state: Arc<Mutex<LoopbackState>>,
}

impl Loopback {
    pub const PORT_NAME: &'static str = "loopback";

    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write take this long (simulates a slow link)
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.lock().write_delay = delay;
        self
    }

    /// Fail all subsequent writes with the given error kind
    pub fn fail_writes_with(&self, kind: io::ErrorKind) {
        self.lock().fail_writes = Some(WriteFailure::Kind(kind));
    }

    /// Fail all subsequent writes with a raw OS error code
    pub fn fail_writes_with_os_error(&self, code: i32) {
        self.lock().fail_writes = Some(WriteFailure::Os(code));
    }

    /// Refuse all subsequent connection attempts
    pub fn refuse(&self, refusal: Refusal) {
        self.lock().refusal = Some(refusal);
    }

    pub fn events(&self) -> Vec<LinkEvent> {
        self.lock().events.clone()
    }

    /// Frames written so far, in order
    pub fn frames(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Frame(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        // A panicking test thread must not hide the recorded events
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LinkProvider for Loopback {
    fn open_link(&self, baud_rate: u32) -> Result<Box<dyn SerialLink>, ConnectError> {
        let mut state = self.lock();
        match state.refusal {
            Some(Refusal::Unsupported) => {
                return Err(ConnectError::Unsupported("loopback refused".into()));
            }
            Some(Refusal::NoDevice) => return Err(ConnectError::NoDevice),
            Some(Refusal::UserCancelled) => return Err(ConnectError::UserCancelled),
            Some(Refusal::OpenFailed) => {
                return Err(ConnectError::OpenFailed {
                    port: Self::PORT_NAME.into(),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            None => {}
        }

        state.events.push(LinkEvent::Opened { baud_rate });
        Ok(Box::new(LoopbackLink {
            loopback: self.clone(),
            open: true,
        }))
    }
}

struct LoopbackLink {
    loopback: Loopback,
    open: bool,
}

impl SerialLink for LoopbackLink {
    fn name(&self) -> &str {
        Loopback::PORT_NAME
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }

        let (delay, fail) = {
            let state = self.loopback.lock();
            (state.write_delay, state.fail_writes)
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if let Some(failure) = fail {
            return Err(failure.to_error());
        }

        // Recorded as a whole once the write has "completed"
        let text = String::from_utf8_lossy(frame).into_owned();
        debug!("loopback frame: {:?}", text);
        self.loopback.lock().events.push(LinkEvent::Frame(text));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        self.loopback.lock().events.push(LinkEvent::Closed);
        Ok(())
    }
}
