// Error types for the command pipeline

use std::io;

/// Failures while acquiring and opening the serial link
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Serial ports are not supported on this host: {0}")]
    Unsupported(String),

    #[error("No serial devices found")]
    NoDevice,

    #[error("Device selection cancelled")]
    UserCancelled,

    #[error("Failed to open {port}: {source}")]
    OpenFailed {
        port: String,
        #[source]
        source: io::Error,
    },
}

/// Failures while transmitting a frame
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Not connected")]
    NotConnected,

    #[error("Write failed: {0}")]
    WriteFailed(#[from] io::Error),
}

// errno values a serial write returns once the device is unplugged
#[cfg(unix)]
const LOST_DEVICE_CODES: &[i32] = &[
    5,  // EIO
    6,  // ENXIO
    19, // ENODEV
];

// ERROR_BAD_COMMAND, ERROR_GEN_FAILURE, ERROR_OPERATION_ABORTED, ERROR_DEVICE_NOT_CONNECTED
#[cfg(windows)]
const LOST_DEVICE_CODES: &[i32] = &[22, 31, 995, 1167];

#[cfg(not(any(unix, windows)))]
const LOST_DEVICE_CODES: &[i32] = &[];

impl SendError {
    /// Whether the failure means the device went away rather than a single bad write
    ///
    /// serialport reports a port error without hang-up as `Other`, and raw
    /// write failures on a vanished device carry only the OS code.
    pub fn is_link_lost(&self) -> bool {
        match self {
            SendError::WriteFailed(e) => {
                if let Some(code) = e.raw_os_error() {
                    if LOST_DEVICE_CODES.contains(&code) {
                        return true;
                    }
                }
                matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe
                        | io::ErrorKind::NotConnected
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::UnexpectedEof
                        | io::ErrorKind::Other
                )
            }
            SendError::NotConnected => false,
        }
    }
}

/// Anything the pipeline surfaces to the operator
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Serial link closed unexpectedly")]
    ChannelClosedUnexpectedly,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_lost_classification() {
        let lost = SendError::WriteFailed(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(lost.is_link_lost());

        let timeout = SendError::WriteFailed(io::Error::from(io::ErrorKind::TimedOut));
        assert!(!timeout.is_link_lost());

        assert!(!SendError::NotConnected.is_link_lost());
    }

    #[test]
    fn test_port_error_without_hangup_is_lost() {
        let err = SendError::WriteFailed(io::Error::other("EIO"));
        assert!(err.is_link_lost());
    }

    #[cfg(unix)]
    #[test]
    fn test_unplugged_device_errno_is_lost() {
        for errno in [5, 6, 19] {
            let err = SendError::WriteFailed(io::Error::from_raw_os_error(errno));
            assert!(err.is_link_lost(), "errno {}", errno);
        }
        // EAGAIN is a transient failure
        assert!(!SendError::WriteFailed(io::Error::from_raw_os_error(11)).is_link_lost());
    }
}
