//! Serial keypad ingestion
//!
//! Reads member codes from a serial keypad or scanner. The keypad frames
//! each code as `*<digits>#`.
//!
//! The pipeline runs a blocking reader thread for the port and hands
//! completed codes to a [`CodeHandler`], normally a channel drained by the
//! access console.

mod channel;
mod framing;
mod pipeline;

pub use channel::{SerialChannel, SerialOpener, SystemSerialOpener, available_ports};
pub use framing::{CodeDecoder, END_MARKER, START_MARKER};
pub use pipeline::{CodeHandler, SerialPipeline};

/// Serial device failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("No serial port configured")]
    NotConfigured,

    #[error("Serial reader already running")]
    AlreadyRunning,

    #[error("Failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Failed to spawn reader thread: {0}")]
    Spawn(String),

    #[error("Failed to list serial ports: {0}")]
    Enumerate(String),
}
