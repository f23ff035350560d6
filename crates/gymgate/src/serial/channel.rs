//! Serial channel abstraction
//!
//! The pipeline talks to hardware through [`SerialOpener`] and
//! [`SerialChannel`] so the reader loop can run against a scripted channel in
//! tests. Closing a channel means dropping it.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use super::DeviceError;

/// An open serial connection owned by the reader thread
pub trait SerialChannel: Send {
    /// Read one byte, waiting at most the configured timeout
    ///
    /// Returns `Ok(None)` when the timeout elapsed without data.
    fn read_byte(&mut self) -> Result<Option<u8>, DeviceError>;

    /// Whether the underlying device is still open
    fn is_open(&self) -> bool {
        true
    }
}

/// Opens serial channels
pub trait SerialOpener: Send + Sync {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialChannel>, DeviceError>;
}

/// Opens real ports through the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialOpener;

impl SerialOpener for SystemSerialOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialChannel>, DeviceError> {
        let inner = serialport::new(port, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| DeviceError::Open {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(SystemSerialChannel { inner }))
    }
}

struct SystemSerialChannel {
    inner: Box<dyn serialport::SerialPort>,
}

impl SerialChannel for SystemSerialChannel {
    fn read_byte(&mut self) -> Result<Option<u8>, DeviceError> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(e) => Err(DeviceError::Read(e.to_string())),
        }
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>, DeviceError> {
    let ports = serialport::available_ports().map_err(|e| DeviceError::Enumerate(e.to_string()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
