//! Serial reader pipeline
//!
//! Owns a dedicated reader thread for the keypad port. The thread decodes
//! framed codes and hands each one to the registered [`CodeHandler`]. The
//! `running` flag is the single source of truth for whether the loop is
//! live; `stop` clears it and joins the thread, which drops (closes) the port.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;

use super::channel::{SerialChannel, SerialOpener};
use super::framing::CodeDecoder;
use super::DeviceError;
use crate::config::SerialSettings;

/// Upper bound on a single backoff sleep so `stop` is noticed promptly
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Receives decoded codes on the reader thread
///
/// Calls are sequential and in arrival order. Implementations should hand
/// the code off (for example through a channel) rather than touch
/// consumer-owned state directly.
pub trait CodeHandler: Send + Sync + 'static {
    fn on_code(&self, code: String);
}

impl<F> CodeHandler for F
where
    F: Fn(String) + Send + Sync + 'static,
{
    fn on_code(&self, code: String) {
        self(code)
    }
}

impl CodeHandler for UnboundedSender<String> {
    fn on_code(&self, code: String) {
        if let Err(e) = self.send(code) {
            tracing::debug!("Dropping serial code {}, receiver closed", e.0);
        }
    }
}

/// Background serial reader with start/stop lifecycle
pub struct SerialPipeline {
    settings: RwLock<SerialSettings>,
    opener: Arc<dyn SerialOpener>,
    handler: Arc<dyn CodeHandler>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialPipeline {
    pub fn new(
        settings: SerialSettings,
        opener: Arc<dyn SerialOpener>,
        handler: impl CodeHandler,
    ) -> Self {
        Self {
            settings: RwLock::new(settings),
            opener,
            handler: Arc::new(handler),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current connection settings
    pub fn settings(&self) -> SerialSettings {
        self.settings.read().clone()
    }

    /// Open the configured port and spawn the reader thread
    ///
    /// Fails without side effects when already running, when no port is
    /// configured, or when the port cannot be opened.
    pub fn start(&self) -> Result<(), DeviceError> {
        let mut worker = self.worker.lock();
        if self.is_running() {
            return Err(DeviceError::AlreadyRunning);
        }

        let settings = self.settings();
        let port = settings
            .port
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(DeviceError::NotConfigured)?;

        // Reap a reader that exited on its own
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }

        let channel = self
            .opener
            .open(&port, settings.baud_rate, settings.read_timeout)
            .inspect_err(|e| tracing::warn!("Error starting serial: {}", e))?;

        self.running.store(true, Ordering::Release);

        let reader = Reader {
            port: port.clone(),
            channel,
            decoder: CodeDecoder::new(),
            handler: self.handler.clone(),
            running: self.running.clone(),
            idle_backoff: settings.idle_backoff,
            error_backoff: settings.error_backoff,
        };

        let handle = thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || reader.run())
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                DeviceError::Spawn(e.to_string())
            })?;

        *worker = Some(handle);
        tracing::info!("Serial reader started on {} at {} baud", port, settings.baud_rate);
        Ok(())
    }

    /// Stop the reader thread and close the port
    ///
    /// Safe to call when not running. Returns once the thread has exited,
    /// which takes at most one read timeout.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        let was_running = self.running.swap(false, Ordering::AcqRel);

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                tracing::warn!("Serial reader thread panicked");
            }
        }

        if was_running {
            tracing::info!("Serial reader stopped");
        }
    }

    /// Switch to a new port or baud rate and reconnect
    pub fn reconfigure(&self, port: Option<String>, baud_rate: u32) -> Result<(), DeviceError> {
        self.stop();
        {
            let mut settings = self.settings.write();
            settings.port = port.filter(|p| !p.trim().is_empty());
            settings.baud_rate = baud_rate;
        }
        self.start()
    }
}

impl Drop for SerialPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the reader thread
struct Reader {
    port: String,
    channel: Box<dyn SerialChannel>,
    decoder: CodeDecoder,
    handler: Arc<dyn CodeHandler>,
    running: Arc<AtomicBool>,
    idle_backoff: Duration,
    error_backoff: Duration,
}

/// Clears the running flag however the reader exits
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Reader {
    fn run(mut self) {
        let _guard = RunningGuard(self.running.clone());
        tracing::debug!("Serial reader listening on {}", self.port);

        while self.running.load(Ordering::Acquire) {
            if !self.channel.is_open() {
                self.pause(self.idle_backoff);
                continue;
            }

            match self.channel.read_byte() {
                Ok(Some(byte)) => {
                    if let Some(code) = self.decoder.push(char::from(byte)) {
                        tracing::debug!("Serial code received: {}", code);
                        self.handler.on_code(code);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Serial error on {}: {}", self.port, e);
                    self.pause(self.error_backoff);
                }
            }
        }

        tracing::debug!("Serial reader on {} exiting", self.port);
    }

    /// Sleep up to `total`, waking early once stopped
    fn pause(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(PAUSE_SLICE));
        }
    }
}
