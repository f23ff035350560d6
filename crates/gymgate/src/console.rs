//! Access Console
//!
//! Single consumer for access requests. The serial reader thread and the
//! keypad line reader both send [`AccessRequest`]s into one channel; the
//! console drains it on its own task and writes each outcome.

use std::future::Future;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::access::{AccessController, AccessOutcome};

/// Where an identifier was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    Serial,
    Keypad,
}

/// An identifier waiting for an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub source: AccessSource,
    pub code: String,
}

impl AccessRequest {
    pub fn serial(code: impl Into<String>) -> Self {
        Self {
            source: AccessSource::Serial,
            code: code.into(),
        }
    }

    pub fn keypad(code: impl Into<String>) -> Self {
        Self {
            source: AccessSource::Keypad,
            code: code.into(),
        }
    }
}

/// Drains access requests and renders decisions
pub struct AccessConsole<W> {
    controller: AccessController,
    out: W,
    banner: String,
}

impl<W: Write> AccessConsole<W> {
    pub fn new(controller: AccessController, out: W, gym_name: &str) -> Self {
        Self {
            controller,
            out,
            banner: format!("{} - Access Control", gym_name),
        }
    }

    /// Decide one request and write the result
    ///
    /// Blank keypad lines are skipped. Store failures are logged and yield
    /// `None`; the console keeps running.
    pub fn handle(&mut self, request: &AccessRequest) -> Option<AccessOutcome> {
        if request.code.trim().is_empty() {
            return None;
        }
        if request.source == AccessSource::Serial {
            tracing::info!("Serial code received: {}", request.code);
        }

        match self.controller.check_access(&request.code) {
            Ok(outcome) => {
                if let Err(e) = writeln!(self.out, "\n{}\n", outcome).and_then(|_| self.out.flush()) {
                    tracing::warn!("Failed to write access result: {}", e);
                }
                Some(outcome)
            }
            Err(e) => {
                tracing::error!("Access check failed for {}: {}", request.code.trim(), e);
                None
            }
        }
    }

    /// Run until the channel closes or `shutdown` resolves
    ///
    /// Returns the number of decisions rendered.
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<AccessRequest>,
        shutdown: impl Future<Output = ()>,
    ) -> usize {
        if let Err(e) = writeln!(self.out, "{}", self.banner) {
            tracing::warn!("Failed to write console banner: {}", e);
        }
        tokio::pin!(shutdown);

        let mut handled = 0;
        loop {
            tokio::select! {
                request = rx.recv() => match request {
                    Some(request) => {
                        if self.handle(&request).is_some() {
                            handled += 1;
                        }
                    }
                    None => {
                        tracing::debug!("Access request channel closed");
                        break;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        handled
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}
