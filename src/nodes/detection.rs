//! Detection node.
//!
//! Posts each input to the detection backend and forwards
//! `{ image, result }`: the response body plus the parsed `vision` header.
//! While the backend reports itself busy, new inputs are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{DetectionSettings, HEADER_BUSY, HEADER_VISION};
use crate::error_handling::{InfoType, NodeError, ProcessingStats, RequestFailure, WarningType};
use crate::fetch::{RequestEngine, RequestMessage};
use crate::nodes::status::{NodeStatus, StatusHandle, TEXT_NO_RESPONSE};

pub const STATUS_DETECTING: &str = "detecting";

static PROCESS_GATE: Lazy<Arc<BusyGate>> = Lazy::new(|| Arc::new(BusyGate::new()));

/// Best-effort flag set while the backend reports itself busy.
///
/// Reads and writes are unsynchronized with the requests they guard: a request
/// admitted while the gate is clear may overlap one that is about to set it.
#[derive(Debug, Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate shared by every detection node in this process.
    pub fn process_wide() -> Arc<BusyGate> {
        Arc::clone(&PROCESS_GATE)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn set(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.set(false);
    }
}

/// Result forwarded for one detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionOutput {
    /// Response body as text
    pub image: String,
    /// Parsed `vision` header; `{}` when missing or unparsable
    pub result: Value,
}

/// A detection node bound to one backend URL.
#[derive(Debug)]
pub struct DetectionNode {
    engine: RequestEngine,
    settings: DetectionSettings,
    url: String,
    gate: Arc<BusyGate>,
    status: StatusHandle,
}

impl DetectionNode {
    pub fn new(
        engine: RequestEngine,
        settings: DetectionSettings,
        url: impl Into<String>,
        gate: Arc<BusyGate>,
    ) -> Self {
        Self {
            engine,
            settings,
            url: url.into(),
            gate,
            status: StatusHandle::new(),
        }
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    pub fn gate(&self) -> &Arc<BusyGate> {
        &self.gate
    }

    /// Handles one input message.
    ///
    /// Returns `Ok(None)` when nothing is forwarded: the gate was set (no
    /// request is sent) or the backend answered busy. A failed request is
    /// terminal for this input and is not retried.
    pub async fn handle(&self, message: RequestMessage) -> Result<Option<DetectionOutput>, NodeError> {
        if self.gate.is_busy() {
            log::debug!("Detection backend busy, dropping input");
            self.engine.stats().increment_info(InfoType::BusyDrop);
            return Ok(None);
        }

        self.status.set(NodeStatus::busy(STATUS_DETECTING));
        match self.detect(&message).await {
            Ok(output) => {
                self.status.clear();
                Ok(output)
            }
            Err(failure) => {
                if failure.error.is_timeout() {
                    log::error!("{} ({})", TEXT_NO_RESPONSE, failure.status_code());
                } else {
                    log::error!("{}", failure);
                }
                self.status.set(NodeStatus::for_failure(&failure));
                Err(failure.into())
            }
        }
    }

    async fn detect(&self, message: &RequestMessage) -> Result<Option<DetectionOutput>, RequestFailure> {
        let mut request = self.engine.prepare(Method::POST, &self.url, message)?;
        request.set_header("modelName", self.settings.model_name.clone());
        request.set_header("showResult", self.settings.show_result.to_string());

        let raw = self.engine.execute(&request).await?;
        // Cleared before this response's own busy flag is read.
        self.gate.clear();

        let envelope = self.engine.complete(raw);
        let busy = envelope
            .header(HEADER_BUSY)
            .is_some_and(|value| is_busy_flag(&value));
        self.gate.set(busy);
        if busy {
            log::debug!("Detection backend reported busy");
            self.engine.stats().increment_info(InfoType::BackendBusy);
            return Ok(None);
        }

        let vision = envelope.header(HEADER_VISION).unwrap_or_default();
        let result = parse_vision(&vision, self.engine.stats());
        Ok(Some(DetectionOutput {
            image: envelope.payload,
            result,
        }))
    }

    /// Clears the status indicator.
    pub fn close(&self) {
        self.status.clear();
    }
}

/// `busy` header value meaning "busy": numerically equal to 1.
fn is_busy_flag(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(|n| n == 1.0)
}

/// Parses the single-quote tolerant `vision` header.
///
/// Anything that is not JSON after quote normalization yields `{}` and a warning.
pub fn parse_vision(raw: &str, stats: &ProcessingStats) -> Value {
    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str::<Value>(&normalized) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("JSON parse error: {}", e);
            stats.increment_warning(WarningType::VisionParseError);
            Value::Object(Map::new())
        }
    }
}
