//! Node status indicator.

use serde::Serialize;
use tokio::sync::watch;

use crate::error_handling::RequestFailure;

pub const TEXT_NO_RESPONSE: &str = "no response from server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    Blue,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    Dot,
    Ring,
}

/// What a node currently shows; the default (all empty) is "cleared".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<StatusFill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<StatusShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl NodeStatus {
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Blue dot with `text`, shown while a request is in flight.
    pub fn busy(text: &str) -> Self {
        Self {
            fill: Some(StatusFill::Blue),
            shape: Some(StatusShape::Dot),
            text: Some(text.to_string()),
        }
    }

    /// Red ring with `text`.
    pub fn error(text: &str) -> Self {
        Self {
            fill: Some(StatusFill::Red),
            shape: Some(StatusShape::Ring),
            text: Some(text.to_string()),
        }
    }

    /// Status for a failed request: timeouts read "no response from server",
    /// anything else shows the error code.
    pub fn for_failure(failure: &RequestFailure) -> Self {
        if failure.error.is_timeout() {
            Self::error(TEXT_NO_RESPONSE)
        } else {
            Self::error(failure.status_code())
        }
    }

    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

/// Publishes a node's status; any number of subscribers see the latest value.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    sender: watch::Sender<NodeStatus>,
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(NodeStatus::cleared());
        Self { sender }
    }

    pub fn set(&self, status: NodeStatus) {
        self.sender.send_replace(status);
    }

    pub fn clear(&self) {
        self.set(NodeStatus::cleared());
    }

    pub fn current(&self) -> NodeStatus {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NodeStatus> {
        self.sender.subscribe()
    }
}
