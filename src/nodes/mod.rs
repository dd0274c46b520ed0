//! Flow nodes built on the request engine.
//!
//! - [`DetectionNode`]: one detection request per input, guarded by a [`BusyGate`]
//! - [`VideoInputNode`]: timer-driven frame sampling
//!
//! [`NodeRegistry`] lets the admin endpoint find video-input nodes by id.

mod detection;
mod status;
mod video_input;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub use detection::{parse_vision, BusyGate, DetectionNode, DetectionOutput, STATUS_DETECTING};
pub use status::{NodeStatus, StatusFill, StatusHandle, StatusShape, TEXT_NO_RESPONSE};
pub use video_input::{build_sample_url, VideoInputNode, STATUS_NON_HTTP, STATUS_SAMPLING};

/// Video-input nodes addressable by id.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, Arc<VideoInputNode>>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under its id, replacing any node with the same id.
    pub fn register(&self, node: Arc<VideoInputNode>) {
        let mut nodes = self
            .nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        nodes.insert(node.id().to_string(), node);
    }

    pub fn get(&self, id: &str) -> Option<Arc<VideoInputNode>> {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Removes and closes the node registered under `id`.
    pub fn remove(&self, id: &str) -> Option<Arc<VideoInputNode>> {
        let removed = self
            .nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
        if let Some(node) = &removed {
            node.close();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered nodes whose timer is running.
    pub fn active_count(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|node| node.is_active())
            .count()
    }
}
