//! Admin server state.

use std::sync::Arc;

use crate::error_handling::ProcessingStats;
use crate::nodes::NodeRegistry;

/// Shared state for the admin server
#[derive(Clone)]
pub struct AdminState {
    pub registry: NodeRegistry,
    pub stats: Arc<ProcessingStats>,
}

impl AdminState {
    pub fn new(registry: NodeRegistry, stats: Arc<ProcessingStats>) -> Self {
        Self { registry, stats }
    }
}
