//! Prometheus metrics handler.

use std::fmt::Write;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use strum::IntoEnumIterator;

use super::super::types::AdminState;
use crate::error_handling::{ErrorType, InfoType, WarningType};

/// Prometheus-compatible counters from the shared processing statistics
pub async fn metrics_handler(State(state): State<AdminState>) -> Response {
    let stats = &state.stats;
    let mut body = String::new();

    let _ = writeln!(body, "# HELP vision_bridge_errors_total Failed requests by category");
    let _ = writeln!(body, "# TYPE vision_bridge_errors_total counter");
    for error in ErrorType::iter() {
        let _ = writeln!(
            body,
            "vision_bridge_errors_total{{type=\"{:?}\"}} {}",
            error,
            stats.get_error_count(error)
        );
    }

    let _ = writeln!(body, "\n# HELP vision_bridge_warnings_total Locally recovered problems by category");
    let _ = writeln!(body, "# TYPE vision_bridge_warnings_total counter");
    for warning in WarningType::iter() {
        let _ = writeln!(
            body,
            "vision_bridge_warnings_total{{type=\"{:?}\"}} {}",
            warning,
            stats.get_warning_count(warning)
        );
    }

    let _ = writeln!(body, "\n# HELP vision_bridge_events_total Informational events by category");
    let _ = writeln!(body, "# TYPE vision_bridge_events_total counter");
    for info in InfoType::iter() {
        let _ = writeln!(
            body,
            "vision_bridge_events_total{{type=\"{:?}\"}} {}",
            info,
            stats.get_info_count(info)
        );
    }

    let _ = writeln!(
        body,
        "\n# HELP vision_bridge_active_pollers Video-input nodes with a running timer"
    );
    let _ = writeln!(body, "# TYPE vision_bridge_active_pollers gauge");
    let _ = writeln!(body, "vision_bridge_active_pollers {}", state.registry.active_count());

    (StatusCode::OK, body).into_response()
}
