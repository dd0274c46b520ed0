//! Video-input enable/disable handler.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::super::types::AdminState;

/// `POST /video-input/{id}/{state}`
///
/// Unknown ids answer 404. `enable` and `disable` toggle the node's timer;
/// any other state answers 400 and leaves the node untouched.
pub async fn video_input_state_handler(
    State(state): State<AdminState>,
    Path((id, action)): Path<(String, String)>,
) -> Response {
    let Some(node) = state.registry.get(&id) else {
        log::debug!("Admin request for unknown video input {}", id);
        return StatusCode::NOT_FOUND.into_response();
    };

    match action.as_str() {
        "enable" => {
            node.enable();
            (StatusCode::OK, "activated").into_response()
        }
        "disable" => {
            node.disable();
            (StatusCode::OK, "deactivated").into_response()
        }
        other => {
            log::warn!("Unknown state {:?} requested for video input {}", other, id);
            (StatusCode::BAD_REQUEST, format!("unknown state: {}", other)).into_response()
        }
    }
}
