//! Admin server HTTP handlers.

mod metrics;
mod video_input;

pub use metrics::metrics_handler;
pub use video_input::video_input_state_handler;
