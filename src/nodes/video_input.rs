//! Video-input node: samples frames from the backend on a fixed-rate timer.
//!
//! Every tick spawns an independent request; a slow response never delays the
//! next tick, so samples may complete out of order. Successful samples are sent
//! on the node's output channel. Failures only update status and the log.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Method;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{DeviceSource, VideoInputSettings};
use crate::error_handling::NodeError;
use crate::fetch::{encode_uri_component, RequestEngine, RequestMessage, ResponseEnvelope};
use crate::nodes::status::{NodeStatus, StatusHandle, TEXT_NO_RESPONSE};

pub const STATUS_SAMPLING: &str = "sampling";
pub const STATUS_NON_HTTP: &str = "non-http transport requested";

/// Builds the sampling URL for `settings` against `base_url`.
///
/// RTSP sources are percent-encoded as a query component; local devices are
/// addressed as `/dev/<name>`.
///
/// # Examples
///
/// ```
/// use vision_bridge::config::{DeviceSource, VideoInputSettings};
/// use vision_bridge::nodes::build_sample_url;
///
/// let settings = VideoInputSettings {
///     device: DeviceSource::Rtsp("rtsp://cam/1".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(
///     build_sample_url("http://127.0.0.1:5550", &settings),
///     "http://127.0.0.1:5550?resolution=640x480&rtspUrl=rtsp%3A%2F%2Fcam%2F1"
/// );
/// ```
pub fn build_sample_url(base_url: &str, settings: &VideoInputSettings) -> String {
    match &settings.device {
        DeviceSource::Rtsp(source) => format!(
            "{}?resolution={}&rtspUrl={}",
            base_url,
            settings.resolution,
            encode_uri_component(source)
        ),
        DeviceSource::Local(device) => format!(
            "{}?resolution={}&localAddress=/dev/{}",
            base_url, settings.resolution, device
        ),
    }
}

/// One sampling request plus where its outcome goes; cloned into every tick.
#[derive(Debug, Clone)]
struct Sampler {
    engine: RequestEngine,
    url: String,
    status: StatusHandle,
    output: UnboundedSender<ResponseEnvelope>,
}

impl Sampler {
    async fn sample(&self) -> Result<(), NodeError> {
        self.status.set(NodeStatus::busy(STATUS_SAMPLING));

        if self.url.contains("://") && !self.url.starts_with("http") {
            log::warn!("{}: {}", STATUS_NON_HTTP, self.url);
            self.status.set(NodeStatus::error(STATUS_NON_HTTP));
            return Err(NodeError::NonHttpTransport(self.url.clone()));
        }

        match self
            .engine
            .send(Method::GET, &self.url, &RequestMessage::default())
            .await
        {
            Ok(envelope) => {
                self.status.clear();
                if self.output.send(envelope).is_err() {
                    log::debug!("Sample dropped, output receiver closed");
                }
                Ok(())
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
}

/// A video-input node.
///
/// At most one timer runs per node. Enabling and disabling must happen inside
/// a Tokio runtime.
pub struct VideoInputNode {
    id: String,
    settings: VideoInputSettings,
    sampler: Sampler,
    timer: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for VideoInputNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoInputNode")
            .field("id", &self.id)
            .field("url", &self.sampler.url)
            .field("active", &self.is_active())
            .finish()
    }
}

impl VideoInputNode {
    /// Creates the node and its output channel, starting the timer when
    /// `settings.active` is set.
    pub fn new(
        id: impl Into<String>,
        engine: RequestEngine,
        settings: VideoInputSettings,
        base_url: &str,
    ) -> (Self, UnboundedReceiver<ResponseEnvelope>) {
        let (output, receiver) = mpsc::unbounded_channel();
        let sampler = Sampler {
            engine,
            url: build_sample_url(base_url, &settings),
            status: StatusHandle::new(),
            output,
        };
        let node = Self {
            id: id.into(),
            settings,
            sampler,
            timer: Mutex::new(None),
        };
        if node.settings.active {
            node.enable();
        }
        (node, receiver)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &VideoInputSettings {
        &self.settings
    }

    /// URL requested on every tick.
    pub fn sample_url(&self) -> &str {
        &self.sampler.url
    }

    pub fn status(&self) -> &StatusHandle {
        &self.sampler.status
    }

    pub fn is_active(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Starts the timer; a no-op when it is already running.
    pub fn enable(&self) {
        let mut timer = self.lock_timer();
        if timer.is_some() {
            return;
        }
        let period = self.settings.period();
        let cancel = CancellationToken::new();
        tokio::spawn(run_timer(self.sampler.clone(), period, cancel.clone()));
        log::info!(
            "Video input {} sampling every {:?} from {}",
            self.id,
            period,
            self.sampler.url
        );
        *timer = Some(cancel);
    }

    /// Stops the timer; a no-op when it is not running. Requests already
    /// in flight are left to finish.
    pub fn disable(&self) {
        if let Some(cancel) = self.lock_timer().take() {
            cancel.cancel();
            log::info!("Video input {} stopped", self.id);
        }
    }

    /// Applies an activation signal: `true` enables, `false` disables.
    pub fn set_active(&self, active: bool) {
        if active {
            self.enable();
        } else {
            self.disable();
        }
    }

    /// Runs one sample immediately, outside the timer.
    pub async fn poll_once(&self) -> Result<(), NodeError> {
        self.sampler.sample().await
    }

    /// Stops the timer and clears the status.
    pub fn close(&self) {
        self.disable();
        self.sampler.status.clear();
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for VideoInputNode {
    fn drop(&mut self) {
        self.disable();
    }
}

async fn run_timer(sampler: Sampler, period: Duration, cancel: CancellationToken) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {
                let sampler = sampler.clone();
                tokio::spawn(async move {
                    // Outcome already reported through status and log.
                    let _ = sampler.sample().await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtsp_url_is_component_encoded() {
        let settings = VideoInputSettings {
            device: DeviceSource::Rtsp("rtsp://user:p@ss@cam/1?ch=2".to_string()),
            resolution: "1280x720".to_string(),
            ..Default::default()
        };
        assert_eq!(
            build_sample_url("http://127.0.0.1:5550", &settings),
            "http://127.0.0.1:5550?resolution=1280x720&rtspUrl=rtsp%3A%2F%2Fuser%3Ap%40ss%40cam%2F1%3Fch%3D2"
        );
    }

    #[test]
    fn test_local_url_uses_dev_path() {
        let settings = VideoInputSettings::default();
        assert_eq!(
            build_sample_url("http://127.0.0.1:5550", &settings),
            "http://127.0.0.1:5550?resolution=640x480&localAddress=/dev/video0"
        );
    }
}
