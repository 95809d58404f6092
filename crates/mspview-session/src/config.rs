use std::time::Duration;

use mspview_frame::{FrameConfig, MspVersion};
use mspview_transport::SerialSettings;

/// Delay between reconnection attempts. Fixed; never grows.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// How long the supervisor waits for an answer before re-sending a request.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Supervisor behaviour.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Grammar used for requests.
    pub version: MspVersion,
    pub backoff: Duration,
    /// Optional delay after each telemetry cycle. Display pacing only.
    pub pacing: Option<Duration>,
    /// Stop after the first complete telemetry cycle.
    pub once: bool,
    pub response_timeout: Duration,
    pub serial: SerialSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: MspVersion::V2,
            backoff: DEFAULT_BACKOFF,
            pacing: None,
            once: false,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            serial: SerialSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Frame configuration matching this session.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            version: self.version,
            ..FrameConfig::default()
        }
    }
}
