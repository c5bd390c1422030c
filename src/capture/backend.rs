use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::device::{Device, DeviceKind, MediaConstraints};
use crate::error::{CaptureError, CaptureResult};

/// MIME type of every recording produced by the crate
pub const WEBM_MIME_TYPE: &str = "video/webm";

/// A single live track inside a media stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub kind: DeviceKind,
    /// Id of the device feeding the track
    pub device_id: String,
    pub label: String,
}

/// Event delivered by a running recorder
///
/// Events arrive in strict temporal order; `Stopped` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A slice of encoded media (may be empty)
    Data(Bytes),
    /// The recorder has flushed everything and will emit nothing more
    Stopped,
}

/// Options for starting a recorder
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Container MIME type
    pub mime_type: String,
    /// Emit a chunk at least once per slice (not exactly on it)
    pub time_slice: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            mime_type: WEBM_MIME_TYPE.to_string(),
            time_slice: Duration::from_millis(1000),
        }
    }
}

impl RecorderOptions {
    /// Reject options no recorder can honor
    pub fn validate(&self) -> CaptureResult<()> {
        if self.time_slice.is_zero() {
            return Err(CaptureError::Platform(
                "recorder time slice must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Live handle to acquired camera + microphone tracks
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<TrackInfo>;

    /// Stop every track; calling again has no further effect
    fn stop_tracks(&mut self);

    fn is_live(&self) -> bool;
}

/// Recorder attached to a media stream
#[async_trait::async_trait]
pub trait MediaRecorder: Send {
    /// Ask the recorder to stop
    ///
    /// Buffered media is flushed as a final `Data` event, followed by
    /// `Stopped`.
    async fn stop(&mut self) -> CaptureResult<()>;

    fn is_recording(&self) -> bool;
}

/// A started recorder together with its ordered event channel
pub struct RecorderHandle {
    pub recorder: Box<dyn MediaRecorder>,
    pub events: mpsc::Receiver<RecorderEvent>,
}

/// Capture/record platform
///
/// Implementations:
/// - Simulated: in-memory device inventory (tests, local development)
/// - Browser/native backends live outside this crate
#[async_trait::async_trait]
pub trait MediaPlatform: Send + Sync {
    /// List capture devices
    ///
    /// Labels are empty until permission has been granted at least once.
    async fn enumerate_devices(&self) -> CaptureResult<Vec<Device>>;

    /// Open a camera + microphone stream matching the constraints
    ///
    /// Suspends until the platform responds (permission prompt, device open).
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> CaptureResult<Box<dyn MediaStream>>;

    /// Start recording the given stream
    async fn start_recorder(
        &self,
        stream: &dyn MediaStream,
        options: &RecorderOptions,
    ) -> CaptureResult<RecorderHandle>;

    /// Platform name for logging
    fn name(&self) -> &str;
}
