use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureConfig, TrackInfo};

/// Lifecycle of the session's recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Nothing recorded yet
    #[default]
    Idle,
    /// Chunks are accumulating
    Recording,
    /// A blob is available for playback and download
    Finished,
}

/// A completed recording, referenced by its object URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedRecording {
    /// Object URL of the blob (valid until superseded or session teardown)
    pub url: String,

    pub mime_type: String,

    /// Size of the concatenated blob in bytes
    pub size_bytes: usize,

    /// Number of non-empty chunks delivered by the recorder
    pub chunk_count: usize,

    /// False when the recorder's channel closed before it signalled
    /// completion (the tail of the capture may be missing)
    pub complete: bool,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

/// Summary of the open stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    pub tracks: Vec<TrackInfo>,
    pub config: CaptureConfig,
    pub acquired_at: DateTime<Utc>,
}

/// Point-in-time view of a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatus {
    /// Whether a camera stream is open
    pub camera_active: bool,

    pub permission_granted: bool,

    /// Whether the open stream feeds the preview
    pub preview_attached: bool,

    pub recording_state: RecordingState,

    /// Chunks received by the in-progress recording
    pub chunks_recorded: usize,

    /// When the in-progress recording started
    pub recording_started_at: Option<DateTime<Utc>>,

    /// Latest finished recording, if any
    pub recording: Option<FinishedRecording>,

    pub selection: CaptureConfig,

    pub stream: Option<StreamInfo>,

    pub platform: String,
}
