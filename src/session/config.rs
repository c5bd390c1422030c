use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::{RecorderOptions, WEBM_MIME_TYPE};

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chunk granularity hint passed to the recorder
    /// Default: 1 second
    pub time_slice: Duration,

    /// Container MIME type of recordings
    pub mime_type: String,

    /// Filename offered when a recording is downloaded
    pub download_filename: String,
}

impl SessionConfig {
    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            mime_type: self.mime_type.clone(),
            time_slice: self.time_slice,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_slice: Duration::from_millis(1000),
            mime_type: WEBM_MIME_TYPE.to_string(),
            download_filename: "recording.webm".to_string(),
        }
    }
}
