use thiserror::Error;

/// Errors surfaced by capture and recording operations
///
/// None of these are fatal to a session: the user can always retry
/// `acquire()` after a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or platform policy) declined camera/microphone access
    #[error("Access to camera and microphone was denied")]
    MediaAccessDenied,

    /// No device matches the constraints, or the device is held elsewhere
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The operation would interrupt a recording in progress
    #[error("Devices are busy: a recording is in progress")]
    DeviceBusy,

    #[error("No active camera stream")]
    NoActiveStream,

    #[error("No finished recording is available")]
    NoRecordingAvailable,

    /// `acquire()` was called while a stream is already open
    #[error("A camera stream is already active")]
    StreamAlreadyActive,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    /// Unexpected failure inside the media platform
    #[error("Media platform error: {0}")]
    Platform(String),
}

impl CaptureError {
    /// Stable identifier used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::MediaAccessDenied => "MediaAccessDenied",
            Self::DeviceUnavailable(_) => "DeviceUnavailable",
            Self::DeviceBusy => "DeviceBusy",
            Self::NoActiveStream => "NoActiveStream",
            Self::NoRecordingAvailable => "NoRecordingAvailable",
            Self::StreamAlreadyActive => "StreamAlreadyActive",
            Self::AlreadyRecording => "AlreadyRecording",
            Self::Platform(_) => "Platform",
        }
    }
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
