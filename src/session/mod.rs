//! Capture session management
//!
//! This module provides the `CaptureSession` abstraction that manages:
//! - Device enumeration and camera/microphone selection
//! - Acquisition and release of the single active stream
//! - The idle → recording → finished lifecycle
//! - Object URLs and download packaging for finished recordings

mod config;
mod export;
mod session;
mod stats;

pub use config::SessionConfig;
pub use export::{RecordingExport, EXPORT_PART_SIZE};
pub use session::CaptureSession;
pub use stats::{CaptureStatus, FinishedRecording, RecordingState, StreamInfo};
