pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use auth::{AuthProvider, StaticAuthProvider, UserSession};
pub use capture::{
    Blob, BlobRegistry, CaptureConfig, ChunkCollector, ChunkFeed, ChunkMode, Device, DeviceKind,
    DeviceList, MediaPlatform, MediaRecorder, MediaStream, PermissionPolicy, RecorderEvent,
    RecorderOptions, SimulatedConfig, SimulatedPlatform,
};
pub use config::Config;
pub use error::{CaptureError, CaptureResult};
pub use http::{create_router, AppState};
pub use session::{
    CaptureSession, CaptureStatus, FinishedRecording, RecordingExport, RecordingState,
    SessionConfig,
};
