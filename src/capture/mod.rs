pub mod backend;
pub mod blob;
pub mod chunk;
pub mod device;
pub mod simulated;

pub use backend::{
    MediaPlatform, MediaRecorder, MediaStream, RecorderEvent, RecorderHandle, RecorderOptions,
    TrackInfo, WEBM_MIME_TYPE,
};
pub use blob::{Blob, BlobRegistry};
pub use chunk::{ChunkCollector, RecordedChunks};
pub use device::{CaptureConfig, Device, DeviceConstraint, DeviceKind, DeviceList, MediaConstraints};
pub use simulated::{ChunkFeed, ChunkMode, PermissionPolicy, SimulatedConfig, SimulatedPlatform};
