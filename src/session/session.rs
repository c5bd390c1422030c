use super::config::SessionConfig;
use super::export::RecordingExport;
use super::stats::{CaptureStatus, FinishedRecording, RecordingState, StreamInfo};
use crate::capture::{
    BlobRegistry, CaptureConfig, ChunkCollector, DeviceList, MediaPlatform, MediaRecorder,
    MediaStream, RecordedChunks,
};
use crate::error::{CaptureError, CaptureResult};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Exclusive handle to the open camera + microphone stream
struct ActiveStream {
    stream: Box<dyn MediaStream>,
    config: CaptureConfig,
    acquired_at: DateTime<Utc>,
}

/// Recorder run in progress
struct ActiveRecording {
    recorder: Box<dyn MediaRecorder>,
    /// Ordered consumer of the recorder's chunk channel
    collector: JoinHandle<RecordedChunks>,
    started_at: DateTime<Utc>,
}

enum Recording {
    Idle,
    Recording(ActiveRecording),
    Finished(FinishedRecording),
}

/// Capture session for one user
///
/// Owns device enumeration, the single active stream, the recording
/// lifecycle and the object URLs of finished recordings.
pub struct CaptureSession {
    /// Session configuration
    config: SessionConfig,

    /// Capture/record platform
    platform: Arc<dyn MediaPlatform>,

    /// Devices from the last enumeration
    devices: DeviceList,

    /// Current camera/microphone selection
    selection: CaptureConfig,

    stream: Option<ActiveStream>,

    permission_granted: bool,

    preview_attached: bool,

    recording: Recording,

    /// Chunks received by the in-progress recording
    chunks_recorded: Arc<AtomicUsize>,

    /// Object URLs of finished recordings
    blobs: BlobRegistry,
}

impl CaptureSession {
    /// Create a new capture session
    pub fn new(platform: Arc<dyn MediaPlatform>, config: SessionConfig) -> Self {
        info!("Creating capture session on {} platform", platform.name());

        Self {
            config,
            platform,
            devices: DeviceList::default(),
            selection: CaptureConfig::default(),
            stream: None,
            permission_granted: false,
            preview_attached: false,
            recording: Recording::Idle,
            chunks_recorded: Arc::new(AtomicUsize::new(0)),
            blobs: BlobRegistry::new(),
        }
    }

    /// Re-read the device list from the platform
    ///
    /// Fills an empty camera/microphone selection with the first device of
    /// each kind.
    pub async fn enumerate_devices(&mut self) -> CaptureResult<DeviceList> {
        let devices = self.platform.enumerate_devices().await?;
        self.devices = DeviceList::from_devices(devices);

        if self.selection.video_source.is_empty() {
            if let Some(camera) = self.devices.first_camera() {
                self.selection.video_source = camera.id.clone();
            }
        }

        if self.selection.audio_source.is_empty() {
            if let Some(microphone) = self.devices.first_microphone() {
                self.selection.audio_source = microphone.id.clone();
            }
        }

        info!(
            "Enumerated {} cameras and {} microphones",
            self.devices.cameras.len(),
            self.devices.microphones.len()
        );

        Ok(self.devices.clone())
    }

    /// Devices from the last enumeration
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn selection(&self) -> &CaptureConfig {
        &self.selection
    }

    /// Change the selection without touching the open stream
    pub fn select_devices(&mut self, config: CaptureConfig) {
        self.selection = config;
    }

    /// Open a camera + microphone stream for `config`
    ///
    /// Never replaces an open stream; use `switch_device` for that.
    pub async fn acquire(&mut self, config: CaptureConfig) -> CaptureResult<()> {
        if self.stream.is_some() {
            return Err(CaptureError::StreamAlreadyActive);
        }

        self.selection = config.clone();

        info!(
            "Acquiring camera {:?} and microphone {:?}",
            config.video_source, config.audio_source
        );

        let stream = match self.platform.get_user_media(&config.constraints()).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to acquire media stream: {}", e);
                return Err(e);
            }
        };

        info!("Stream {} acquired", stream.id());

        self.stream = Some(ActiveStream {
            stream,
            config,
            acquired_at: Utc::now(),
        });
        self.permission_granted = true;
        self.preview_attached = true;

        Ok(())
    }

    /// Acquire with the current selection
    pub async fn start_camera(&mut self) -> CaptureResult<()> {
        self.acquire(self.selection.clone()).await
    }

    /// Stop every track of the open stream and detach the preview
    ///
    /// Releasing when no stream is open is a no-op.
    pub fn release(&mut self) -> CaptureResult<()> {
        if self.is_recording() {
            return Err(CaptureError::DeviceBusy);
        }

        let Some(mut active) = self.stream.take() else {
            return Ok(());
        };

        active.stream.stop_tracks();
        self.preview_attached = false;
        self.permission_granted = false;

        info!("Stream {} released", active.stream.id());

        Ok(())
    }

    /// Release the open stream (if any) and acquire with `config`
    ///
    /// Rejected with `DeviceBusy` while recording; the selection is left as
    /// it was in that case.
    pub async fn switch_device(&mut self, config: CaptureConfig) -> CaptureResult<()> {
        if self.is_recording() {
            warn!("Refusing device switch while recording");
            return Err(CaptureError::DeviceBusy);
        }

        self.release()?;
        self.acquire(config).await
    }

    /// Start recording the open stream
    pub async fn start_recording(&mut self) -> CaptureResult<()> {
        let active = match &self.stream {
            Some(active) if active.stream.is_live() => active,
            _ => return Err(CaptureError::NoActiveStream),
        };

        if self.is_recording() {
            return Err(CaptureError::AlreadyRecording);
        }

        let handle = self
            .platform
            .start_recorder(active.stream.as_ref(), &self.config.recorder_options())
            .await?;

        // Starting over discards the previous recording's reference
        if let Recording::Finished(previous) = &self.recording {
            self.blobs.revoke_object_url(&previous.url);
        }

        let collector = ChunkCollector::with_progress(Arc::clone(&self.chunks_recorded));
        let collector = tokio::spawn(collector.collect(handle.events));

        self.recording = Recording::Recording(ActiveRecording {
            recorder: handle.recorder,
            collector,
            started_at: Utc::now(),
        });

        info!(
            "Recording started (slice {}ms)",
            self.config.time_slice.as_millis()
        );

        Ok(())
    }

    /// Stop the in-progress recording and publish its blob
    ///
    /// Returns `None` without side effects when nothing is recording.
    pub async fn stop_recording(&mut self) -> CaptureResult<Option<FinishedRecording>> {
        let active = match std::mem::replace(&mut self.recording, Recording::Idle) {
            Recording::Recording(active) => active,
            other => {
                self.recording = other;
                return Ok(None);
            }
        };

        info!("Stopping recording");

        let ActiveRecording {
            mut recorder,
            collector,
            started_at,
        } = active;

        if let Err(e) = recorder.stop().await {
            error!("Recorder failed to stop: {}", e);
            collector.abort();
            return Err(e);
        }

        let chunks = collector
            .await
            .map_err(|e| CaptureError::Platform(format!("chunk collector failed: {}", e)))?;

        let complete = chunks.completed;
        if !complete {
            warn!("Recorder ended without a completion signal; recording may be truncated");
        }

        let chunk_count = chunks.len();
        let blob = chunks.into_blob(&self.config.mime_type);
        let size_bytes = blob.size();
        let url = self.blobs.create_object_url(blob);

        let finished = FinishedRecording {
            url,
            mime_type: self.config.mime_type.clone(),
            size_bytes,
            chunk_count,
            complete,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Recording finished: {} chunks, {} bytes at {}",
            finished.chunk_count, finished.size_bytes, finished.url
        );

        self.recording = Recording::Finished(finished.clone());

        Ok(Some(finished))
    }

    /// Package the finished recording for download
    pub fn export_recording(&self) -> CaptureResult<RecordingExport> {
        let Recording::Finished(finished) = &self.recording else {
            return Err(CaptureError::NoRecordingAvailable);
        };

        let blob = self
            .blobs
            .resolve(&finished.url)
            .ok_or(CaptureError::NoRecordingAvailable)?;

        Ok(RecordingExport {
            filename: self.config.download_filename.clone(),
            mime_type: blob.mime_type().to_string(),
            bytes: blob.bytes(),
        })
    }

    /// Look up a live object URL
    pub fn resolve_url(&self, url: &str) -> Option<RecordingExport> {
        self.blobs.resolve(url).map(|blob| RecordingExport {
            filename: self.config.download_filename.clone(),
            mime_type: blob.mime_type().to_string(),
            bytes: blob.bytes(),
        })
    }

    pub fn recording_state(&self) -> RecordingState {
        match self.recording {
            Recording::Idle => RecordingState::Idle,
            Recording::Recording(_) => RecordingState::Recording,
            Recording::Finished(_) => RecordingState::Finished,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.recording, Recording::Recording(_))
    }

    pub fn has_active_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Get current session status
    pub fn status(&self) -> CaptureStatus {
        let (chunks_recorded, recording_started_at, recording) = match &self.recording {
            Recording::Idle => (0, None, None),
            Recording::Recording(active) => (
                self.chunks_recorded.load(Ordering::SeqCst),
                Some(active.started_at),
                None,
            ),
            Recording::Finished(finished) => (0, None, Some(finished.clone())),
        };

        CaptureStatus {
            camera_active: self.stream.is_some(),
            permission_granted: self.permission_granted,
            preview_attached: self.preview_attached,
            recording_state: self.recording_state(),
            chunks_recorded,
            recording_started_at,
            recording,
            selection: self.selection.clone(),
            stream: self.stream.as_ref().map(|active| StreamInfo {
                id: active.stream.id().to_string(),
                tracks: active.stream.tracks(),
                config: active.config.clone(),
                acquired_at: active.acquired_at,
            }),
            platform: self.platform.name().to_string(),
        }
    }

    /// Tear the session down
    ///
    /// Finishes any in-progress recording, releases the stream and revokes
    /// every object URL.
    pub async fn close(&mut self) -> CaptureResult<()> {
        info!("Closing capture session");

        if self.is_recording() {
            if let Err(e) = self.stop_recording().await {
                error!("Failed to stop recording during teardown: {}", e);
            }
        }
        // A failed stop leaves the recording Idle, so release cannot be refused
        self.release()?;

        self.blobs.revoke_all();
        self.recording = Recording::Idle;

        Ok(())
    }
}
