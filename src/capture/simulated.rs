// Simulated media platform
//
// Behaves like a browser's media stack closely enough to drive the whole
// capture flow without hardware:
// - device labels stay hidden until permission has been granted once
// - a device held by a live stream cannot be opened again
// - recorders either emit synthetic WebM slices on a timer or forward
//   chunks pushed through a ChunkFeed

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::backend::{
    MediaPlatform, MediaRecorder, MediaStream, RecorderEvent, RecorderHandle, RecorderOptions,
    TrackInfo,
};
use super::device::{Device, DeviceConstraint, DeviceKind, MediaConstraints};
use crate::error::{CaptureError, CaptureResult};

/// EBML magic number that opens every WebM file
const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Capacity of each recorder's event channel
const RECORDER_CHANNEL_CAPACITY: usize = 64;

/// How the user answers the permission prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    #[default]
    Grant,
    Deny,
}

/// Where recorded chunks come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    /// Chunks are pushed by the caller through a `ChunkFeed`
    Manual,
    /// One synthetic chunk of `chunk_bytes` per time slice, plus a final flush
    Synthetic { chunk_bytes: usize },
}

/// Configuration for the simulated platform
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub devices: Vec<Device>,
    pub permission: PermissionPolicy,
    pub chunk_mode: ChunkMode,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                Device::new("cam1", DeviceKind::Camera, "Integrated Camera"),
                Device::new("mic1", DeviceKind::Microphone, "Built-in Microphone"),
            ],
            permission: PermissionPolicy::Grant,
            chunk_mode: ChunkMode::Synthetic { chunk_bytes: 4096 },
        }
    }
}

#[derive(Debug, Default)]
struct PlatformState {
    devices: Vec<Device>,
    permission: PermissionPolicy,
    /// Set after the first successful get_user_media
    labels_unlocked: bool,
    in_use: HashSet<String>,
    /// Sender of the running manual-mode recorder
    feed: Option<mpsc::Sender<RecorderEvent>>,
}

/// In-memory media platform
pub struct SimulatedPlatform {
    chunk_mode: ChunkMode,
    state: Arc<Mutex<PlatformState>>,
}

impl SimulatedPlatform {
    pub fn new(config: SimulatedConfig) -> Self {
        info!(
            "Simulated media platform initialized ({} devices, {:?})",
            config.devices.len(),
            config.chunk_mode
        );

        let state = PlatformState {
            devices: config.devices,
            permission: config.permission,
            ..PlatformState::default()
        };

        Self {
            chunk_mode: config.chunk_mode,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Platform with the given devices, permission granted and manual chunks
    pub fn manual(devices: Vec<Device>) -> Self {
        Self::new(SimulatedConfig {
            devices,
            permission: PermissionPolicy::Grant,
            chunk_mode: ChunkMode::Manual,
        })
    }

    pub fn set_permission(&self, policy: PermissionPolicy) {
        self.state.lock().permission = policy;
    }

    /// Simulate a device being plugged in
    pub fn plug(&self, device: Device) {
        info!("Device plugged: {} ({:?})", device.id, device.kind);
        self.state.lock().devices.push(device);
    }

    /// Simulate a device being unplugged
    pub fn unplug(&self, device_id: &str) {
        info!("Device unplugged: {}", device_id);
        self.state.lock().devices.retain(|device| device.id != device_id);
    }

    /// Mark a device as held by another application
    pub fn occupy(&self, device_id: &str) {
        self.state.lock().in_use.insert(device_id.to_string());
    }

    pub fn devices_in_use(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().in_use.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Feed for the currently running manual-mode recorder
    pub fn chunk_feed(&self) -> Option<ChunkFeed> {
        self.state
            .lock()
            .feed
            .clone()
            .map(|sender| ChunkFeed { sender })
    }

    fn select_device(
        state: &PlatformState,
        kind: DeviceKind,
        constraint: &DeviceConstraint,
    ) -> CaptureResult<Device> {
        let noun = match kind {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
        };

        let mut candidates = state.devices.iter().filter(|device| device.kind == kind);

        match constraint {
            DeviceConstraint::Exact(id) => {
                let device = candidates.find(|device| &device.id == id).ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("no {} matches id {}", noun, id))
                })?;

                if state.in_use.contains(&device.id) {
                    return Err(CaptureError::DeviceUnavailable(format!(
                        "{} {} is in use",
                        noun, id
                    )));
                }

                Ok(device.clone())
            }
            DeviceConstraint::Default => {
                let all: Vec<&Device> = candidates.collect();
                if all.is_empty() {
                    return Err(CaptureError::DeviceUnavailable(format!("no {} found", noun)));
                }

                all.into_iter()
                    .find(|device| !state.in_use.contains(&device.id))
                    .cloned()
                    .ok_or_else(|| {
                        CaptureError::DeviceUnavailable(format!("every {} is in use", noun))
                    })
            }
        }
    }
}

#[async_trait::async_trait]
impl MediaPlatform for SimulatedPlatform {
    async fn enumerate_devices(&self) -> CaptureResult<Vec<Device>> {
        let state = self.state.lock();

        let devices = state
            .devices
            .iter()
            .map(|device| {
                let mut listed = device.clone();
                if !state.labels_unlocked {
                    listed.label.clear();
                }
                listed
            })
            .collect();

        Ok(devices)
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> CaptureResult<Box<dyn MediaStream>> {
        let mut state = self.state.lock();

        if state.permission == PermissionPolicy::Deny {
            info!("Permission prompt declined");
            return Err(CaptureError::MediaAccessDenied);
        }

        let camera = Self::select_device(&state, DeviceKind::Camera, &constraints.video)?;
        let microphone = Self::select_device(&state, DeviceKind::Microphone, &constraints.audio)?;

        state.in_use.insert(camera.id.clone());
        state.in_use.insert(microphone.id.clone());
        state.labels_unlocked = true;

        let stream = SimulatedStream {
            id: Uuid::new_v4().to_string(),
            tracks: vec![
                TrackInfo {
                    kind: DeviceKind::Camera,
                    device_id: camera.id,
                    label: camera.label,
                },
                TrackInfo {
                    kind: DeviceKind::Microphone,
                    device_id: microphone.id,
                    label: microphone.label,
                },
            ],
            live: true,
            state: Arc::clone(&self.state),
        };

        info!("Opened stream {}", stream.id);

        Ok(Box::new(stream))
    }

    async fn start_recorder(
        &self,
        stream: &dyn MediaStream,
        options: &RecorderOptions,
    ) -> CaptureResult<RecorderHandle> {
        if !stream.is_live() {
            return Err(CaptureError::NoActiveStream);
        }
        options.validate()?;

        let (tx, rx) = mpsc::channel(RECORDER_CHANNEL_CAPACITY);

        let recorder = match self.chunk_mode {
            ChunkMode::Manual => {
                self.state.lock().feed = Some(tx.clone());
                SimulatedRecorder {
                    tx: Some(tx),
                    stop_tx: None,
                    task: None,
                    state: Arc::clone(&self.state),
                    recording: true,
                }
            }
            ChunkMode::Synthetic { chunk_bytes } => {
                let (stop_tx, stop_rx) = oneshot::channel();
                let task = tokio::spawn(emit_synthetic_chunks(
                    tx,
                    stop_rx,
                    options.time_slice,
                    chunk_bytes,
                ));
                SimulatedRecorder {
                    tx: None,
                    stop_tx: Some(stop_tx),
                    task: Some(task),
                    state: Arc::clone(&self.state),
                    recording: true,
                }
            }
        };

        info!(
            "Recorder started on stream {} ({}, slice {}ms)",
            stream.id(),
            options.mime_type,
            options.time_slice.as_millis()
        );

        Ok(RecorderHandle {
            recorder: Box::new(recorder),
            events: rx,
        })
    }

    fn name(&self) -> &str {
        "Simulated"
    }
}

/// Handle for pushing chunks into a manual-mode recorder
#[derive(Clone)]
pub struct ChunkFeed {
    sender: mpsc::Sender<RecorderEvent>,
}

impl ChunkFeed {
    pub async fn push(&self, data: impl Into<Bytes>) -> CaptureResult<()> {
        self.sender
            .send(RecorderEvent::Data(data.into()))
            .await
            .map_err(|_| CaptureError::Platform("recorder is no longer running".to_string()))
    }
}

struct SimulatedStream {
    id: String,
    tracks: Vec<TrackInfo>,
    live: bool,
    state: Arc<Mutex<PlatformState>>,
}

impl MediaStream for SimulatedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.clone()
    }

    fn stop_tracks(&mut self) {
        if !self.live {
            return;
        }

        let mut state = self.state.lock();
        for track in &self.tracks {
            state.in_use.remove(&track.device_id);
        }
        self.live = false;

        debug!("Stream {} tracks stopped", self.id);
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

struct SimulatedRecorder {
    /// Manual mode: sender used to deliver the stop signal
    tx: Option<mpsc::Sender<RecorderEvent>>,
    /// Synthetic mode: signal for the emitter task
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    state: Arc<Mutex<PlatformState>>,
    recording: bool,
}

#[async_trait::async_trait]
impl MediaRecorder for SimulatedRecorder {
    async fn stop(&mut self) -> CaptureResult<()> {
        if !self.recording {
            return Ok(());
        }
        self.recording = false;

        if let Some(tx) = self.tx.take() {
            self.state.lock().feed = None;
            // Collector may already be gone; nothing left to deliver then
            let _ = tx.send(RecorderEvent::Stopped).await;
        }

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| CaptureError::Platform(format!("recorder task failed: {}", e)))?;
        }

        debug!("Simulated recorder stopped");

        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

async fn emit_synthetic_chunks(
    tx: mpsc::Sender<RecorderEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    time_slice: Duration,
    chunk_bytes: usize,
) {
    let mut ticker = tokio::time::interval(time_slice);
    // First tick completes immediately
    ticker.tick().await;

    let mut index = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let chunk = synthetic_chunk(index, chunk_bytes);
                if tx.send(RecorderEvent::Data(chunk)).await.is_err() {
                    error!("Chunk consumer went away; stopping synthetic recorder");
                    return;
                }
                index += 1;
            }
            _ = &mut stop_rx => break,
        }
    }

    // Flush the partially filled slice
    let _ = tx
        .send(RecorderEvent::Data(synthetic_chunk(index, chunk_bytes / 2)))
        .await;
    let _ = tx.send(RecorderEvent::Stopped).await;
}

/// Synthetic media slice; the first one carries the WebM header magic
fn synthetic_chunk(index: usize, size: usize) -> Bytes {
    let mut chunk = BytesMut::with_capacity(size.max(EBML_MAGIC.len()));

    if index == 0 {
        chunk.put_slice(&EBML_MAGIC);
    }

    let fill = (index % 251) as u8;
    while chunk.len() < size {
        chunk.put_u8(fill);
    }

    chunk.freeze()
}
