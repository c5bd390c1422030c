// Integration tests for the capture session state machine
//
// These tests drive a CaptureSession against the simulated platform in
// manual chunk mode, so every chunk the recorder "produces" is pushed by
// the test itself.

use anyhow::Result;
use bytes::Bytes;
use clip_recorder::capture::{
    CaptureConfig, ChunkMode, Device, DeviceKind, MediaConstraints, MediaPlatform, MediaRecorder,
    MediaStream, PermissionPolicy, RecorderEvent, RecorderHandle, RecorderOptions,
    SimulatedConfig, SimulatedPlatform, TrackInfo,
};
use clip_recorder::error::CaptureResult;
use clip_recorder::session::{CaptureSession, RecordingState, SessionConfig};
use clip_recorder::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn default_devices() -> Vec<Device> {
    vec![
        Device::new("cam1", DeviceKind::Camera, "Front Camera"),
        Device::new("mic1", DeviceKind::Microphone, "Headset Mic"),
    ]
}

fn setup(devices: Vec<Device>) -> (Arc<SimulatedPlatform>, CaptureSession) {
    let platform = Arc::new(SimulatedPlatform::manual(devices));
    let session = CaptureSession::new(platform.clone(), SessionConfig::default());
    (platform, session)
}

async fn record_chunks(
    platform: &SimulatedPlatform,
    session: &mut CaptureSession,
    chunks: &[Vec<u8>],
) -> Result<()> {
    session.start_recording().await?;
    let feed = platform.chunk_feed().expect("manual recorder should be running");
    for chunk in chunks {
        feed.push(chunk.clone()).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_enumeration_selects_first_devices_by_default() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    let devices = session.enumerate_devices().await?;

    assert_eq!(devices.cameras.len(), 1);
    assert_eq!(devices.microphones.len(), 1);
    assert_eq!(session.selection().video_source, "cam1");
    assert_eq!(session.selection().audio_source, "mic1");

    Ok(())
}

#[tokio::test]
async fn test_enumeration_keeps_existing_selection() -> Result<()> {
    let mut devices = default_devices();
    devices.push(Device::new("cam2", DeviceKind::Camera, "USB Webcam"));
    let (_platform, mut session) = setup(devices);

    session.select_devices(CaptureConfig::new("cam2", ""));
    session.enumerate_devices().await?;

    assert_eq!(session.selection().video_source, "cam2");
    assert_eq!(session.selection().audio_source, "mic1", "Empty slot gets the default");

    Ok(())
}

#[tokio::test]
async fn test_labels_hidden_until_permission_granted() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    let before = session.enumerate_devices().await?;
    assert!(before.cameras[0].label.is_empty(), "Labels should be hidden before permission");
    assert_eq!(before.cameras[0].display_label(0), "Camera 1");
    assert_eq!(before.microphones[0].display_label(0), "Microphone 1");

    session.start_camera().await?;

    let after = session.enumerate_devices().await?;
    assert_eq!(after.cameras[0].label, "Front Camera");
    assert_eq!(after.cameras[0].display_label(0), "Front Camera");

    Ok(())
}

#[tokio::test]
async fn test_acquire_with_default_config_uses_any_device() -> Result<()> {
    let (platform, mut session) = setup(default_devices());

    session.acquire(CaptureConfig::default()).await?;

    let status = session.status();
    assert!(status.camera_active);
    assert!(status.permission_granted);
    assert!(status.preview_attached);
    assert_eq!(platform.devices_in_use(), vec!["cam1".to_string(), "mic1".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_acquire_without_devices_is_unavailable() -> Result<()> {
    let (_platform, mut session) = setup(Vec::new());

    let result = session.acquire(CaptureConfig::default()).await;

    assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
    assert!(!session.status().camera_active);
    assert!(!session.status().permission_granted);

    Ok(())
}

#[tokio::test]
async fn test_acquire_with_unknown_device_id_is_unavailable() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    let result = session.acquire(CaptureConfig::new("missing-cam", "mic1")).await;

    assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));

    Ok(())
}

#[tokio::test]
async fn test_acquire_device_held_elsewhere_is_unavailable() -> Result<()> {
    let mut devices = default_devices();
    devices.push(Device::new("cam2", DeviceKind::Camera, "USB Webcam"));
    let (platform, mut session) = setup(devices);

    platform.occupy("cam1");

    let exact = session.acquire(CaptureConfig::new("cam1", "mic1")).await;
    assert!(matches!(exact, Err(CaptureError::DeviceUnavailable(_))));

    // The default constraint falls back to a free camera
    session.acquire(CaptureConfig::default()).await?;
    let stream = session.status().stream.expect("stream should be open");
    assert!(stream.tracks.iter().any(|track| track.device_id == "cam2"));

    Ok(())
}

#[tokio::test]
async fn test_denied_permission_can_be_retried() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    platform.set_permission(PermissionPolicy::Deny);

    let denied = session.start_camera().await;
    assert_eq!(denied, Err(CaptureError::MediaAccessDenied));
    assert!(!session.has_active_stream());

    platform.set_permission(PermissionPolicy::Grant);
    session.start_camera().await?;
    assert!(session.has_active_stream());

    Ok(())
}

#[tokio::test]
async fn test_acquire_never_replaces_open_stream() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    session.start_camera().await?;
    let first_id = session.status().stream.expect("stream").id;

    let second = session.start_camera().await;
    assert_eq!(second, Err(CaptureError::StreamAlreadyActive));
    assert_eq!(session.status().stream.expect("stream").id, first_id);

    Ok(())
}

#[tokio::test]
async fn test_release_is_idempotent() -> Result<()> {
    let (platform, mut session) = setup(default_devices());

    session.start_camera().await?;
    session.release()?;

    let status = session.status();
    assert!(!status.camera_active);
    assert!(!status.permission_granted);
    assert!(!status.preview_attached);
    assert!(platform.devices_in_use().is_empty(), "Tracks should be stopped");

    session.release()?;
    assert!(platform.devices_in_use().is_empty());

    // Releasing with no stream ever opened is also fine
    let (_platform, mut fresh) = setup(default_devices());
    fresh.release()?;

    Ok(())
}

#[tokio::test]
async fn test_start_recording_requires_stream() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    assert_eq!(session.start_recording().await, Err(CaptureError::NoActiveStream));

    session.start_camera().await?;
    session.release()?;
    assert_eq!(session.start_recording().await, Err(CaptureError::NoActiveStream));
    assert_eq!(session.recording_state(), RecordingState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_stop_recording_while_idle_is_noop() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());

    let result = session.stop_recording().await?;

    assert!(result.is_none());
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(matches!(
        session.export_recording(),
        Err(CaptureError::NoRecordingAvailable)
    ));

    Ok(())
}

#[tokio::test]
async fn test_recording_produces_downloadable_webm() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.enumerate_devices().await?;
    session.acquire(CaptureConfig::new("cam1", "mic1")).await?;

    let chunks = vec![vec![1u8; 10], vec![2u8; 20], vec![3u8; 15]];
    record_chunks(&platform, &mut session, &chunks).await?;
    assert_eq!(session.recording_state(), RecordingState::Recording);

    let finished = session.stop_recording().await?.expect("recording should finish");
    assert_eq!(finished.size_bytes, 45);
    assert_eq!(finished.chunk_count, 3);
    assert_eq!(finished.mime_type, "video/webm");
    assert!(finished.url.starts_with("blob:"));
    assert_eq!(session.recording_state(), RecordingState::Finished);

    let export = session.export_recording()?;
    assert_eq!(export.filename, "recording.webm");
    assert_eq!(export.size(), 45);
    assert_eq!(export.bytes.to_vec(), chunks.concat(), "Blob must equal chunks in order");

    Ok(())
}

#[tokio::test]
async fn test_recording_preserves_chunk_order() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.start_camera().await?;

    let chunks: Vec<Vec<u8>> = (0..40u8).map(|i| vec![i; (i as usize % 7) + 1]).collect();
    record_chunks(&platform, &mut session, &chunks).await?;
    session.stop_recording().await?;

    let export = session.export_recording()?;
    assert_eq!(export.bytes.to_vec(), chunks.concat());

    Ok(())
}

#[tokio::test]
async fn test_empty_chunks_are_discarded() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.start_camera().await?;

    let chunks = vec![vec![9u8; 4], Vec::new(), vec![8u8; 2]];
    record_chunks(&platform, &mut session, &chunks).await?;

    let finished = session.stop_recording().await?.expect("recording should finish");
    assert_eq!(finished.chunk_count, 2);
    assert_eq!(finished.size_bytes, 6);

    Ok(())
}

#[tokio::test]
async fn test_second_start_recording_is_rejected() -> Result<()> {
    let (_platform, mut session) = setup(default_devices());
    session.start_camera().await?;
    session.start_recording().await?;

    assert_eq!(session.start_recording().await, Err(CaptureError::AlreadyRecording));
    assert_eq!(session.recording_state(), RecordingState::Recording);

    Ok(())
}

#[tokio::test]
async fn test_switch_device_while_recording_is_rejected() -> Result<()> {
    let mut devices = default_devices();
    devices.push(Device::new("cam2", DeviceKind::Camera, "USB Webcam"));
    let (platform, mut session) = setup(devices);
    session.enumerate_devices().await?;
    session.start_camera().await?;

    record_chunks(&platform, &mut session, &[vec![7u8; 12]]).await?;
    let stream_id = session.status().stream.expect("stream").id;

    let result = session.switch_device(CaptureConfig::new("cam2", "mic1")).await;
    assert_eq!(result, Err(CaptureError::DeviceBusy));

    // Nothing changed: same stream, same selection, recording intact
    assert_eq!(session.status().stream.expect("stream").id, stream_id);
    assert_eq!(session.selection().video_source, "cam1");
    assert_eq!(session.recording_state(), RecordingState::Recording);

    let finished = session.stop_recording().await?.expect("recording should finish");
    assert_eq!(finished.size_bytes, 12);

    Ok(())
}

#[tokio::test]
async fn test_release_while_recording_is_rejected() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.start_camera().await?;
    session.start_recording().await?;

    assert_eq!(session.release(), Err(CaptureError::DeviceBusy));
    assert!(session.has_active_stream());
    assert!(!platform.devices_in_use().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_switch_device_replaces_stream() -> Result<()> {
    let mut devices = default_devices();
    devices.push(Device::new("cam2", DeviceKind::Camera, "USB Webcam"));
    let (platform, mut session) = setup(devices);
    session.enumerate_devices().await?;
    session.start_camera().await?;
    let first_id = session.status().stream.expect("stream").id;

    session.switch_device(CaptureConfig::new("cam2", "mic1")).await?;

    let stream = session.status().stream.expect("stream");
    assert_ne!(stream.id, first_id);
    assert_eq!(stream.config.video_source, "cam2");
    assert_eq!(session.selection().video_source, "cam2");
    assert_eq!(platform.devices_in_use(), vec!["cam2".to_string(), "mic1".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_new_recording_revokes_previous_url() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.start_camera().await?;

    record_chunks(&platform, &mut session, &[vec![1u8; 5]]).await?;
    let first = session.stop_recording().await?.expect("first recording");
    assert!(session.resolve_url(&first.url).is_some());

    record_chunks(&platform, &mut session, &[vec![2u8; 8]]).await?;
    assert!(session.resolve_url(&first.url).is_none(), "Old URL should be revoked");
    assert!(matches!(
        session.export_recording(),
        Err(CaptureError::NoRecordingAvailable)
    ));

    let second = session.stop_recording().await?.expect("second recording");
    assert_ne!(first.url, second.url);
    assert_eq!(session.export_recording()?.size(), 8);

    Ok(())
}

#[tokio::test]
async fn test_close_releases_and_revokes() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.start_camera().await?;
    record_chunks(&platform, &mut session, &[vec![4u8; 3]]).await?;
    let finished = session.stop_recording().await?.expect("recording");

    session.start_recording().await?;
    session.close().await?;

    assert!(!session.has_active_stream());
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(session.resolve_url(&finished.url).is_none());
    assert!(platform.devices_in_use().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_reenumeration_picks_up_device_changes() -> Result<()> {
    let (platform, mut session) = setup(default_devices());
    session.enumerate_devices().await?;

    platform.plug(Device::new("cam2", DeviceKind::Camera, "USB Webcam"));
    assert_eq!(session.devices().cameras.len(), 1, "List only changes on re-enumeration");

    let devices = session.enumerate_devices().await?;
    assert_eq!(devices.cameras.len(), 2);

    platform.unplug("cam1");
    let devices = session.enumerate_devices().await?;
    assert_eq!(devices.cameras.len(), 1);
    assert_eq!(devices.cameras[0].id, "cam2");

    Ok(())
}

#[tokio::test]
async fn test_synthetic_recorder_emits_webm_slices() -> Result<()> {
    let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
        devices: default_devices(),
        permission: PermissionPolicy::Grant,
        chunk_mode: ChunkMode::Synthetic { chunk_bytes: 100 },
    }));
    let config = SessionConfig {
        time_slice: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let mut session = CaptureSession::new(platform, config);

    session.start_camera().await?;
    session.start_recording().await?;
    tokio::time::sleep(Duration::from_millis(90)).await;

    let finished = session.stop_recording().await?.expect("recording");

    // At least one full slice plus the final flush
    assert!(finished.chunk_count >= 2, "got {} chunks", finished.chunk_count);

    let export = session.export_recording()?;
    assert_eq!(&export.bytes[..4], &[0x1Au8, 0x45, 0xDF, 0xA3], "Should start with EBML magic");

    Ok(())
}

#[tokio::test]
async fn test_zero_time_slice_is_rejected_before_recording() -> Result<()> {
    let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
        devices: default_devices(),
        permission: PermissionPolicy::Grant,
        chunk_mode: ChunkMode::Synthetic { chunk_bytes: 100 },
    }));
    let config = SessionConfig {
        time_slice: Duration::ZERO,
        ..SessionConfig::default()
    };
    let mut session = CaptureSession::new(platform.clone(), config);

    session.start_camera().await?;
    let result = session.start_recording().await;

    assert!(matches!(result, Err(CaptureError::Platform(_))), "got {:?}", result);
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(session.has_active_stream(), "Stream should stay open");

    session.release()?;
    assert!(platform.devices_in_use().is_empty());

    Ok(())
}

/// Platform with a single stream whose recorder can be told to misbehave
#[derive(Default)]
struct FaultyPlatform {
    /// The next `stop` call fails
    fail_next_stop: Arc<AtomicBool>,
    /// Recorders close their channel without sending `Stopped`
    drop_stop_signal: AtomicBool,
}

struct FaultyStream {
    live: bool,
}

impl MediaStream for FaultyStream {
    fn id(&self) -> &str {
        "faulty-stream"
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        Vec::new()
    }

    fn stop_tracks(&mut self) {
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

struct FaultyRecorder {
    tx: Option<mpsc::Sender<RecorderEvent>>,
    fail_next_stop: Arc<AtomicBool>,
    drop_stop_signal: bool,
}

#[async_trait::async_trait]
impl MediaRecorder for FaultyRecorder {
    async fn stop(&mut self) -> CaptureResult<()> {
        if self.fail_next_stop.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::Platform("encoder crashed".to_string()));
        }

        if let Some(tx) = self.tx.take() {
            let _ = tx.send(RecorderEvent::Data(Bytes::from_static(b"tail"))).await;
            if !self.drop_stop_signal {
                let _ = tx.send(RecorderEvent::Stopped).await;
            }
        }

        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.tx.is_some()
    }
}

#[async_trait::async_trait]
impl MediaPlatform for FaultyPlatform {
    async fn enumerate_devices(&self) -> CaptureResult<Vec<Device>> {
        Ok(Vec::new())
    }

    async fn get_user_media(
        &self,
        _constraints: &MediaConstraints,
    ) -> CaptureResult<Box<dyn MediaStream>> {
        Ok(Box::new(FaultyStream { live: true }))
    }

    async fn start_recorder(
        &self,
        _stream: &dyn MediaStream,
        options: &RecorderOptions,
    ) -> CaptureResult<RecorderHandle> {
        options.validate()?;

        let (tx, rx) = mpsc::channel(8);
        tx.send(RecorderEvent::Data(Bytes::from_static(b"head")))
            .await
            .map_err(|_| CaptureError::Platform("channel closed".to_string()))?;

        Ok(RecorderHandle {
            recorder: Box::new(FaultyRecorder {
                tx: Some(tx),
                fail_next_stop: Arc::clone(&self.fail_next_stop),
                drop_stop_signal: self.drop_stop_signal.load(Ordering::SeqCst),
            }),
            events: rx,
        })
    }

    fn name(&self) -> &str {
        "Faulty"
    }
}

#[tokio::test]
async fn test_failed_recorder_stop_returns_session_to_idle() -> Result<()> {
    let platform = Arc::new(FaultyPlatform::default());
    let mut session = CaptureSession::new(platform.clone(), SessionConfig::default());

    session.start_camera().await?;
    session.start_recording().await?;
    platform.fail_next_stop.store(true, Ordering::SeqCst);

    let result = session.stop_recording().await;

    assert!(matches!(result, Err(CaptureError::Platform(_))), "got {:?}", result);
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(session.export_recording().is_err(), "Nothing should be published");

    // Stream is no longer pinned by the failed recording
    session.release()?;
    assert!(!session.has_active_stream());

    session.start_camera().await?;
    session.start_recording().await?;
    let finished = session.stop_recording().await?.expect("recording");

    assert!(finished.complete);
    assert_eq!(finished.chunk_count, 2);
    let export = session.export_recording()?;
    assert_eq!(&export.bytes[..], b"headtail");

    Ok(())
}

#[tokio::test]
async fn test_recording_without_completion_signal_is_flagged() -> Result<()> {
    let platform = Arc::new(FaultyPlatform::default());
    platform.drop_stop_signal.store(true, Ordering::SeqCst);
    let mut session = CaptureSession::new(platform.clone(), SessionConfig::default());

    session.start_camera().await?;
    session.start_recording().await?;
    let finished = session.stop_recording().await?.expect("recording");

    assert!(!finished.complete, "Truncated recording should be flagged");
    assert_eq!(finished.chunk_count, 2, "Chunks delivered before close are kept");
    assert_eq!(session.recording_state(), RecordingState::Finished);
    assert!(session.status().recording.is_some_and(|r| !r.complete));

    Ok(())
}
