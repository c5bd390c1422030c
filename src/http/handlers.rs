use super::state::AppState;
use super::views;
use crate::auth::UserSession;
use crate::capture::{CaptureConfig, Device};
use crate::error::CaptureError;
use crate::session::{CaptureSession, CaptureStatus, FinishedRecording, RecordingExport};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DeviceEntry {
    pub id: String,
    pub label: String,
    /// Label shown in the picker ("Camera 1" when the label is hidden)
    pub display_label: String,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub cameras: Vec<DeviceEntry>,
    pub microphones: Vec<DeviceEntry>,
    pub selection: CaptureConfig,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub recording: Option<FinishedRecording>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackQuery {
    /// Object URL of a specific recording (defaults to the latest)
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Extract the value of cookie `name` from the request headers
fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<UserSession> {
    let token = session_token(headers, state.auth.cookie_name());
    state.auth.current_session(token.as_deref()).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Not authenticated".to_string(),
            code: "Unauthenticated".to_string(),
        }),
    )
        .into_response()
}

/// Resolve the caller's capture session, or a 401 response
async fn user_capture_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Arc<Mutex<CaptureSession>>, Response> {
    match current_user(state, headers).await {
        Some(user) => Ok(state.capture_session(&user.subject).await),
        None => Err(unauthorized()),
    }
}

fn capture_error_status(e: &CaptureError) -> StatusCode {
    match e {
        CaptureError::MediaAccessDenied => StatusCode::FORBIDDEN,
        CaptureError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CaptureError::DeviceBusy
        | CaptureError::StreamAlreadyActive
        | CaptureError::AlreadyRecording
        | CaptureError::NoActiveStream => StatusCode::CONFLICT,
        CaptureError::NoRecordingAvailable => StatusCode::NOT_FOUND,
        CaptureError::Platform(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn capture_error_response(e: &CaptureError) -> Response {
    warn!("Capture operation failed: {}", e);
    (
        capture_error_status(e),
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
        .into_response()
}

fn status_response(status: CaptureStatus) -> Response {
    (StatusCode::OK, Json(status)).into_response()
}

fn device_entries(devices: &[Device]) -> Vec<DeviceEntry> {
    devices
        .iter()
        .enumerate()
        .map(|(position, device)| DeviceEntry {
            id: device.id.clone(),
            label: device.label.clone(),
            display_label: device.display_label(position),
        })
        .collect()
}

fn devices_response(session: &CaptureSession) -> Response {
    let devices = session.devices();
    (
        StatusCode::OK,
        Json(DevicesResponse {
            cameras: device_entries(&devices.cameras),
            microphones: device_entries(&devices.microphones),
            selection: session.selection().clone(),
        }),
    )
        .into_response()
}

fn media_response(export: RecordingExport, disposition: Option<String>) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = export.mime_type.parse::<HeaderValue>() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, export.size().into());
    if let Some(value) = disposition.and_then(|d| d.parse::<HeaderValue>().ok()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (StatusCode::OK, headers, Body::from_stream(export.into_stream())).into_response()
}

// ============================================================================
// Pages and auth redirects
// ============================================================================

/// GET /
/// Capture view for authenticated users, login redirect otherwise
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = current_user(&state, &headers).await else {
        return Redirect::to("/login").into_response();
    };

    let capture = state.capture_session(&user.subject).await;
    let mut session = capture.lock().await;

    let notice = match session.enumerate_devices().await {
        Ok(_) => None,
        Err(e) => {
            error!("Device enumeration failed: {}", e);
            Some(e.to_string())
        }
    };

    let status = session.status();
    Html(views::capture_page(
        &user,
        session.devices(),
        &status,
        notice.as_deref(),
    ))
    .into_response()
}

/// GET /login
pub async fn login_page() -> impl IntoResponse {
    Html(views::login_page())
}

/// GET /auth/login
/// Hand off to the identity provider
pub async fn auth_login(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::to(state.auth.login_url())
}

/// GET /auth/logout
/// Tear down the caller's capture session and hand off to the identity provider
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(user) = current_user(&state, &headers).await {
        info!("Logging out {}", user.subject);
        state.end_session(&user.subject).await;
    }

    let clear_cookie = format!("{}=; Path=/; Max-Age=0", state.auth.cookie_name());
    (
        [(header::SET_COOKIE, clear_cookie)],
        Redirect::to(state.auth.logout_url()),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Capture API
// ============================================================================

/// GET /capture/devices
/// Devices from the last enumeration (enumerates on first call)
pub async fn list_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    if session.devices().is_empty() {
        if let Err(e) = session.enumerate_devices().await {
            return capture_error_response(&e);
        }
    }

    devices_response(&session)
}

/// POST /capture/devices/refresh
/// Re-enumerate devices (after plugging or unplugging hardware)
pub async fn refresh_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    match session.enumerate_devices().await {
        Ok(_) => devices_response(&session),
        Err(e) => capture_error_response(&e),
    }
}

/// PUT /capture/config
/// Change the selected devices, switching the live stream if one is open
pub async fn update_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(config): Json<CaptureConfig>,
) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    if session.has_active_stream() {
        if let Err(e) = session.switch_device(config).await {
            return capture_error_response(&e);
        }
    } else {
        session.select_devices(config);
    }

    status_response(session.status())
}

/// POST /capture/stream/start
pub async fn start_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    match session.start_camera().await {
        Ok(()) => status_response(session.status()),
        Err(e) => capture_error_response(&e),
    }
}

/// POST /capture/stream/stop
pub async fn stop_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    match session.release() {
        Ok(()) => status_response(session.status()),
        Err(e) => capture_error_response(&e),
    }
}

/// POST /capture/recording/start
pub async fn start_recording(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    match session.start_recording().await {
        Ok(()) => status_response(session.status()),
        Err(e) => capture_error_response(&e),
    }
}

/// POST /capture/recording/stop
pub async fn stop_recording(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let mut session = capture.lock().await;

    match session.stop_recording().await {
        Ok(recording) => {
            let status = if recording.is_some() { "finished" } else { "idle" };
            (
                StatusCode::OK,
                Json(StopRecordingResponse {
                    status: status.to_string(),
                    recording,
                }),
            )
                .into_response()
        }
        Err(e) => capture_error_response(&e),
    }
}

/// GET /capture/recording
/// Inline playback of the latest recording, or of `?url=<object URL>`
pub async fn play_recording(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PlaybackQuery>,
) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let session = capture.lock().await;

    let export = match query.url {
        Some(url) => session
            .resolve_url(&url)
            .ok_or(CaptureError::NoRecordingAvailable),
        None => session.export_recording(),
    };

    match export {
        Ok(export) => media_response(export, None),
        Err(e) => capture_error_response(&e),
    }
}

/// GET /capture/recording/download
/// Latest recording as an attachment
pub async fn download_recording(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let session = capture.lock().await;

    match session.export_recording() {
        Ok(export) => {
            info!("Serving download {} ({} bytes)", export.filename, export.size());
            let disposition = export.content_disposition();
            media_response(export, Some(disposition))
        }
        Err(e) => capture_error_response(&e),
    }
}

/// GET /capture/status
pub async fn get_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let capture = match user_capture_session(&state, &headers).await {
        Ok(capture) => capture,
        Err(response) => return response,
    };
    let session = capture.lock().await;

    status_response(session.status())
}
