//! HTTP gate and capture API
//!
//! Pages (authentication gate):
//! - GET / - Capture view, or redirect to /login without a session
//! - GET /login - Login page
//! - GET /auth/login, GET /auth/logout - Identity provider redirects
//!
//! Capture API (requires a session):
//! - GET /capture/devices, POST /capture/devices/refresh
//! - PUT /capture/config - Select devices (switches a live stream)
//! - POST /capture/stream/start, POST /capture/stream/stop
//! - POST /capture/recording/start, POST /capture/recording/stop
//! - GET /capture/recording - Inline playback
//! - GET /capture/recording/download - recording.webm attachment
//! - GET /capture/status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod views;

pub use routes::create_router;
pub use state::{AppState, SessionEntry};
