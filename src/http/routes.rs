use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Gate
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page))
        .route("/auth/login", get(handlers::auth_login))
        .route("/auth/logout", get(handlers::auth_logout))
        // Devices
        .route("/capture/devices", get(handlers::list_devices))
        .route("/capture/devices/refresh", post(handlers::refresh_devices))
        .route("/capture/config", put(handlers::update_config))
        // Stream control
        .route("/capture/stream/start", post(handlers::start_stream))
        .route("/capture/stream/stop", post(handlers::stop_stream))
        // Recording control
        .route("/capture/recording/start", post(handlers::start_recording))
        .route("/capture/recording/stop", post(handlers::stop_recording))
        .route("/capture/recording", get(handlers::play_recording))
        .route(
            "/capture/recording/download",
            get(handlers::download_recording),
        )
        .route("/capture/status", get(handlers::get_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
