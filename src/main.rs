use anyhow::{Context, Result};
use clap::Parser;
use clip_recorder::{create_router, AppState, Config, SimulatedPlatform, StaticAuthProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "clip-recorder")]
#[command(about = "Record short camera clips behind an authentication gate")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/clip-recorder")]
    config: String,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Clip Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Recorder: {} slices of {}ms, download as {}",
        cfg.capture.mime_type, cfg.capture.time_slice_ms, cfg.capture.download_filename
    );

    let platform = Arc::new(SimulatedPlatform::new(cfg.simulated_config()));
    let auth = Arc::new(StaticAuthProvider::new(&cfg.auth));
    let state = AppState::new(auth, platform, cfg.session_config());

    if let Some(max_idle) = cfg.session_idle_timeout() {
        let sweeper = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval((max_idle / 2).max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                let evicted = sweeper.evict_idle(max_idle).await;
                if evicted > 0 {
                    info!("Evicted {} idle capture sessions", evicted);
                }
            }
        });
    }

    let address = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("HTTP server listening on {}", address);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
