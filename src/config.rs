use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::capture::{ChunkMode, Device, DeviceKind, PermissionPolicy, SimulatedConfig};
use crate::session::SessionConfig;

/// Prefix of environment overrides, e.g. `CLIP_RECORDER__SERVICE__HTTP__PORT`
const ENV_PREFIX: &str = "CLIP_RECORDER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub auth: AuthConfig,
    pub capture: CaptureSettings,
    /// Device inventory of the simulated platform
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Idle time after which a capture session is torn down; 0 keeps
    /// sessions until logout
    pub session_idle_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub cookie_name: String,
    /// Identity provider login URL
    pub login_url: String,
    /// Identity provider logout URL
    pub logout_url: String,
    #[serde(default)]
    pub users: Vec<AuthUser>,
}

/// Static token entry for `StaticAuthProvider`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub token: String,
    pub subject: String,
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    pub time_slice_ms: u64,
    pub mime_type: String,
    pub download_filename: String,
    pub permission: PermissionPolicy,
    /// Size of each synthetic chunk; 0 selects manual chunk delivery
    pub synthetic_chunk_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub label: String,
}

fn default_devices() -> Vec<DeviceEntry> {
    SimulatedConfig::default()
        .devices
        .into_iter()
        .map(|device| DeviceEntry {
            id: device.id,
            kind: device.kind,
            label: device.label,
        })
        .collect()
}

impl Config {
    /// Load configuration from `path` (extension optional), environment
    /// overrides and built-in defaults
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "clip-recorder")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3000)?
            .set_default("service.session_idle_secs", 1800)?
            .set_default("auth.cookie_name", "appSession")?
            .set_default("auth.login_url", "/login")?
            .set_default("auth.logout_url", "/login")?
            .set_default("capture.time_slice_ms", 1000)?
            .set_default("capture.mime_type", "video/webm")?
            .set_default("capture.download_filename", "recording.webm")?
            .set_default("capture.permission", "grant")?
            .set_default("capture.synthetic_chunk_bytes", 4096)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path))?;
        cfg.validate()
            .with_context(|| format!("Invalid configuration in {}", path))?;

        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.capture.time_slice_ms == 0 {
            bail!("capture.time_slice_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            time_slice: Duration::from_millis(self.capture.time_slice_ms),
            mime_type: self.capture.mime_type.clone(),
            download_filename: self.capture.download_filename.clone(),
        }
    }

    pub fn simulated_config(&self) -> SimulatedConfig {
        let chunk_mode = match self.capture.synthetic_chunk_bytes {
            0 => ChunkMode::Manual,
            chunk_bytes => ChunkMode::Synthetic { chunk_bytes },
        };

        SimulatedConfig {
            devices: self
                .devices
                .iter()
                .map(|entry| Device::new(entry.id.clone(), entry.kind, entry.label.clone()))
                .collect(),
            permission: self.capture.permission,
            chunk_mode,
        }
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        match self.service.session_idle_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
