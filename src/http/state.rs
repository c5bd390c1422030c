use crate::auth::AuthProvider;
use crate::capture::MediaPlatform;
use crate::session::{CaptureSession, SessionConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

/// Capture session of one subject with its last access time
pub struct SessionEntry {
    pub session: Arc<Mutex<CaptureSession>>,
    pub last_seen: Instant,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication collaborator
    pub auth: Arc<dyn AuthProvider>,

    /// Capture/record platform shared by every session
    pub platform: Arc<dyn MediaPlatform>,

    /// Configuration applied to new capture sessions
    pub session_config: SessionConfig,

    /// Capture sessions (user subject → session)
    ///
    /// Entries leave the map on logout or through `evict_idle`; a subject
    /// that does neither keeps its stream and blobs alive.
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        platform: Arc<dyn MediaPlatform>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            auth,
            platform,
            session_config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Capture session of `subject`, created on first use
    pub async fn capture_session(&self, subject: &str) -> Arc<Mutex<CaptureSession>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(subject.to_string()).or_insert_with(|| {
            info!("Creating capture session for {}", subject);
            SessionEntry {
                session: Arc::new(Mutex::new(CaptureSession::new(
                    Arc::clone(&self.platform),
                    self.session_config.clone(),
                ))),
                last_seen: Instant::now(),
            }
        });
        entry.last_seen = Instant::now();

        Arc::clone(&entry.session)
    }

    /// Tear down and forget the capture session of `subject`
    pub async fn end_session(&self, subject: &str) {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(subject)
        };

        if let Some(entry) = entry {
            close_session(subject, &entry.session).await;
        }
    }

    /// Tear down sessions not accessed for at least `max_idle`
    ///
    /// Sessions that are recording or busy serving a request are kept.
    /// Returns the number of sessions evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<(String, SessionEntry)> = {
            let mut sessions = self.sessions.write().await;
            let stale: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| entry.last_seen.elapsed() >= max_idle)
                .filter(|(_, entry)| match entry.session.try_lock() {
                    Ok(session) => !session.is_recording(),
                    Err(_) => false,
                })
                .map(|(subject, _)| subject.clone())
                .collect();

            stale
                .into_iter()
                .filter_map(|subject| sessions.remove_entry(&subject))
                .collect()
        };

        for (subject, entry) in &evicted {
            info!("Evicting idle capture session for {}", subject);
            close_session(subject, &entry.session).await;
        }

        evicted.len()
    }
}

async fn close_session(subject: &str, session: &Mutex<CaptureSession>) {
    let mut session = session.lock().await;
    if let Err(e) = session.close().await {
        error!("Failed to close capture session for {}: {}", subject, e);
    }
}
