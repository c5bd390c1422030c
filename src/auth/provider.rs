use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::AuthConfig;

/// Authenticated user identity and display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Stable user identifier
    pub subject: String,
    /// Display name
    pub name: String,
    /// Avatar image URL
    pub picture: String,
}

/// Authentication provider
///
/// Implementations:
/// - Static: fixed token table from configuration (local development)
/// - Hosted identity providers live outside this crate
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the session behind a session token, if any
    async fn current_session(&self, token: Option<&str>) -> Option<UserSession>;

    /// Where `/auth/login` redirects to
    fn login_url(&self) -> &str;

    /// Where `/auth/logout` redirects to
    fn logout_url(&self) -> &str;

    /// Cookie carrying the session token
    fn cookie_name(&self) -> &str;
}

/// Provider backed by a fixed token → user table
pub struct StaticAuthProvider {
    cookie_name: String,
    login_url: String,
    logout_url: String,
    sessions: HashMap<String, UserSession>,
}

impl StaticAuthProvider {
    pub fn new(config: &AuthConfig) -> Self {
        let sessions: HashMap<String, UserSession> = config
            .users
            .iter()
            .map(|user| {
                (
                    user.token.clone(),
                    UserSession {
                        subject: user.subject.clone(),
                        name: user.name.clone(),
                        picture: user.picture.clone(),
                    },
                )
            })
            .collect();

        info!("Static auth provider initialized ({} users)", sessions.len());

        Self {
            cookie_name: config.cookie_name.clone(),
            login_url: config.login_url.clone(),
            logout_url: config.logout_url.clone(),
            sessions,
        }
    }
}

#[async_trait::async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_session(&self, token: Option<&str>) -> Option<UserSession> {
        let session = token.and_then(|token| self.sessions.get(token)).cloned();
        if session.is_none() {
            debug!("No session for request");
        }
        session
    }

    fn login_url(&self) -> &str {
        &self.login_url
    }

    fn logout_url(&self) -> &str {
        &self.logout_url
    }

    fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}
