use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Scheme and origin of every object URL handed out
const OBJECT_URL_PREFIX: &str = "blob:clip-recorder/";

/// Immutable recorded media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: String,
}

impl Blob {
    pub fn new(data: Bytes, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Cheap shared view of the bytes
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }
}

/// Table of live object URLs
///
/// A URL resolves to its blob until it is revoked. Revocation releases the
/// blob's memory once no export still holds the bytes.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    entries: HashMap<String, Blob>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return its new object URL
    pub fn create_object_url(&mut self, blob: Blob) -> String {
        let url = format!("{}{}", OBJECT_URL_PREFIX, Uuid::new_v4());
        debug!("Created object URL {} ({} bytes)", url, blob.size());
        self.entries.insert(url.clone(), blob);
        url
    }

    /// Returns true if the URL was live
    pub fn revoke_object_url(&mut self, url: &str) -> bool {
        let revoked = self.entries.remove(url).is_some();
        if revoked {
            debug!("Revoked object URL {}", url);
        }
        revoked
    }

    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.entries.get(url)
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn revoke_all(&mut self) {
        if !self.entries.is_empty() {
            info!("Revoking {} object URLs", self.entries.len());
        }
        self.entries.clear();
    }
}
