use bytes::{Bytes, BytesMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::RecorderEvent;
use super::blob::Blob;

/// Chunks collected from one recorder run, in arrival order
#[derive(Debug, Clone, Default)]
pub struct RecordedChunks {
    chunks: Vec<Bytes>,
    /// True when the recorder sent `Stopped` (false if the channel just closed)
    pub completed: bool,
}

impl RecordedChunks {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.iter().map(Bytes::len).collect()
    }

    /// Concatenate every chunk into one blob
    pub fn into_blob(self, mime_type: &str) -> Blob {
        let mut buffer = BytesMut::with_capacity(self.total_bytes());
        for chunk in &self.chunks {
            buffer.extend_from_slice(chunk);
        }

        Blob::new(buffer.freeze(), mime_type)
    }
}

/// Ordered consumer of a recorder's event channel
///
/// Appends every non-empty chunk in the order it was delivered and stops on
/// the completion signal.
pub struct ChunkCollector {
    collected: RecordedChunks,
    /// Shared count of chunks appended so far
    progress: Arc<AtomicUsize>,
}

impl ChunkCollector {
    pub fn new() -> Self {
        Self::with_progress(Arc::new(AtomicUsize::new(0)))
    }

    pub fn with_progress(progress: Arc<AtomicUsize>) -> Self {
        progress.store(0, Ordering::SeqCst);
        Self {
            collected: RecordedChunks::default(),
            progress,
        }
    }

    /// Drain events until `Stopped` or until the sender side closes
    pub async fn collect(mut self, mut events: mpsc::Receiver<RecorderEvent>) -> RecordedChunks {
        debug!("Chunk collector started");

        while let Some(event) = events.recv().await {
            match event {
                RecorderEvent::Data(chunk) if chunk.is_empty() => {
                    debug!("Skipping empty chunk");
                }
                RecorderEvent::Data(chunk) => {
                    debug!(
                        "Chunk {} received ({} bytes)",
                        self.collected.chunks.len(),
                        chunk.len()
                    );
                    self.collected.chunks.push(chunk);
                    self.progress.fetch_add(1, Ordering::SeqCst);
                }
                RecorderEvent::Stopped => {
                    self.collected.completed = true;
                    break;
                }
            }
        }

        if !self.collected.completed {
            warn!("Recorder channel closed without a stop signal");
        }

        info!(
            "Chunk collection complete: {} chunks, {} bytes",
            self.collected.len(),
            self.collected.total_bytes()
        );

        self.collected
    }
}

impl Default for ChunkCollector {
    fn default() -> Self {
        Self::new()
    }
}
