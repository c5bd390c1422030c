use bytes::Bytes;
use futures::stream::{self, Stream};

/// Size of each part yielded by `RecordingExport::into_stream`
pub const EXPORT_PART_SIZE: usize = 64 * 1024;

/// A finished recording packaged for a save-to-disk action
#[derive(Debug, Clone)]
pub struct RecordingExport {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl RecordingExport {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// `Content-Disposition` value that makes browsers save the file
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// The bytes as a stream of parts of at most `EXPORT_PART_SIZE`
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        let bytes = self.bytes;
        let parts: Vec<Bytes> = (0..bytes.len())
            .step_by(EXPORT_PART_SIZE)
            .map(|start| bytes.slice(start..(start + EXPORT_PART_SIZE).min(bytes.len())))
            .collect();

        stream::iter(parts.into_iter().map(Ok))
    }
}
