use bytes::Bytes;

/// File metadata sent once, as the first message of an upload stream.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Original file name.
    pub name: String,
    /// Declared MIME type; empty when unknown.
    pub content_type: String,
}

impl UploadMetadata {
    /// Creates metadata from a name and content type.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Client-to-server message of an upload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRequest {
    /// File metadata; must be first and must appear once.
    Metadata(UploadMetadata),
    /// Next slice of the payload, in order.
    ChunkData(Bytes),
}

impl UploadRequest {
    /// Short tag used in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::ChunkData(_) => "chunk-data",
        }
    }
}

/// Record identifying a stored object; the terminal success message of an upload.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Original file name.
    pub name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// URL or key accepted by the same backend's delete operation.
    pub reference: String,
    /// Stored size in bytes.
    pub size: u64,
}

/// Unary delete request.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Reference previously returned in an [`ObjectDescriptor`].
    pub reference: String,
}

impl DeleteRequest {
    /// Creates a delete request for `reference`.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}
