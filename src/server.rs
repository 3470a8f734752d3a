use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::{
    config::StorageConfig,
    error::{ConfigError, ServiceError, Status, TransportError},
    protocol::{DeleteRequest, ObjectDescriptor, UploadAssembler, UploadRequest},
    storage::{select_backend, StorageBackend},
};

/// Server side of the storage service: drives upload streams and deletes
/// against the single active backend.
///
/// One instance is shared by all concurrent streams. Per-stream state lives in
/// the [`UploadAssembler`] owned by each [`StorageServer::upload`] call.
#[derive(Clone)]
pub struct StorageServer {
    backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for StorageServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageServer")
            .field("provider", &self.backend.provider())
            .finish()
    }
}

impl StorageServer {
    /// Creates a server over an already constructed backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Selects and builds the configured backend, then wraps it.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(select_backend(config).await?))
    }

    /// Returns the active backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Consumes one upload stream and returns its terminal response.
    ///
    /// The backend is invoked exactly once, and only after the stream completes
    /// without a violation. Aborted or disconnected streams never reach it.
    pub async fn upload<S>(&self, stream: S) -> Result<ObjectDescriptor, Status>
    where
        S: Stream<Item = Result<UploadRequest, TransportError>> + Unpin + Send,
    {
        self.handle_upload(stream).await.map_err(|err| {
            let status = Status::from(err);
            tracing::warn!(code = ?status.code, error = %status.message, "upload stream failed");
            status
        })
    }

    async fn handle_upload<S>(&self, mut stream: S) -> Result<ObjectDescriptor, ServiceError>
    where
        S: Stream<Item = Result<UploadRequest, TransportError>> + Unpin + Send,
    {
        let mut assembler = UploadAssembler::new();

        while let Some(message) = stream.next().await {
            let request = message?;
            tracing::trace!(message = request.tag(), "upload message received");
            assembler.push(request)?;
        }

        let payload = assembler.finish()?;
        tracing::debug!(
            name = payload.name.as_str(),
            size = payload.size(),
            bucket = %payload.bucket(),
            "upload stream complete, dispatching to backend"
        );

        let descriptor = self.backend.upload(payload).await?;
        tracing::info!(reference = descriptor.reference.as_str(), "upload stored");
        Ok(descriptor)
    }

    /// Deletes the object named by `request.reference`.
    pub async fn delete(&self, request: DeleteRequest) -> Result<(), Status> {
        self.backend
            .delete(&request.reference)
            .await
            .map_err(|err| {
                tracing::warn!(reference = request.reference.as_str(), error = %err, "delete failed");
                Status::from(err)
            })
    }
}
