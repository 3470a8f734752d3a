use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::{
    config::ClientConfig,
    error::{ClientError, ConfigError, TransportError},
    protocol::{DeleteRequest, ObjectDescriptor, UploadMetadata, UploadRequest},
    transport::{Transport, UploadSender},
};

/// Async client speaking the chunked upload protocol over a [`Transport`].
#[derive(Debug, Clone)]
pub struct StorageClient<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> StorageClient<T> {
    /// Creates a client with default settings.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
        }
    }

    /// Creates a client with explicit validated settings.
    pub fn with_config(transport: T, config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// Returns the active settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Uploads an in-memory payload as metadata followed by fixed-size chunks.
    pub async fn upload(
        &self,
        metadata: UploadMetadata,
        payload: Bytes,
    ) -> Result<ObjectDescriptor, ClientError> {
        let call = self.transport.open_upload().await?;
        let chunk_size = self.config.chunk_size.max(1);

        let sent = send_all(&call.sender, metadata, chunks(payload, chunk_size)).await;
        if sent.is_ok() {
            // a closed stream already carries the server's verdict
            let _ = call.sender.finish().await;
        }

        Ok(call.response.outcome().await?)
    }

    /// Uploads everything `reader` yields, reading one chunk at a time.
    ///
    /// A read failure aborts the stream so the server never stores a partial file.
    pub async fn upload_reader<R>(
        &self,
        metadata: UploadMetadata,
        reader: R,
    ) -> Result<ObjectDescriptor, ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let call = self.transport.open_upload().await?;
        let mut chunks = ReaderStream::with_capacity(reader, self.config.chunk_size.max(1));

        if call.sender.send(UploadRequest::Metadata(metadata)).await.is_err() {
            return Ok(call.response.outcome().await?);
        }

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    if call.sender.send(UploadRequest::ChunkData(chunk)).await.is_err() {
                        return Ok(call.response.outcome().await?);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "aborting upload after a read failure");
                    let _ = call.sender.abort(err.to_string()).await;
                    return Err(ClientError::Io(err));
                }
            }
        }

        let _ = call.sender.finish().await;
        Ok(call.response.outcome().await?)
    }

    /// Deletes the object behind `reference`.
    pub async fn delete(&self, reference: impl Into<String>) -> Result<(), ClientError> {
        Ok(self.transport.delete(DeleteRequest::new(reference)).await?)
    }
}

fn chunks(payload: Bytes, chunk_size: usize) -> impl Iterator<Item = Bytes> {
    let len = payload.len();
    (0..len)
        .step_by(chunk_size)
        .map(move |start| payload.slice(start..(start + chunk_size).min(len)))
}

async fn send_all(
    sender: &UploadSender,
    metadata: UploadMetadata,
    chunks: impl Iterator<Item = Bytes>,
) -> Result<(), TransportError> {
    sender.send(UploadRequest::Metadata(metadata)).await?;
    for chunk in chunks {
        sender.send(UploadRequest::ChunkData(chunk)).await?;
    }
    Ok(())
}

