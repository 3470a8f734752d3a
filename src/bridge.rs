//! Blocking call/return adapter over the async upload stream.
//!
//! The calling thread parks on a one-shot [`Completion`] while the stream runs
//! on a tokio runtime. Every wait is bounded by the configured timeout; on
//! expiry the in-flight task is aborted, which drops the stream without a
//! completion signal so the server never dispatches it.
//!
//! Do not call these methods from a runtime worker thread: blocking there can
//! starve the very task being waited on.

use std::{
    future::Future,
    io::{self, Read},
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use bytes::Bytes;
use tokio::runtime::Handle;

use crate::{
    client::StorageClient,
    config::ClientConfig,
    error::{ClientError, ConfigError},
    protocol::{ObjectDescriptor, UploadMetadata},
    transport::Transport,
};

/// Write-once slot with a gate that opens when the slot is filled.
#[derive(Debug)]
pub struct Completion<T> {
    slot: Mutex<Option<T>>,
    gate: Condvar,
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Completion<T> {
    /// Creates an unsettled completion.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            gate: Condvar::new(),
        }
    }

    /// Stores `value` and opens the gate.
    ///
    /// Only the first call has an effect; later values are dropped and `false`
    /// is returned.
    pub fn settle(&self, value: T) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.gate.notify_all();
        true
    }

    /// Reports whether the gate has opened.
    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Blocks until the gate opens or `timeout` elapses, then takes the value.
    ///
    /// Returns `None` on timeout.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .gate
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

/// Blocking facade over [`StorageClient`].
#[derive(Debug)]
pub struct BlockingStorageClient<T> {
    client: Arc<StorageClient<T>>,
    handle: Handle,
    timeout: Duration,
}

impl<T> Clone for BlockingStorageClient<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            handle: self.handle.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> BlockingStorageClient<T> {
    /// Creates a bridge running streams on `handle` with default settings.
    pub fn new(transport: T, handle: Handle) -> Self {
        let client = StorageClient::new(transport);
        let timeout = client.config().timeout;
        Self {
            client: Arc::new(client),
            handle,
            timeout,
        }
    }

    /// Creates a bridge with explicit validated settings.
    pub fn with_config(
        transport: T,
        handle: Handle,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        let client = StorageClient::with_config(transport, config)?;
        Ok(Self {
            client: Arc::new(client),
            handle,
            timeout: config.timeout,
        })
    }

    /// Deadline applied to every call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the wrapped async client.
    pub fn client(&self) -> &Arc<StorageClient<T>> {
        &self.client
    }

    /// Uploads `payload` and blocks until the descriptor, an error, or the deadline.
    pub fn upload(
        &self,
        metadata: UploadMetadata,
        payload: impl Into<Bytes>,
    ) -> Result<ObjectDescriptor, ClientError> {
        let client = Arc::clone(&self.client);
        let payload = payload.into();
        self.block_on(async move { client.upload(metadata, payload).await })
    }

    /// Reads `source` to the end, then uploads it like [`Self::upload`].
    ///
    /// The read runs on the runtime's blocking pool and counts against the
    /// same deadline as the upload itself. A source still stalled at the
    /// deadline is left to finish on that pool; its bytes are discarded.
    pub fn upload_reader<R>(
        &self,
        metadata: UploadMetadata,
        mut source: R,
    ) -> Result<ObjectDescriptor, ClientError>
    where
        R: Read + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        self.block_on(async move {
            let payload = tokio::task::spawn_blocking(move || {
                let mut payload = Vec::new();
                source.read_to_end(&mut payload).map(|_| payload)
            })
            .await
            .map_err(io::Error::other)??;

            client.upload(metadata, Bytes::from(payload)).await
        })
    }

    /// Deletes the object behind `reference`, bounded by the same deadline.
    pub fn delete(&self, reference: impl Into<String>) -> Result<(), ClientError> {
        let client = Arc::clone(&self.client);
        let reference = reference.into();
        self.block_on(async move { client.delete(reference).await })
    }

    fn block_on<F, O>(&self, operation: F) -> Result<O, ClientError>
    where
        F: Future<Output = Result<O, ClientError>> + Send + 'static,
        O: Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let settle = Arc::clone(&completion);
        let task = self.handle.spawn(async move {
            settle.settle(operation.await);
        });

        match completion.wait(self.timeout) {
            Some(outcome) => outcome,
            None => {
                task.abort();
                tracing::warn!(timeout = ?self.timeout, "storage call timed out, stream abandoned");
                Err(ClientError::Timeout {
                    after: self.timeout,
                })
            }
        }
    }
}

