use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{Status, TransportError},
    protocol::{DeleteRequest, ObjectDescriptor, UploadRequest},
    server::StorageServer,
};

/// Default number of in-flight messages per upload stream.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
enum Frame {
    Request(UploadRequest),
    Finish,
    Abort(String),
}

/// Creates a connected sender/receiver pair for one upload stream.
pub fn upload_channel(capacity: usize) -> (UploadSender, UploadReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        UploadSender { tx },
        UploadReceiver {
            rx,
            terminated: false,
        },
    )
}

/// Sending half of an upload stream.
///
/// Dropping the sender without calling [`UploadSender::finish`] is observed by
/// the receiver as [`TransportError::Disconnected`].
#[derive(Debug)]
pub struct UploadSender {
    tx: mpsc::Sender<Frame>,
}

impl UploadSender {
    /// Sends the next message, waiting for channel capacity.
    pub async fn send(&self, request: UploadRequest) -> Result<(), TransportError> {
        self.tx
            .send(Frame::Request(request))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Marks the stream complete.
    pub async fn finish(self) -> Result<(), TransportError> {
        self.tx
            .send(Frame::Finish)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Aborts the stream with `reason`.
    pub async fn abort(self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.tx
            .send(Frame::Abort(reason.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Receiving half of an upload stream.
///
/// Yields requests until the sender finishes (end of stream), aborts or
/// disconnects (one error item, then end of stream).
#[derive(Debug)]
pub struct UploadReceiver {
    rx: mpsc::Receiver<Frame>,
    terminated: bool,
}

impl Stream for UploadReceiver {
    type Item = Result<UploadRequest, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Frame::Request(request))) => Poll::Ready(Some(Ok(request))),
            Poll::Ready(Some(Frame::Finish)) => {
                self.terminated = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Frame::Abort(reason))) => {
                self.terminated = true;
                Poll::Ready(Some(Err(TransportError::Aborted { reason })))
            }
            Poll::Ready(None) => {
                self.terminated = true;
                Poll::Ready(Some(Err(TransportError::Disconnected)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Pending terminal response of one upload call.
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Result<ObjectDescriptor, Status>>,
}

impl ResponseHandle {
    /// Wraps the receiving side of a response slot.
    pub fn new(rx: oneshot::Receiver<Result<ObjectDescriptor, Status>>) -> Self {
        Self { rx }
    }

    /// Waits for the terminal response.
    ///
    /// A server that goes away without answering yields a
    /// [`crate::error::Code::BackendUnavailable`] status.
    pub async fn outcome(self) -> Result<ObjectDescriptor, Status> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Status::unavailable("storage service dropped the call")),
        }
    }
}

/// An opened upload call: the request stream plus its pending response.
#[derive(Debug)]
pub struct UploadCall {
    /// Request stream towards the server.
    pub sender: UploadSender,
    /// Terminal response from the server.
    pub response: ResponseHandle,
}

/// Connection from a client to the storage service.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a new client-streaming upload call.
    async fn open_upload(&self) -> Result<UploadCall, TransportError>;

    /// Performs a unary delete call.
    async fn delete(&self, request: DeleteRequest) -> Result<(), Status>;
}

/// Transport that drives a [`StorageServer`] in the same process.
///
/// Every opened upload runs as its own tokio task, so concurrent streams
/// share nothing but the backend.
#[derive(Debug, Clone)]
pub struct InProcessTransport {
    server: Arc<StorageServer>,
    capacity: usize,
}

impl InProcessTransport {
    /// Creates a transport over `server`.
    pub fn new(server: Arc<StorageServer>) -> Self {
        Self {
            server,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Sets the per-stream channel capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Returns the served storage server.
    pub fn server(&self) -> &Arc<StorageServer> {
        &self.server
    }
}

#[async_trait::async_trait]
impl Transport for InProcessTransport {
    async fn open_upload(&self) -> Result<UploadCall, TransportError> {
        let (sender, receiver) = upload_channel(self.capacity);
        let (tx, rx) = oneshot::channel();
        let server = Arc::clone(&self.server);
        let span = tracing::info_span!("upload_stream", stream_id = %Uuid::new_v4());

        tokio::spawn(
            async move {
                let outcome = server.upload(receiver).await;
                if tx.send(outcome).is_err() {
                    tracing::debug!("caller went away before the upload response");
                }
            }
            .instrument(span),
        );

        Ok(UploadCall {
            sender,
            response: ResponseHandle::new(rx),
        })
    }

    async fn delete(&self, request: DeleteRequest) -> Result<(), Status> {
        self.server.delete(request).await
    }
}
