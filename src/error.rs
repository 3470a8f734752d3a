use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{policy::Bucket, storage::Provider};

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The local upload root was empty.
    #[error("local storage root path cannot be empty")]
    EmptyRootPath,
    /// A bucket, account or container name was empty.
    #[error("`{field}` cannot be empty")]
    EmptyName {
        /// Name of the offending setting.
        field: &'static str,
    },
    /// The selected provider has no configuration section.
    #[error("provider `{provider}` is selected but has no configuration section")]
    MissingProviderSection {
        /// Selected provider.
        provider: Provider,
    },
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
    /// The client timeout must be non-zero.
    #[error("client timeout must be greater than 0")]
    InvalidTimeout,
    /// A provider name could not be parsed.
    #[error("unknown storage provider `{name}`")]
    UnknownProvider {
        /// The unrecognised name.
        name: String,
    },
    /// The provider SDK refused to build a client from the configuration.
    #[error("failed to build `{provider}` backend: {message}")]
    BackendInit {
        /// Provider whose client failed to build.
        provider: Provider,
        /// Underlying failure message.
        message: String,
    },
}

/// Message-sequence violations detected while assembling an upload stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A chunk arrived before any metadata message.
    #[error("chunk data received before metadata")]
    ChunkBeforeMetadata,
    /// A second metadata message arrived.
    #[error("metadata received more than once")]
    DuplicateMetadata,
    /// The stream completed without ever sending metadata.
    #[error("stream completed without metadata")]
    MissingMetadata,
    /// A message arrived after the stream had already failed.
    #[error("stream already failed")]
    StreamFailed,
}

/// Failures of the message channel carrying one upload stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The sender aborted the stream.
    #[error("stream aborted by sender: {reason}")]
    Aborted {
        /// Reason supplied by the sender.
        reason: String,
    },
    /// The sender went away without finishing the stream.
    #[error("sender disconnected before completing the stream")]
    Disconnected,
    /// The receiving side is no longer listening.
    #[error("stream is closed")]
    Closed,
}

/// Storage backend failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The payload had no bytes.
    #[error("payload `{name}` is empty")]
    EmptyPayload {
        /// Original file name.
        name: String,
    },
    /// The payload exceeds the backend size policy for its bucket.
    #[error("{bucket} payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Bucket the payload was routed to.
        bucket: Bucket,
        /// Payload size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// The original name cannot be stored as a single object name.
    #[error("`{name}` is not a valid object name")]
    InvalidName {
        /// Original file name.
        name: String,
    },
    /// The resolved destination left the configured upload root.
    #[error("refusing to store `{name}` outside of the `{bucket}` folder")]
    PathEscape {
        /// Original file name.
        name: String,
        /// Bucket the payload was routed to.
        bucket: Bucket,
    },
    /// Local filesystem failure.
    #[error("{context}: {source}")]
    Io {
        /// What the backend was doing.
        context: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The provider API or its transport failed.
    #[error("{provider} backend unavailable: {source}")]
    BackendUnavailable {
        /// Provider that failed.
        provider: Provider,
        /// Underlying provider error.
        #[source]
        source: object_store::Error,
    },
}

impl StorageError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    pub(crate) fn unavailable(provider: Provider) -> impl FnOnce(object_store::Error) -> Self {
        move |source| Self::BackendUnavailable { provider, source }
    }
}

/// Server-side failure of one upload or delete operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed message sequence.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The stream was aborted or disconnected.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure category carried by a [`Status`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Malformed message sequence; restart the whole operation.
    ProtocolViolation,
    /// Backend size policy violated.
    PayloadTooLarge,
    /// Provider transport or API failure; may be retried.
    BackendUnavailable,
    /// Payload rejected by the backend (empty, unsafe name).
    InvalidPayload,
    /// Stream aborted or disconnected before completion.
    Cancelled,
    /// Any other storage failure.
    Internal,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProtocolViolation => "protocol violation",
            Self::PayloadTooLarge => "payload too large",
            Self::BackendUnavailable => "backend unavailable",
            Self::InvalidPayload => "invalid payload",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        })
    }
}

/// Structured error sent as the terminal message of a failed operation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Status {
    /// Failure category.
    pub code: Code,
    /// Human-readable detail.
    pub message: String,
}

impl Status {
    /// Creates a status from a code and message.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a [`Code::BackendUnavailable`] status.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::BackendUnavailable, message)
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::Protocol(_) => Code::ProtocolViolation,
            ServiceError::Transport(_) => Code::Cancelled,
            ServiceError::Storage(storage) => match storage {
                StorageError::PayloadTooLarge { .. } => Code::PayloadTooLarge,
                StorageError::BackendUnavailable { .. } => Code::BackendUnavailable,
                StorageError::EmptyPayload { .. }
                | StorageError::InvalidName { .. }
                | StorageError::PathEscape { .. } => Code::InvalidPayload,
                StorageError::Io { .. } => Code::Internal,
            },
        };
        Self::new(code, err.to_string())
    }
}

impl From<ProtocolError> for Status {
    fn from(err: ProtocolError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<TransportError> for Status {
    fn from(err: TransportError) -> Self {
        ServiceError::from(err).into()
    }
}

/// Caller-facing failure of a client or bridge operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// No terminal response arrived before the deadline.
    #[error("no response from storage service after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },
    /// The service answered with an error, or could not be reached.
    #[error("storage service failed: {0}")]
    Remote(#[from] Status),
    /// Reading the local payload source failed.
    #[error("failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns the remote status code when the failure came from the service.
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Remote(status) => Some(status.code),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Remote(Status::unavailable(err.to_string()))
    }
}
