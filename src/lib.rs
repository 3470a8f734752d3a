#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core crate surface for `blobway`.
//!
//! A file travels as one metadata message followed by ordered chunks. The
//! [`StorageServer`] reassembles each stream and hands the payload to exactly
//! one [`StorageBackend`] call; [`BlockingStorageClient`] wraps the whole
//! exchange into a single bounded call.

/// Blocking call/return bridge.
pub mod bridge;
/// Fluent configuration builder.
pub mod builder;
/// Async streaming client.
pub mod client;
/// Backend and client configuration.
pub mod config;
/// Error types exposed by this crate.
pub mod error;
/// Backend size limits.
pub mod limits;
/// Bucket routing and key derivation.
pub mod policy;
/// Wire messages and stream assembly.
pub mod protocol;
/// Upload stream handler and delete handler.
pub mod server;
/// Storage backend trait and implementations.
pub mod storage;
/// Message channel between clients and the server.
pub mod transport;

pub use bridge::{BlockingStorageClient, Completion};
pub use builder::StorageConfigBuilder;
pub use client::StorageClient;
pub use config::{AwsConfig, AzureConfig, ClientConfig, LocalConfig, StorageConfig};
pub use error::{
    ClientError, Code, ConfigError, ProtocolError, ServiceError, Status, StorageError,
    TransportError,
};
pub use limits::SizeLimits;
pub use policy::Bucket;
pub use protocol::{
    AssemblyState, DeleteRequest, ObjectDescriptor, UploadAssembler, UploadMetadata,
    UploadRequest,
};
pub use server::StorageServer;
pub use storage::{
    select_backend, AwsBackend, AzureBackend, LocalBackend, LocalBackendBuilder, Payload,
    Provider, StorageBackend,
};
pub use transport::{
    upload_channel, InProcessTransport, ResponseHandle, Transport, UploadCall, UploadReceiver,
    UploadSender,
};
