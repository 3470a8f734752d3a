//! Storage backend abstraction and the three provider implementations.

use std::{fmt, str::FromStr, sync::Arc};

use bytes::Bytes;
use object_store::{path::Path, Attribute, Attributes, PutOptions};

use crate::{
    config::StorageConfig,
    error::{ConfigError, StorageError},
    protocol::ObjectDescriptor,
};

pub use crate::policy::Bucket;

/// Amazon S3 backend.
pub mod aws;
/// Azure Blob Storage backend.
pub mod azure;
/// Local filesystem backend.
pub mod local;
pub use aws::AwsBackend;
pub use azure::AzureBackend;
pub use local::{LocalBackend, LocalBackendBuilder};

/// Storage provider identity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// Local filesystem.
    #[default]
    Local,
    /// Amazon S3.
    Aws,
    /// Azure Blob Storage.
    Azure,
}

impl Provider {
    /// Lowercase configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Aws => "aws",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::UnknownProvider {
                name: value.to_owned(),
            }),
        }
    }
}

/// A fully assembled file handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Original file name.
    pub name: String,
    /// Declared MIME type; empty when unknown.
    pub content_type: String,
    /// File content.
    pub bytes: Bytes,
}

impl Payload {
    /// Creates a payload.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Bucket this payload routes to.
    pub fn bucket(&self) -> Bucket {
        Bucket::for_content_type(&self.content_type)
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<(), StorageError> {
        if self.bytes.is_empty() {
            tracing::warn!(name = self.name.as_str(), "upload attempt with an empty payload");
            return Err(StorageError::EmptyPayload {
                name: self.name.clone(),
            });
        }

        Ok(())
    }

    pub(crate) fn describe(&self, reference: String) -> ObjectDescriptor {
        ObjectDescriptor {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            reference,
            size: self.size(),
        }
    }
}

/// Parses a generated object key, rejecting original names that would split
/// into several path segments or that the store cannot represent.
pub(crate) fn object_key(key: &str, name: &str) -> Result<Path, StorageError> {
    let invalid = || {
        tracing::warn!(name, "upload attempt with an invalid object name");
        StorageError::InvalidName {
            name: name.to_owned(),
        }
    };

    if name.contains('/') {
        return Err(invalid());
    }
    Path::parse(key).map_err(|_| invalid())
}

/// Put options carrying the declared content type, when there is one.
pub(crate) fn put_options(payload: &Payload) -> PutOptions {
    let mut attributes = Attributes::new();
    if !payload.content_type.is_empty() {
        attributes.insert(Attribute::ContentType, payload.content_type.clone().into());
    }

    PutOptions {
        attributes,
        ..PutOptions::default()
    }
}

/// Provider-agnostic storage capability shared by every concurrent stream.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Provider identity.
    fn provider(&self) -> Provider;

    /// Stores one payload and returns its descriptor.
    async fn upload(&self, payload: Payload) -> Result<ObjectDescriptor, StorageError>;

    /// Stores each payload in turn, skipping the ones that fail.
    async fn upload_many(&self, payloads: Vec<Payload>) -> Vec<ObjectDescriptor> {
        let mut stored = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let name = payload.name.clone();
            match self.upload(payload).await {
                Ok(descriptor) => stored.push(descriptor),
                Err(err) => {
                    tracing::error!(
                        provider = %self.provider(),
                        name = name.as_str(),
                        error = %err,
                        "failed to upload one of the files in batch"
                    );
                }
            }
        }
        stored
    }

    /// Deletes the object behind `reference`.
    ///
    /// Missing objects and unrecognised references are logged no-ops.
    async fn delete(&self, reference: &str) -> Result<(), StorageError>;

    /// Reports whether the object behind `reference` currently exists.
    async fn exists(&self, reference: &str) -> Result<bool, StorageError>;
}

/// Builds the single backend named by `config.provider`.
///
/// Called once at startup; the returned instance is shared for the process lifetime.
pub async fn select_backend(
    config: &StorageConfig,
) -> Result<Arc<dyn StorageBackend>, ConfigError> {
    config.validate()?;

    let backend: Arc<dyn StorageBackend> = match config.provider {
        Provider::Local => {
            let backend = LocalBackend::from_config(&config.local)?;
            backend.prepare().await.map_err(|err| ConfigError::BackendInit {
                provider: Provider::Local,
                message: err.to_string(),
            })?;
            Arc::new(backend)
        }
        Provider::Aws => {
            let aws = config.aws.as_ref().ok_or(ConfigError::MissingProviderSection {
                provider: Provider::Aws,
            })?;
            Arc::new(AwsBackend::from_config(aws)?)
        }
        Provider::Azure => {
            let azure = config
                .azure
                .as_ref()
                .ok_or(ConfigError::MissingProviderSection {
                    provider: Provider::Azure,
                })?;
            Arc::new(AzureBackend::from_config(azure)?)
        }
    };

    tracing::info!(provider = %backend.provider(), "storage backend is active");
    Ok(backend)
}
