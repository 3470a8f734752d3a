use std::{fmt, sync::Arc};

use object_store::{azure::MicrosoftAzureBuilder, path::Path, ObjectStore, PutPayload};

use super::{object_key, put_options, Payload, Provider, StorageBackend};
use crate::{
    config::AzureConfig,
    error::{ConfigError, StorageError},
    limits::SizeLimits,
    policy::{self, Bucket},
    protocol::ObjectDescriptor,
};

/// Azure Blob Storage backend with one container per bucket (`images`, `files`).
///
/// Payloads above the configured [`SizeLimits`] are rejected before any request
/// reaches the service.
#[derive(Clone)]
pub struct AzureBackend {
    images: Arc<dyn ObjectStore>,
    files: Arc<dyn ObjectStore>,
    account_url: String,
    limits: SizeLimits,
}

impl fmt::Debug for AzureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBackend")
            .field("account_url", &self.account_url)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl AzureBackend {
    /// Builds container clients from configuration; credentials not given in the
    /// configuration are read from the environment.
    pub fn from_config(config: &AzureConfig) -> Result<Self, ConfigError> {
        let container = |bucket: Bucket| -> Result<Arc<dyn ObjectStore>, ConfigError> {
            let mut builder = MicrosoftAzureBuilder::from_env()
                .with_account(&config.account)
                .with_container_name(bucket.as_str())
                .with_use_emulator(config.use_emulator);
            if let Some(key) = &config.access_key {
                builder = builder.with_access_key(key);
            }

            let store = builder.build().map_err(|err| ConfigError::BackendInit {
                provider: Provider::Azure,
                message: err.to_string(),
            })?;
            Ok(Arc::new(store))
        };

        let backend = Self::with_stores(
            container(Bucket::Images)?,
            container(Bucket::Files)?,
            config.account_url(),
        )
        .with_limits(config.limits);

        tracing::info!(account_url = backend.account_url.as_str(), "azure blob clients initialized");
        Ok(backend)
    }

    /// Wraps existing per-container stores, e.g. in-memory ones.
    pub fn with_stores(
        images: Arc<dyn ObjectStore>,
        files: Arc<dyn ObjectStore>,
        account_url: impl Into<String>,
    ) -> Self {
        Self {
            images,
            files,
            account_url: account_url.into().trim_end_matches('/').to_owned(),
            limits: SizeLimits::default(),
        }
    }

    /// Replaces the size limits.
    pub fn with_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Active size limits.
    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    /// Store backing `bucket`'s container.
    pub fn container(&self, bucket: Bucket) -> &Arc<dyn ObjectStore> {
        match bucket {
            Bucket::Images => &self.images,
            Bucket::Files => &self.files,
        }
    }

    fn blob_location(reference: &str) -> Option<(Bucket, Path)> {
        let located = policy::locate_key(reference)?;
        let Some(object) = policy::decode_segment(located.object) else {
            tracing::warn!(reference, "reference holds an undecodable blob name");
            return None;
        };
        match Path::parse(object) {
            Ok(path) => Some((located.bucket, path)),
            Err(err) => {
                tracing::warn!(reference, error = %err, "reference holds an invalid blob name");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for AzureBackend {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    async fn upload(&self, payload: Payload) -> Result<ObjectDescriptor, StorageError> {
        payload.ensure_not_empty()?;

        let bucket = payload.bucket();
        self.limits.check(bucket, payload.size())?;

        let object = policy::object_name(&payload.name);
        let blob = object_key(&object, &payload.name)?;
        self.container(bucket)
            .put_opts(&blob, PutPayload::from(payload.bytes.clone()), put_options(&payload))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, blob = %blob, "failed to upload file to Azure");
                StorageError::unavailable(Provider::Azure)(err)
            })?;

        let reference = format!(
            "{}/{bucket}/{}",
            self.account_url,
            policy::encode_segment(&object)
        );
        tracing::info!(
            name = payload.name.as_str(),
            container = bucket.as_str(),
            "file uploaded to Azure"
        );
        Ok(payload.describe(reference))
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        if reference.is_empty() {
            tracing::warn!("delete attempt with an empty reference");
            return Ok(());
        }

        let Some((bucket, blob)) = Self::blob_location(reference) else {
            tracing::warn!(reference, "could not determine container from reference for deletion");
            return Ok(());
        };

        match self.container(bucket).delete(&blob).await {
            Ok(()) => {
                tracing::info!(blob = %blob, container = bucket.as_str(), "deleted Azure blob");
                Ok(())
            }
            Err(object_store::Error::NotFound { .. }) => {
                tracing::warn!(blob = %blob, container = bucket.as_str(), "Azure blob not found for deletion");
                Ok(())
            }
            Err(err) => Err(StorageError::unavailable(Provider::Azure)(err)),
        }
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let Some((bucket, blob)) = Self::blob_location(reference) else {
            return Ok(false);
        };

        match self.container(bucket).head(&blob).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(StorageError::unavailable(Provider::Azure)(err)),
        }
    }
}
