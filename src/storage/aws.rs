use std::{fmt, sync::Arc};

use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore, PutPayload};

use super::{object_key, put_options, Payload, Provider, StorageBackend};
use crate::{
    config::AwsConfig,
    error::{ConfigError, StorageError},
    policy,
    protocol::ObjectDescriptor,
};

/// S3 backend storing objects under `{images|files}/{uuid}-{name}` in one bucket.
///
/// References percent-encode the object name; the stored key keeps it verbatim.
#[derive(Clone)]
pub struct AwsBackend {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
    cdn_base_url: String,
}

impl fmt::Debug for AwsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsBackend")
            .field("store", &self.store.to_string())
            .field("bucket_name", &self.bucket_name)
            .field("cdn_base_url", &self.cdn_base_url)
            .finish()
    }
}

impl AwsBackend {
    /// Builds an S3 client from configuration; credentials come from the environment.
    pub fn from_config(config: &AwsConfig) -> Result<Self, ConfigError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket_name);
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|err| ConfigError::BackendInit {
            provider: Provider::Aws,
            message: err.to_string(),
        })?;

        Ok(Self::with_store(
            Arc::new(store),
            config.bucket_name.clone(),
            config.cdn_base_url.clone(),
        ))
    }

    /// Wraps an existing object store, e.g. an in-memory one.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket_name: impl Into<String>,
        cdn_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket_name: bucket_name.into(),
            cdn_base_url: cdn_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Underlying object store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    fn object_path(reference: &str) -> Option<Path> {
        let located = policy::locate_key(reference)?;
        let Some(object) = policy::decode_segment(located.object) else {
            tracing::warn!(reference, "reference holds an undecodable object key");
            return None;
        };
        match Path::parse(format!("{}/{object}", located.bucket)) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(reference, error = %err, "reference holds an invalid object key");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for AwsBackend {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn upload(&self, payload: Payload) -> Result<ObjectDescriptor, StorageError> {
        payload.ensure_not_empty()?;

        let bucket = payload.bucket();
        let object = policy::object_name(&payload.name);
        let path = object_key(&format!("{bucket}/{object}"), &payload.name)?;

        self.store
            .put_opts(&path, PutPayload::from(payload.bytes.clone()), put_options(&payload))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, key = %path, "error uploading file to S3");
                StorageError::unavailable(Provider::Aws)(err)
            })?;

        let reference = format!(
            "{}/{bucket}/{}",
            self.cdn_base_url,
            policy::encode_segment(&object)
        );
        tracing::info!(
            name = payload.name.as_str(),
            bucket = bucket.as_str(),
            s3_bucket = self.bucket_name.as_str(),
            "file uploaded to S3"
        );
        Ok(payload.describe(reference))
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        if reference.is_empty() {
            tracing::warn!("delete attempt with an empty reference");
            return Ok(());
        }

        let Some(path) = Self::object_path(reference) else {
            tracing::warn!(reference, "could not determine object key from reference for deletion");
            return Ok(());
        };

        tracing::info!(key = %path, "deleting S3 object");
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                tracing::warn!(key = %path, "S3 object not found for deletion");
                Ok(())
            }
            Err(err) => Err(StorageError::unavailable(Provider::Aws)(err)),
        }
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let Some(path) = Self::object_path(reference) else {
            return Ok(false);
        };

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(StorageError::unavailable(Provider::Aws)(err)),
        }
    }
}
