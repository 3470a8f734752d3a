use std::{
    ffi::OsStr,
    io,
    path::{Component, Path, PathBuf},
};

use tokio::io::AsyncWriteExt;

use super::{Payload, Provider, StorageBackend};
use crate::{
    config::LocalConfig,
    error::{ConfigError, StorageError},
    policy::{self, Bucket},
    protocol::ObjectDescriptor,
};

/// Builder for [`LocalBackend`].
#[derive(Debug, Clone)]
pub struct LocalBackendBuilder {
    root: PathBuf,
    public_url_prefix: String,
    backend_url: String,
}

impl Default for LocalBackendBuilder {
    fn default() -> Self {
        let defaults = LocalConfig::default();
        Self {
            root: defaults.root,
            public_url_prefix: defaults.public_url_prefix,
            backend_url: defaults.backend_url,
        }
    }
}

impl LocalBackendBuilder {
    /// Sets the upload root directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the public path prefix under which uploads are served.
    pub fn public_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_url_prefix = prefix.into();
        self
    }

    /// Sets the externally visible base URL prepended to references.
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    /// Builds the backend, resolving the root to an absolute normalized path.
    pub fn build(self) -> Result<LocalBackend, ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRootPath);
        }

        let root = if self.root.is_absolute() {
            self.root
        } else {
            std::env::current_dir()
                .map_err(|err| ConfigError::BackendInit {
                    provider: Provider::Local,
                    message: format!("failed to resolve working directory: {err}"),
                })?
                .join(self.root)
        };

        Ok(LocalBackend {
            root: normalize(&root),
            public_url_prefix: normalize_prefix(&self.public_url_prefix),
            backend_url: self.backend_url.trim_end_matches('/').to_owned(),
        })
    }
}

/// Filesystem backend writing under `{root}/{images|files}/`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    public_url_prefix: String,
    backend_url: String,
}

impl LocalBackend {
    /// Creates a local backend builder.
    pub fn builder() -> LocalBackendBuilder {
        LocalBackendBuilder::default()
    }

    /// Builds a backend from configuration.
    pub fn from_config(config: &LocalConfig) -> Result<Self, ConfigError> {
        Self::builder()
            .root(config.root.clone())
            .public_url_prefix(config.public_url_prefix.clone())
            .backend_url(config.backend_url.clone())
            .build()
    }

    /// Absolute upload root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized public prefix: empty, or starting with `/` and never ending with one.
    pub fn public_url_prefix(&self) -> &str {
        &self.public_url_prefix
    }

    /// Creates the upload root and both bucket folders.
    pub async fn prepare(&self) -> Result<(), StorageError> {
        for bucket in Bucket::ALL {
            let folder = self.root.join(bucket.as_str());
            tokio::fs::create_dir_all(&folder)
                .await
                .map_err(StorageError::io("failed to create storage directory"))?;
        }

        tracing::info!(
            root = %self.root.display(),
            public_url_prefix = self.public_url_prefix.as_str(),
            "local storage prepared"
        );
        Ok(())
    }

    /// Resolves the destination of a generated file name, rejecting anything that
    /// does not land directly inside the bucket folder.
    fn destination(
        &self,
        bucket: Bucket,
        file_name: &str,
        original: &str,
    ) -> Result<PathBuf, StorageError> {
        let folder = self.root.join(bucket.as_str());
        let target = normalize(&folder.join(file_name));

        let lands_in_folder = target.parent() == Some(folder.as_path())
            && target.file_name() == Some(OsStr::new(file_name));
        if !lands_in_folder {
            tracing::error!(
                attempted = %target.display(),
                "cannot store file outside designated subfolder"
            );
            return Err(StorageError::PathEscape {
                name: original.to_owned(),
                bucket,
            });
        }

        Ok(target)
    }

    fn public_reference(&self, bucket: Bucket, file_name: &str) -> String {
        format!(
            "{}{}/{}/{file_name}",
            self.backend_url, self.public_url_prefix, bucket
        )
    }

    /// Maps a reference back to a file directly inside a bucket folder, or `None`
    /// when the reference is unrecognised or resolves anywhere else.
    fn resolve_reference(&self, reference: &str) -> Option<PathBuf> {
        let Some(located) = policy::locate_key(reference) else {
            tracing::warn!(reference, "could not extract a storage key from reference");
            return None;
        };

        let path = normalize(&self.root.join(located.key));
        let in_bucket_folder = path.parent().is_some_and(|parent| {
            Bucket::ALL
                .iter()
                .any(|bucket| parent == self.root.join(bucket.as_str()))
        });
        if !in_bucket_folder {
            tracing::error!(
                attempted = %path.display(),
                "reference resolves outside the upload directory"
            );
            return None;
        }

        Some(path)
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalBackend {
    fn provider(&self) -> Provider {
        Provider::Local
    }

    async fn upload(&self, payload: Payload) -> Result<ObjectDescriptor, StorageError> {
        payload.ensure_not_empty()?;

        let bucket = payload.bucket();
        let file_name = policy::local_file_name(&payload.name);
        let target = self.destination(bucket, &file_name, &payload.name)?;

        tracing::debug!(
            name = payload.name.as_str(),
            bucket = bucket.as_str(),
            path = %target.display(),
            "local storage: begin store"
        );

        let folder = self.root.join(bucket.as_str());
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(StorageError::io("failed to create storage directory"))?;

        if let Err(err) = write_file(&target, &payload.bytes).await {
            discard_partial(&target).await;
            return Err(err);
        }

        let reference = self.public_reference(bucket, &file_name);
        tracing::info!(
            name = payload.name.as_str(),
            bucket = bucket.as_str(),
            file_name = file_name.as_str(),
            "file saved to local storage"
        );
        Ok(payload.describe(reference))
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        if reference.is_empty() {
            tracing::warn!("delete attempt with an empty reference");
            return Ok(());
        }

        let Some(path) = self.resolve_reference(reference) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "file deleted");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "file not found for deletion, or already deleted");
                Ok(())
            }
            Err(err) => Err(StorageError::Io {
                context: "failed to delete file",
                source: err,
            }),
        }
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let Some(path) = self.resolve_reference(reference) else {
            return Ok(false);
        };

        tokio::fs::try_exists(&path)
            .await
            .map_err(StorageError::io("failed to inspect stored file"))
    }
}

async fn write_file(target: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = tokio::fs::File::create(target)
        .await
        .map_err(StorageError::io("failed to create output file"))?;
    file.write_all(bytes)
        .await
        .map_err(StorageError::io("failed to write output file"))?;
    file.flush()
        .await
        .map_err(StorageError::io("failed to flush output file"))
}

/// Removes whatever a failed write left behind at `target`.
async fn discard_partial(target: &Path) {
    match tokio::fs::remove_file(target).await {
        Ok(()) => {
            tracing::warn!(path = %target.display(), "removed partially written file");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::error!(
                path = %target.display(),
                error = %err,
                "failed to remove partially written file"
            );
        }
    }
}

/// Lexically resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
