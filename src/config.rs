use std::{path::PathBuf, time::Duration};

use crate::{
    error::ConfigError, limits::SizeLimits, protocol::DEFAULT_CHUNK_SIZE, storage::Provider,
};

/// Default bridge deadline (5 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Local filesystem backend settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Upload root; relative paths resolve against the working directory.
    pub root: PathBuf,
    /// Path prefix under which uploads are publicly served.
    pub public_url_prefix: String,
    /// Externally visible base URL of the serving host.
    pub backend_url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            public_url_prefix: "/uploads".to_owned(),
            backend_url: String::new(),
        }
    }
}

impl LocalConfig {
    /// Validates local settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRootPath);
        }

        Ok(())
    }
}

/// Amazon S3 backend settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AwsConfig {
    /// Target bucket.
    pub bucket_name: String,
    /// Region override; otherwise taken from the environment.
    #[cfg_attr(feature = "serde", serde(default))]
    pub region: Option<String>,
    /// Custom endpoint (S3-compatible stores, local emulators).
    #[cfg_attr(feature = "serde", serde(default))]
    pub endpoint: Option<String>,
    /// Public base URL prepended to object keys in references.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cdn_base_url: String,
}

impl AwsConfig {
    /// Creates settings for `bucket_name` served from `cdn_base_url`.
    pub fn new(bucket_name: impl Into<String>, cdn_base_url: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            cdn_base_url: cdn_base_url.into(),
            ..Self::default()
        }
    }

    /// Validates S3 settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_name.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                field: "aws.bucket_name",
            });
        }

        Ok(())
    }
}

/// Azure Blob Storage backend settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AzureConfig {
    /// Storage account name.
    pub account: String,
    /// Shared access key; otherwise taken from the environment.
    #[cfg_attr(feature = "serde", serde(default))]
    pub access_key: Option<String>,
    /// Target the local Azurite emulator.
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_emulator: bool,
    /// Public account URL override.
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_url: Option<String>,
    /// Per-container size limits.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limits: SizeLimits,
}

impl AzureConfig {
    /// Creates settings for `account` with default limits.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Self::default()
        }
    }

    /// Base URL that blob references are built from.
    pub fn account_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None if self.use_emulator => format!("http://127.0.0.1:10000/{}", self.account),
            None => format!("https://{}.blob.core.windows.net", self.account),
        }
    }

    /// Validates Azure settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                field: "azure.account",
            });
        }
        if self.limits.max_image_size == 0 {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_image_size",
            });
        }
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_file_size",
            });
        }

        Ok(())
    }
}

/// Process-wide storage configuration, read once at startup.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// The single active provider.
    pub provider: Provider,
    /// Local backend settings.
    pub local: LocalConfig,
    /// S3 backend settings, required when `provider` is [`Provider::Aws`].
    pub aws: Option<AwsConfig>,
    /// Azure backend settings, required when `provider` is [`Provider::Azure`].
    pub azure: Option<AzureConfig>,
}

impl StorageConfig {
    /// Creates a default (local) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the section belonging to the selected provider.
    ///
    /// Sections of inactive providers are not inspected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            Provider::Local => self.local.validate(),
            Provider::Aws => self
                .aws
                .as_ref()
                .ok_or(ConfigError::MissingProviderSection {
                    provider: Provider::Aws,
                })?
                .validate(),
            Provider::Azure => self
                .azure
                .as_ref()
                .ok_or(ConfigError::MissingProviderSection {
                    provider: Provider::Azure,
                })?
                .validate(),
        }
    }
}

/// Client and bridge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Size of each chunk message in bytes.
    pub chunk_size: usize,
    /// Deadline for the terminal response of one blocking operation.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Creates the default 4 KiB / 5 minute configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates client settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidLimitValue {
                limit: "chunk_size",
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}
