use std::path::PathBuf;

use crate::{
    config::{AwsConfig, AzureConfig, LocalConfig, StorageConfig},
    error::ConfigError,
    storage::Provider,
};

/// Builder for a validated [`StorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    config: StorageConfig,
}

impl StorageConfigBuilder {
    /// Creates a builder with the default local configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the active provider.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.config.provider = provider;
        self
    }

    /// Selects the local backend rooted at `root`.
    pub fn local(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.provider = Provider::Local;
        self.config.local.root = root.into();
        self
    }

    /// Replaces the local backend settings without changing the provider.
    pub fn local_config(mut self, local: LocalConfig) -> Self {
        self.config.local = local;
        self
    }

    /// Selects the S3 backend.
    pub fn aws(mut self, aws: AwsConfig) -> Self {
        self.config.provider = Provider::Aws;
        self.config.aws = Some(aws);
        self
    }

    /// Selects the Azure backend.
    pub fn azure(mut self, azure: AzureConfig) -> Self {
        self.config.provider = Provider::Azure;
        self.config.azure = Some(azure);
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build(self) -> Result<StorageConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
