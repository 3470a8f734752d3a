use crate::{error::StorageError, policy::Bucket};

/// Default ceiling for payloads routed to the image bucket (5 MiB).
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;
/// Default ceiling for payloads routed to the generic file bucket (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Per-bucket payload size limits enforced by backends that carry a size policy.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    /// Maximum accepted size in bytes for `image/*` payloads.
    pub max_image_size: u64,
    /// Maximum accepted size in bytes for every other payload.
    pub max_file_size: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl SizeLimits {
    /// Creates the default 5 MiB / 50 MiB limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the limit that applies to `bucket`.
    pub fn limit_for(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Images => self.max_image_size,
            Bucket::Files => self.max_file_size,
        }
    }

    /// Rejects a payload of `size` bytes when it exceeds the limit for `bucket`.
    pub fn check(&self, bucket: Bucket, size: u64) -> Result<(), StorageError> {
        let limit = self.limit_for(bucket);
        if size > limit {
            tracing::debug!(
                bucket = bucket.as_str(),
                size,
                limit,
                "limits: payload rejected by size policy"
            );
            return Err(StorageError::PayloadTooLarge { bucket, size, limit });
        }

        Ok(())
    }
}
