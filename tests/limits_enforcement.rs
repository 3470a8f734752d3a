#![allow(missing_docs)]

use blobway::{
    limits::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_IMAGE_SIZE},
    Bucket, Code, ProtocolError, SizeLimits, Status, StorageError, TransportError,
};

#[test]
fn default_limits_are_five_and_fifty_mebibytes() {
    let limits = SizeLimits::default();
    assert_eq!(limits.limit_for(Bucket::Images), 5 * 1024 * 1024);
    assert_eq!(limits.limit_for(Bucket::Files), 50 * 1024 * 1024);
    assert_eq!(DEFAULT_MAX_IMAGE_SIZE, limits.max_image_size);
    assert_eq!(DEFAULT_MAX_FILE_SIZE, limits.max_file_size);
}

#[test]
fn check_allows_payloads_at_the_limit() {
    let limits = SizeLimits::default();
    assert!(limits.check(Bucket::Images, DEFAULT_MAX_IMAGE_SIZE).is_ok());
    assert!(limits.check(Bucket::Files, DEFAULT_MAX_FILE_SIZE).is_ok());
}

#[test]
fn check_rejects_one_byte_over() {
    let err = SizeLimits::default()
        .check(Bucket::Images, DEFAULT_MAX_IMAGE_SIZE + 1)
        .expect_err("over the limit");
    assert!(matches!(
        err,
        StorageError::PayloadTooLarge {
            bucket: Bucket::Images,
            limit: DEFAULT_MAX_IMAGE_SIZE,
            ..
        }
    ));
}

#[test]
fn service_failures_map_to_status_codes() {
    let status = Status::from(ProtocolError::ChunkBeforeMetadata);
    assert_eq!(status.code, Code::ProtocolViolation);
    assert_eq!(status.message, "chunk data received before metadata");

    let status = Status::from(TransportError::Disconnected);
    assert_eq!(status.code, Code::Cancelled);

    let status = Status::from(StorageError::PayloadTooLarge {
        bucket: Bucket::Files,
        size: 10,
        limit: 5,
    });
    assert_eq!(status.code, Code::PayloadTooLarge);
    assert_eq!(
        status.to_string(),
        "payload too large: files payload of 10 bytes exceeds the limit of 5 bytes"
    );

    let status = Status::from(StorageError::EmptyPayload {
        name: "a.txt".to_owned(),
    });
    assert_eq!(status.code, Code::InvalidPayload);

    let status = Status::from(StorageError::InvalidName {
        name: "a/b.png".to_owned(),
    });
    assert_eq!(status.code, Code::InvalidPayload);

    let status = Status::from(StorageError::Io {
        context: "failed to write output file",
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    });
    assert_eq!(status.code, Code::Internal);
}
