#![allow(missing_docs)]

use std::sync::Arc;

use blobway::{
    AwsBackend, AzureBackend, Bucket, Payload, Provider, SizeLimits, StorageBackend, StorageError,
};
use object_store::{memory::InMemory, path::Path, Attribute, ObjectStore};

const MIB: usize = 1024 * 1024;

fn aws() -> AwsBackend {
    AwsBackend::with_store(
        Arc::new(InMemory::new()),
        "media-bucket",
        "https://cdn.example.com/",
    )
}

fn azure() -> AzureBackend {
    AzureBackend::with_stores(
        Arc::new(InMemory::new()),
        Arc::new(InMemory::new()),
        "https://acct.blob.core.windows.net",
    )
}

#[tokio::test]
async fn aws_upload_keys_by_bucket_prefix_and_stores_content_type() {
    let backend = aws();

    let descriptor = backend
        .upload(Payload::new("photo.jpg", "image/jpeg", &b"jpeg"[..]))
        .await
        .expect("upload should succeed");

    assert_eq!(backend.provider(), Provider::Aws);
    assert!(descriptor
        .reference
        .starts_with("https://cdn.example.com/images/"));
    assert!(descriptor.reference.ends_with("-photo.jpg"));
    assert_eq!(descriptor.size, 4);

    let key = descriptor
        .reference
        .trim_start_matches("https://cdn.example.com/");
    let stored = backend
        .store()
        .get(&Path::parse(key).expect("valid key"))
        .await
        .expect("object stored");
    let content_type: Option<&str> = stored
        .attributes
        .get(&Attribute::ContentType)
        .map(|value| value.as_ref());
    assert_eq!(content_type, Some("image/jpeg"));
    assert_eq!(stored.bytes().await.expect("body").as_ref(), b"jpeg");
}

#[tokio::test]
async fn aws_reference_round_trips_through_delete() {
    let backend = aws();

    let descriptor = backend
        .upload(Payload::new("notes.txt", "text/plain", &b"hello"[..]))
        .await
        .expect("upload should succeed");
    assert!(descriptor.reference.contains("/files/"));
    assert!(backend.exists(&descriptor.reference).await.expect("exists"));

    backend
        .delete(&descriptor.reference)
        .await
        .expect("delete should succeed");
    assert!(!backend.exists(&descriptor.reference).await.expect("exists"));
}

#[tokio::test]
async fn aws_delete_tolerates_missing_and_unrecognised_references() {
    let backend = aws();

    backend
        .delete("https://cdn.example.com/files/never-uploaded.txt")
        .await
        .expect("missing object is a no-op");
    backend
        .delete("https://cdn.example.com/other/thing.txt")
        .await
        .expect("unrecognised reference is a no-op");
    backend.delete("").await.expect("empty reference is a no-op");
}

#[tokio::test]
async fn aws_rejects_empty_payloads() {
    let err = aws()
        .upload(Payload::new("empty.txt", "text/plain", Vec::new()))
        .await
        .expect_err("empty payload must be rejected");
    assert!(matches!(err, StorageError::EmptyPayload { .. }));
}

#[tokio::test]
async fn azure_routes_by_content_type_into_containers() {
    let backend = azure();

    let image = backend
        .upload(Payload::new("logo.png", "image/png", &b"png"[..]))
        .await
        .expect("image upload");
    let file = backend
        .upload(Payload::new("data.csv", "text/csv", &b"a,b"[..]))
        .await
        .expect("file upload");

    assert!(image
        .reference
        .starts_with("https://acct.blob.core.windows.net/images/"));
    assert!(file
        .reference
        .starts_with("https://acct.blob.core.windows.net/files/"));

    let blob = image.reference.rsplit('/').next().expect("blob name");
    let path = Path::parse(blob).expect("valid blob name");
    assert!(backend.container(Bucket::Images).head(&path).await.is_ok());
    assert!(backend.container(Bucket::Files).head(&path).await.is_err());
}

#[tokio::test]
async fn azure_enforces_image_limit_before_any_write() {
    let backend = azure();

    let err = backend
        .upload(Payload::new("huge.png", "image/png", vec![0_u8; 6 * MIB]))
        .await
        .expect_err("6 MiB image must be rejected");
    match err {
        StorageError::PayloadTooLarge {
            bucket,
            size,
            limit,
        } => {
            assert_eq!(bucket, Bucket::Images);
            assert_eq!(size, (6 * MIB) as u64);
            assert_eq!(limit, (5 * MIB) as u64);
        }
        other => panic!("unexpected error: {other}"),
    }

    let listed = backend
        .container(Bucket::Images)
        .list_with_delimiter(None)
        .await
        .expect("list container");
    assert!(listed.objects.is_empty());

    backend
        .upload(Payload::new("fine.png", "image/png", vec![0_u8; 4 * MIB]))
        .await
        .expect("4 MiB image is accepted");
}

#[tokio::test]
async fn azure_allows_large_generic_files_up_to_file_limit() {
    let backend = azure();

    backend
        .upload(Payload::new("big.bin", "application/octet-stream", vec![1_u8; 6 * MIB]))
        .await
        .expect("6 MiB generic file is under the 50 MiB limit");

    let strict = azure().with_limits(SizeLimits {
        max_image_size: 10,
        max_file_size: 10,
    });
    let err = strict
        .upload(Payload::new("big.bin", "application/octet-stream", vec![1_u8; 11]))
        .await
        .expect_err("over the custom limit");
    assert!(matches!(
        err,
        StorageError::PayloadTooLarge {
            bucket: Bucket::Files,
            ..
        }
    ));
}

#[tokio::test]
async fn azure_reference_round_trips_through_delete() {
    let backend = azure();

    let descriptor = backend
        .upload(Payload::new("scan.pdf", "application/pdf", &b"%PDF-1.7"[..]))
        .await
        .expect("upload should succeed");
    assert!(backend.exists(&descriptor.reference).await.expect("exists"));

    backend
        .delete(&descriptor.reference)
        .await
        .expect("delete should succeed");
    assert!(!backend.exists(&descriptor.reference).await.expect("exists"));

    backend
        .delete(&descriptor.reference)
        .await
        .expect("deleting twice is a no-op");
}

#[tokio::test]
async fn aws_keeps_unicode_names_verbatim_and_encodes_the_reference() {
    let backend = aws();

    let descriptor = backend
        .upload(Payload::new("café #1.png", "image/png", &b"png"[..]))
        .await
        .expect("upload should succeed");
    assert!(descriptor
        .reference
        .starts_with("https://cdn.example.com/images/"));
    assert!(
        descriptor.reference.ends_with("-caf%C3%A9%20%231.png"),
        "{}",
        descriptor.reference
    );

    let listed = backend
        .store()
        .list_with_delimiter(Some(&Path::from("images")))
        .await
        .expect("list bucket prefix");
    assert_eq!(listed.objects.len(), 1);
    let key = listed.objects[0].location.as_ref();
    assert!(key.starts_with("images/"), "{key}");
    assert!(key.ends_with("-café #1.png"), "{key}");

    assert!(backend.exists(&descriptor.reference).await.expect("exists"));
    backend
        .delete(&descriptor.reference)
        .await
        .expect("delete should succeed");
    assert!(!backend.exists(&descriptor.reference).await.expect("exists"));
}

#[tokio::test]
async fn cloud_backends_reject_names_that_are_not_single_segments() {
    for name in ["nested/photo.png", "bell\u{7}.png"] {
        let err = aws()
            .upload(Payload::new(name, "image/png", &b"png"[..]))
            .await
            .expect_err("aws must reject the name");
        assert!(matches!(err, StorageError::InvalidName { .. }), "{name}: {err}");

        let err = azure()
            .upload(Payload::new(name, "image/png", &b"png"[..]))
            .await
            .expect_err("azure must reject the name");
        assert!(matches!(err, StorageError::InvalidName { .. }), "{name}: {err}");
    }
}

#[tokio::test]
async fn aws_routes_empty_and_non_image_types_to_files() {
    let backend = aws();

    for content_type in ["", "application/pdf"] {
        let descriptor = backend
            .upload(Payload::new("doc.bin", content_type, &b"body"[..]))
            .await
            .expect("upload should succeed");
        assert!(
            descriptor
                .reference
                .starts_with("https://cdn.example.com/files/"),
            "{content_type:?}: {}",
            descriptor.reference
        );
        assert!(backend.exists(&descriptor.reference).await.expect("exists"));
    }

    let images = backend
        .store()
        .list_with_delimiter(Some(&Path::from("images")))
        .await
        .expect("list images prefix");
    assert!(images.objects.is_empty());
}

#[tokio::test]
async fn azure_routes_empty_and_non_image_types_to_files() {
    let backend = azure();

    for content_type in ["", "application/pdf"] {
        let descriptor = backend
            .upload(Payload::new("doc.bin", content_type, &b"body"[..]))
            .await
            .expect("upload should succeed");
        assert!(
            descriptor
                .reference
                .starts_with("https://acct.blob.core.windows.net/files/"),
            "{content_type:?}: {}",
            descriptor.reference
        );

        let blob = descriptor.reference.rsplit('/').next().expect("blob name");
        let path = Path::parse(blob).expect("valid blob name");
        assert!(backend.container(Bucket::Files).head(&path).await.is_ok());
        assert!(backend.container(Bucket::Images).head(&path).await.is_err());
    }
}

#[tokio::test]
async fn azure_keeps_unicode_names_verbatim_and_encodes_the_reference() {
    let backend = azure();

    let descriptor = backend
        .upload(Payload::new("café #1.png", "image/png", &b"png"[..]))
        .await
        .expect("upload should succeed");
    assert!(descriptor
        .reference
        .starts_with("https://acct.blob.core.windows.net/images/"));
    assert!(
        descriptor.reference.ends_with("-caf%C3%A9%20%231.png"),
        "{}",
        descriptor.reference
    );

    let listed = backend
        .container(Bucket::Images)
        .list_with_delimiter(None)
        .await
        .expect("list container");
    assert_eq!(listed.objects.len(), 1);
    let blob = listed.objects[0].location.as_ref();
    assert!(blob.ends_with("-café #1.png"), "{blob}");

    assert!(backend.exists(&descriptor.reference).await.expect("exists"));
    backend
        .delete(&descriptor.reference)
        .await
        .expect("delete should succeed");
    assert!(!backend.exists(&descriptor.reference).await.expect("exists"));
}
