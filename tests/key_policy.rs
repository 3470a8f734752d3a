#![allow(missing_docs)]

use blobway::{
    policy::{decode_segment, encode_segment, locate_key, local_file_name, object_name},
    Bucket,
};

#[test]
fn image_types_route_to_images() {
    for content_type in ["image/png", "image/jpeg", "IMAGE/GIF", "image/svg+xml; charset=utf-8"] {
        assert_eq!(
            Bucket::for_content_type(content_type),
            Bucket::Images,
            "{content_type}"
        );
    }
}

#[test]
fn everything_else_routes_to_files() {
    for content_type in ["", "text/plain", "application/pdf", "imagery", "not a mime", "video/mp4", "image/png garbage"] {
        assert_eq!(
            Bucket::for_content_type(content_type),
            Bucket::Files,
            "{content_type}"
        );
    }
}

#[test]
fn segments_encode_for_urls_and_decode_back() {
    let encoded = encode_segment("0f3c-café #1.png");
    assert_eq!(encoded, "0f3c-caf%C3%A9%20%231.png");
    assert_eq!(decode_segment(&encoded).as_deref(), Some("0f3c-café #1.png"));
    assert_eq!(decode_segment("bad%FF").as_deref(), None);
}

#[test]
fn generated_names_keep_the_original_suffix_and_are_unique() {
    let first = object_name("cat.png");
    let second = object_name("cat.png");
    assert!(first.ends_with("-cat.png"));
    assert_ne!(first, second);

    let local = local_file_name("cat.png");
    assert!(local.ends_with("cat.png"));
    assert!(local.contains('_'));
    assert_ne!(local, local_file_name("cat.png"));
}

#[test]
fn locates_key_after_bucket_marker() {
    let located = locate_key("https://cdn.example.com/images/abc-cat.png").expect("key");
    assert_eq!(located.bucket, Bucket::Images);
    assert_eq!(located.key, "images/abc-cat.png");
    assert_eq!(located.object, "abc-cat.png");

    let located = locate_key("files/abc-report.pdf").expect("key");
    assert_eq!(located.bucket, Bucket::Files);
    assert_eq!(located.object, "abc-report.pdf");
}

#[test]
fn rightmost_segment_marker_wins() {
    let located =
        locate_key("https://files.example.com/files/images/abc-cat.png").expect("key");
    assert_eq!(located.bucket, Bucket::Images);
    assert_eq!(located.key, "images/abc-cat.png");

    let located = locate_key("http://host/myimages/files/abc.txt").expect("key");
    assert_eq!(located.bucket, Bucket::Files);
}

#[test]
fn unrecognised_references_yield_nothing() {
    assert!(locate_key("").is_none());
    assert!(locate_key("https://cdn.example.com/other/abc.txt").is_none());
    assert!(locate_key("https://cdn.example.com/images/").is_none());
    assert!(locate_key("https://cdn.example.com/myfiles/abc.txt").is_none());
}
