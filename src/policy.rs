//! Storage key derivation and reference parsing shared by every backend.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

/// Characters escaped in a reference path segment: everything but RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Subfolder (local, S3) or container (Azure) a payload is routed to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// `image/*` payloads.
    Images,
    /// Everything else, including unknown content types.
    Files,
}

impl Bucket {
    /// Every bucket, in the order references are matched against.
    pub const ALL: [Bucket; 2] = [Bucket::Images, Bucket::Files];

    /// Routes a content type: `image/*` goes to [`Bucket::Images`], anything else
    /// (including an empty or unparsable type) to [`Bucket::Files`].
    ///
    /// The value is parsed as a MIME type, so the match is case-insensitive
    /// (`IMAGE/PNG` is an image) and a value that is not a well-formed type
    /// (`image/png garbage`) routes to files.
    pub fn for_content_type(content_type: &str) -> Self {
        match content_type.trim().parse::<mime::Mime>() {
            Ok(mime) if mime.type_() == mime::IMAGE => Self::Images,
            _ => Self::Files,
        }
    }

    /// Folder or container name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name used by the local backend: `{uuid}_{millis}{original}`.
pub fn local_file_name(original_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("{}_{millis}{original_name}", Uuid::new_v4())
}

/// Object name used by the cloud backends: `{uuid}-{original}`.
pub fn object_name(original_name: &str) -> String {
    format!("{}-{original_name}", Uuid::new_v4())
}

/// Percent-encodes one path segment of a public reference.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Reverses [`encode_segment`]; `None` when the result is not UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Storage key recovered from an externally visible reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceKey<'a> {
    /// Bucket named by the reference.
    pub bucket: Bucket,
    /// Key including the bucket prefix, e.g. `images/abc-photo.png`.
    pub key: &'a str,
    /// Key without the bucket prefix, e.g. `abc-photo.png`.
    pub object: &'a str,
}

/// Locates the bucket marker (`images/` or `files/`) in `reference`.
///
/// The marker must start a path segment. When several candidates exist the
/// rightmost wins, since generated object names never contain a raw `/`.
/// Returns `None` when no marker is present or nothing follows it.
pub fn locate_key(reference: &str) -> Option<ReferenceKey<'_>> {
    let mut found: Option<ReferenceKey<'_>> = None;

    for bucket in Bucket::ALL {
        let marker = bucket.as_str();
        for (index, _) in reference.match_indices(marker) {
            let starts_segment = index == 0 || reference[..index].ends_with('/');
            let rest = &reference[index + marker.len()..];
            let Some(object) = rest.strip_prefix('/') else {
                continue;
            };
            if !starts_segment || object.is_empty() {
                continue;
            }
            if found.map_or(true, |current| index > offset_of(reference, current.key)) {
                found = Some(ReferenceKey {
                    bucket,
                    key: &reference[index..],
                    object,
                });
            }
        }
    }

    found
}

fn offset_of(haystack: &str, tail: &str) -> usize {
    haystack.len() - tail.len()
}
