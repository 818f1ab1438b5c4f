pub mod download;
pub mod list;
pub mod upload;

use reqwest::header::HeaderMap;

pub const TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// Zero-byte directory marker content type.
pub const TYPE_DIRECTORY: &str = "application/directory";

/// Object metadata extracted from Swift response headers. Absence of an
/// object is signalled by `Option::None` at the call sites, never by a
/// sentinel instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub last_modified: Option<time::OffsetDateTime>,
    pub content_length: u64,
    pub content_type: String,
    pub etag: String,
}

/// Transfer progress reported to an optional callback: the metadata snapshot
/// once before any byte moves, one event per transport chunk, then `Done`.
pub enum Progress<'a> {
    Metadata(&'a ObjectMetadata),
    Chunk(&'a [u8]),
    Done,
}

pub(crate) fn metadata_from_headers(headers: &HeaderMap) -> ObjectMetadata {
    let header = |name: reqwest::header::HeaderName| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
    };

    ObjectMetadata {
        last_modified: header(reqwest::header::LAST_MODIFIED)
            .and_then(|v| time::OffsetDateTime::parse(&v, &time::format_description::well_known::Rfc2822).ok()),
        content_length: header(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        content_type: header(reqwest::header::CONTENT_TYPE).unwrap_or_else(|| TYPE_OCTET_STREAM.to_string()),
        etag: header(reqwest::header::ETAG).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::{metadata_from_headers, TYPE_OCTET_STREAM};

    #[test]
    fn parses_swift_head_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("last-modified", HeaderValue::from_static("Wed, 15 Jan 2014 16:41:49 GMT"));
        headers.insert("content-length", HeaderValue::from_static("1234"));
        headers.insert("content-type", HeaderValue::from_static("image/jpeg"));
        headers.insert("etag", HeaderValue::from_static("451599a5fbdbbccfcdb3cc73bb6b4d6d"));

        let meta = metadata_from_headers(&headers);
        assert_eq!(meta.content_length, 1234);
        assert_eq!(meta.content_type, "image/jpeg");
        assert_eq!(meta.etag, "451599a5fbdbbccfcdb3cc73bb6b4d6d");
        let lastmod = meta.last_modified.unwrap();
        assert_eq!((lastmod.year(), lastmod.day()), (2014, 15));
    }

    #[test]
    fn missing_headers_fall_back() {
        let meta = metadata_from_headers(&HeaderMap::new());
        assert_eq!(meta.content_length, 0);
        assert_eq!(meta.content_type, TYPE_OCTET_STREAM);
        assert!(meta.last_modified.is_none());
        assert!(meta.etag.is_empty());
    }
}
