use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use time::macros::format_description;

/// Query of one listing page. Pagination is marker based: pass the last
/// returned name as `marker` to continue; the client never auto-paginates.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListObjectsRequest {
    /// Restrict the listing to objects under this pseudo-directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Names strictly greater than the marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Names strictly smaller than the end marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<String>,
}

/// Wire entry of `GET /{container}?format=json`.
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct RawObjectEntry {
    pub name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub etag: String,
    pub last_modified: Option<time::OffsetDateTime>,
    pub bytes: u64,
    pub content_type: String,
}

/// One listing page in provider order, with the container aggregate counters
/// taken from the response headers. Counters are recomputed per call and
/// never cached.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub entries: Vec<ObjectEntry>,
    pub bytes_used: Option<u64>,
    pub object_count: Option<u64>,
    pub storage_policy: Option<String>,
}

impl ListingPage {
    pub(crate) fn from_response(headers: &HeaderMap, raw: Vec<RawObjectEntry>) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

        Self {
            entries: raw
                .into_iter()
                .map(|e| ObjectEntry {
                    last_modified: parse_swift_timestamp(&e.last_modified),
                    name: e.name,
                    etag: e.hash,
                    bytes: e.bytes,
                    content_type: e.content_type,
                })
                .collect(),
            bytes_used: header("x-container-bytes-used").and_then(|v| v.parse().ok()),
            object_count: header("x-container-object-count").and_then(|v| v.parse().ok()),
            storage_policy: header("x-storage-policy"),
        }
    }

    /// Marker for the next page, `None` once the listing is exhausted.
    pub fn next_marker(&self) -> Option<&str> {
        self.entries.last().map(|e| e.name.as_str())
    }
}

/// Swift reports `last_modified` as a naive UTC timestamp with optional
/// fractional seconds and no offset designator.
fn parse_swift_timestamp(raw: &str) -> Option<time::OffsetDateTime> {
    const WITH_SUBSEC: &[time::format_description::FormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    const PLAIN: &[time::format_description::FormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    time::PrimitiveDateTime::parse(raw, &WITH_SUBSEC)
        .or_else(|_| time::PrimitiveDateTime::parse(raw, &PLAIN))
        .map(time::PrimitiveDateTime::assume_utc)
        .ok()
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::{parse_swift_timestamp, ListObjectsRequest, ListingPage, RawObjectEntry};

    #[test]
    fn swift_timestamps_parse_with_and_without_subseconds() {
        let ts = parse_swift_timestamp("2014-01-15T16:41:49.390270").unwrap();
        assert_eq!((ts.year(), ts.hour()), (2014, 16));
        assert!(parse_swift_timestamp("2014-01-15T16:41:49").is_some());
        assert!(parse_swift_timestamp("not a date").is_none());
    }

    #[test]
    fn page_carries_container_counters() {
        let mut headers = HeaderMap::new();
        headers.insert("x-container-bytes-used", HeaderValue::from_static("14445"));
        headers.insert("x-container-object-count", HeaderValue::from_static("5"));
        headers.insert("x-storage-policy", HeaderValue::from_static("Policy-0"));

        let raw = vec![RawObjectEntry {
            name: "docs/a.txt".to_string(),
            hash: "451599a5fbdbbccfcdb3cc73bb6b4d6d".to_string(),
            last_modified: "2014-01-15T16:41:49.390270".to_string(),
            bytes: 12,
            content_type: "text/plain".to_string(),
        }];

        let page = ListingPage::from_response(&headers, raw);
        assert_eq!(page.bytes_used, Some(14445));
        assert_eq!(page.object_count, Some(5));
        assert_eq!(page.storage_policy.as_deref(), Some("Policy-0"));
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].etag, "451599a5fbdbbccfcdb3cc73bb6b4d6d");
        assert_eq!(page.next_marker(), Some("docs/a.txt"));
    }

    #[test]
    fn empty_page_has_no_next_marker() {
        let page = ListingPage::from_response(&HeaderMap::new(), vec![]);
        assert!(page.next_marker().is_none());
    }

    #[test]
    fn only_set_fields_are_serialized() {
        let req = ListObjectsRequest {
            limit: Some(2),
            marker: Some("docs/a.txt".to_string()),
            ..Default::default()
        };
        let qs = serde_json::to_value(&req).unwrap();
        assert_eq!(qs.as_object().unwrap().len(), 2);
        assert_eq!(qs["limit"], 2);
        assert_eq!(qs["marker"], "docs/a.txt");
    }
}
