use std::collections::HashMap;

use reqwest::header::HeaderMap;
use serde::Deserialize;

/// Wire entry of the account root listing, `GET /?format=json`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub count: u64,
}

/// Container counters and user metadata from a container HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStat {
    pub object_count: u64,
    pub bytes_used: u64,
    /// `x-container-meta-*` headers, keyed by the stripped suffix.
    pub metadata: HashMap<String, String>,
}

const META_PREFIX: &str = "x-container-meta-";

impl ContainerStat {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let metadata = headers
            .iter()
            .filter_map(|(k, v)| {
                let key = k.as_str().strip_prefix(META_PREFIX)?;
                Some((key.to_string(), v.to_str().ok()?.to_string()))
            })
            .collect();

        Self {
            object_count: header("x-container-object-count").and_then(|v| v.parse().ok()).unwrap_or(0),
            bytes_used: header("x-container-bytes-used").and_then(|v| v.parse().ok()).unwrap_or(0),
            metadata,
        }
    }
}
