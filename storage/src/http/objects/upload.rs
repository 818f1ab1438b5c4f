use bytes::Bytes;

/// The body of a PUT.
///
/// `Empty` and `Bytes` are replayable, so transient failures are retried and
/// a 401 triggers a credential refresh plus one replay. `Stream` cannot be
/// rewound: it is sent exactly once and never retried.
pub enum UploadSource {
    Empty,
    Bytes(Bytes),
    Stream(reqwest::Body),
}

impl UploadSource {
    /// Body for one attempt. Only valid for replayable sources; streaming
    /// bodies are taken by value at the single call site.
    pub(crate) fn replay_body(&self) -> reqwest::Body {
        match self {
            UploadSource::Empty => reqwest::Body::from(Vec::new()),
            UploadSource::Bytes(bytes) => reqwest::Body::from(bytes.clone()),
            UploadSource::Stream(_) => unreachable!("streaming sources are not replayed"),
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(bytes: Bytes) -> Self {
        UploadSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        UploadSource::Bytes(bytes.into())
    }
}

#[cfg(test)]
mod tests {
    use super::UploadSource;

    #[test]
    fn replayable_sources_rebuild_their_body() {
        assert!(UploadSource::Empty.replay_body().as_bytes().is_some());
        let source = UploadSource::from(vec![1u8, 2, 3]);
        assert_eq!(source.replay_body().as_bytes(), Some(&[1u8, 2, 3][..]));
        // a second attempt sees the same bytes
        assert_eq!(source.replay_body().as_bytes(), Some(&[1u8, 2, 3][..]));
    }
}
