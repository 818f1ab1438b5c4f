use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Response;

pub mod account;
pub mod cancel;
pub mod containers;
pub mod objects;
pub mod retry;
pub mod storage_client;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A non-success status from the storage or account API, carrying the
    /// status code and the response body.
    #[error("http error status={0} message={1}")]
    Response(u16, String),

    #[error("object not found")]
    NotFound,

    /// The target exists with an incompatible type, e.g. `mkdir` over a
    /// plain object.
    #[error("target already exists with a different content type")]
    AlreadyExists,

    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    #[error("invalid byte range: offset={0} length={1}")]
    InvalidRange(u64, u64),

    #[error("token source is required")]
    TokenSourceRequired,

    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    TokenSource(#[from] hubic_auth::error::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("lock is poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}

/// Maps a non-success response to [`Error::Response`], consuming the body.
pub(crate) async fn map_error(r: Response) -> Error {
    let status = r.status().as_u16();
    let text = match r.text().await {
        Ok(text) => text,
        Err(e) => format!("{e}"),
    };
    Error::Response(status, text)
}

pub(crate) trait Escape {
    fn escape(&self) -> String;
}

impl Escape for str {
    fn escape(&self) -> String {
        utf8_percent_encode(self, ENCODE_SET).to_string()
    }
}

const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'*').remove(b'-').remove(b'.').remove(b'_');

/// Escapes an object path segment by segment, keeping `/` separators intact.
pub(crate) fn escape_path(path: &str) -> String {
    path.split('/').map(|s| s.escape()).collect::<Vec<_>>().join("/")
}
