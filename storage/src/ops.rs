//! Filesystem convenience wrappers over the raw object operations.

use std::path::Path;

use tokio_util::io::ReaderStream;

use crate::http::cancel::CancellationToken;
use crate::http::objects::upload::UploadSource;
use crate::http::objects::{ObjectMetadata, Progress, TYPE_OCTET_STREAM};
use crate::http::storage_client::StorageClient;
use crate::http::Error;
use crate::object_ref::Reference;

impl StorageClient {
    /// Streams an object into a local file, creating or truncating it.
    pub async fn download_to_file(
        &self,
        target: &Reference,
        path: impl AsRef<Path>,
        progress: Option<&mut (dyn FnMut(Progress<'_>) + Send)>,
        cancel: Option<CancellationToken>,
    ) -> Result<ObjectMetadata, Error> {
        let mut file = tokio::fs::File::create(path).await?;
        self.download_to(target, &mut file, None, progress, cancel).await
    }

    /// Streams a local file up as an object. The body is read once off disk,
    /// so transport failures are not retried; content type defaults to
    /// `application/octet-stream`.
    pub async fn upload_from_file(
        &self,
        target: &Reference,
        path: impl AsRef<Path>,
        content_type: Option<&str>,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let file = tokio::fs::File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        self.upload_object(
            target,
            UploadSource::Stream(body),
            content_type.unwrap_or(TYPE_OCTET_STREAM),
            cancel,
        )
        .await
    }
}
