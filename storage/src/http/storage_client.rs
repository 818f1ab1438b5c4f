use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{Stream, StreamExt, TryStreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::select;

use crate::credential::{CredentialCache, StorageCredential};
use crate::http::cancel::CancellationToken;
use crate::http::containers::{ContainerInfo, ContainerStat};
use crate::http::objects::download::{with_range, Range};
use crate::http::objects::list::{ListObjectsRequest, ListingPage, RawObjectEntry};
use crate::http::objects::upload::UploadSource;
use crate::http::objects::{metadata_from_headers, ObjectMetadata, Progress, TYPE_DIRECTORY};
use crate::http::retry::{invoke, RetrySetting};
use crate::http::{escape_path, map_error, Error, Escape};
use crate::object_ref::{ObjectRef, Reference};

const AUTH_TOKEN: &str = "X-Auth-Token";
const FORMAT_JSON: [(&str, &str); 1] = [("format", "json")];

/// The Swift data plane. One blocking call per operation, no internal
/// fan-out; transient failures are retried per [`RetrySetting`], and a 401
/// forces one credential refetch followed by a single replay.
#[derive(Clone)]
pub struct StorageClient {
    credentials: Arc<CredentialCache>,
    http: reqwest::Client,
    default_container: String,
    retry: RetrySetting,
}

impl StorageClient {
    pub(crate) fn new(
        credentials: Arc<CredentialCache>,
        http: reqwest::Client,
        default_container: String,
        retry: RetrySetting,
    ) -> Self {
        Self {
            credentials,
            http,
            default_container,
            retry,
        }
    }

    pub fn default_container(&self) -> &str {
        &self.default_container
    }

    /// Resolves a reference against the default container.
    pub fn normalize(&self, target: &Reference) -> Result<ObjectRef, Error> {
        target.normalize(&self.default_container)
    }

    /// Object metadata, or `None` when the object does not exist.
    pub async fn head_object(
        &self,
        target: &Reference,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<ObjectMetadata>, Error> {
        let target = self.normalize(target)?;
        let cred = self.credentials.credential(false).await?;
        match self.head_attempts(&cred, &target, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.head_attempts(&cred, &target, cancel).await
            }
            other => other,
        }
    }

    async fn head_attempts(
        &self,
        cred: &StorageCredential,
        target: &ObjectRef,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<ObjectMetadata>, Error> {
        let url = target.url(&cred.endpoint);
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            async move {
                let response = self.http.head(&url).header(AUTH_TOKEN, &token).send().await?;
                if response.status().as_u16() == 404 {
                    return Ok(None);
                }
                if response.status().is_success() {
                    return Ok(Some(metadata_from_headers(response.headers())));
                }
                Err(map_error(response).await)
            }
        })
        .await
    }

    /// Fetches an object into memory. Prefer the streaming variants for
    /// anything large.
    pub async fn download_object(
        &self,
        target: &Reference,
        range: Option<Range>,
        cancel: Option<CancellationToken>,
    ) -> Result<(ObjectMetadata, Vec<u8>), Error> {
        let (meta, stream) = self.download_streamed(target, range, cancel).await?;
        futures_util::pin_mut!(stream);
        let mut buf = Vec::with_capacity(prealloc_size(meta.content_length));
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok((meta, buf))
    }

    /// Opens a download and hands back the body as a byte stream. Dropping
    /// the stream mid-transfer releases the connection. Unlike `head`, a 404
    /// here is a fatal [`Error::Response`]; callers that must tolerate
    /// missing objects head first.
    pub async fn download_streamed(
        &self,
        target: &Reference,
        range: Option<Range>,
        cancel: Option<CancellationToken>,
    ) -> Result<(ObjectMetadata, impl Stream<Item = Result<bytes::Bytes, Error>>), Error> {
        let target = self.normalize(target)?;
        let response = self.open_download(&target, range, cancel).await?;
        let meta = metadata_from_headers(response.headers());
        Ok((meta, response.bytes_stream().map_err(Error::HttpClient)))
    }

    /// Streams an object into `writer` chunk by chunk, reporting progress to
    /// the optional callback: the metadata snapshot once before the first
    /// byte, every chunk, then [`Progress::Done`].
    pub async fn download_to<W>(
        &self,
        target: &Reference,
        writer: &mut W,
        range: Option<Range>,
        mut progress: Option<&mut (dyn FnMut(Progress<'_>) + Send)>,
        cancel: Option<CancellationToken>,
    ) -> Result<ObjectMetadata, Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let target = self.normalize(target)?;
        let response = self.open_download(&target, range, cancel.clone()).await?;
        let meta = metadata_from_headers(response.headers());
        if let Some(cb) = progress.as_deref_mut() {
            cb(Progress::Metadata(&meta));
        }

        let copy = async {
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                writer.write_all(&chunk).await?;
                if let Some(cb) = progress.as_deref_mut() {
                    cb(Progress::Chunk(&chunk));
                }
            }
            writer.flush().await?;
            Ok::<(), Error>(())
        };
        match cancel {
            // cancelling drops the stream, which releases the connection
            Some(cancel) => {
                select! {
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    r = copy => r,
                }
            }
            None => copy.await,
        }?;

        if let Some(cb) = progress.as_deref_mut() {
            cb(Progress::Done);
        }
        Ok(meta)
    }

    async fn open_download(
        &self,
        target: &ObjectRef,
        range: Option<Range>,
        cancel: Option<CancellationToken>,
    ) -> Result<reqwest::Response, Error> {
        let cred = self.credentials.credential(false).await?;
        match self.open_attempts(&cred, target, range, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.open_attempts(&cred, target, range, cancel).await
            }
            other => other,
        }
    }

    async fn open_attempts(
        &self,
        cred: &StorageCredential,
        target: &ObjectRef,
        range: Option<Range>,
        cancel: Option<CancellationToken>,
    ) -> Result<reqwest::Response, Error> {
        let url = target.url(&cred.endpoint);
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            async move {
                let builder = with_range(self.http.get(&url).header(AUTH_TOKEN, &token), range)?;
                let response = builder.send().await?;
                if response.status().is_success() {
                    Ok(response)
                } else {
                    Err(map_error(response).await)
                }
            }
        })
        .await
    }

    /// Stores an object. Any 2xx is success; 413 means the object exceeds
    /// the provider size limit and is never retried. Streaming sources get a
    /// single attempt, see [`UploadSource`].
    pub async fn upload_object(
        &self,
        target: &Reference,
        source: UploadSource,
        content_type: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let target = self.normalize(target)?;
        let cred = self.credentials.credential(false).await?;

        let source = match source {
            UploadSource::Stream(body) => {
                let url = target.url(&cred.endpoint);
                let action = self.put_request(&url, &cred.token, body, content_type);
                return match cancel {
                    Some(cancel) => {
                        select! {
                            _ = cancel.cancelled() => Err(Error::Cancelled),
                            r = action => r,
                        }
                    }
                    None => action.await,
                };
            }
            replayable => replayable,
        };

        match self.put_attempts(&cred, &target, &source, content_type, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.put_attempts(&cred, &target, &source, content_type, cancel).await
            }
            other => other,
        }
    }

    async fn put_attempts(
        &self,
        cred: &StorageCredential,
        target: &ObjectRef,
        source: &UploadSource,
        content_type: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let url = target.url(&cred.endpoint);
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            let content_type = content_type.to_string();
            let body = source.replay_body();
            async move { self.put_request(&url, &token, body, &content_type).await }
        })
        .await
    }

    async fn put_request(
        &self,
        url: &str,
        token: &str,
        body: reqwest::Body,
        content_type: &str,
    ) -> Result<(), Error> {
        let response = self
            .http
            .put(url)
            .header(AUTH_TOKEN, token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(map_error(response).await)
        }
    }

    /// Deletes an object. The raw outcome is reported: deleting an absent
    /// object is [`Error::NotFound`], which thin wrappers may ignore.
    pub async fn delete_object(&self, target: &Reference, cancel: Option<CancellationToken>) -> Result<(), Error> {
        let target = self.normalize(target)?;
        let cred = self.credentials.credential(false).await?;
        match self.delete_attempts(&cred, &target, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.delete_attempts(&cred, &target, cancel).await
            }
            other => other,
        }
    }

    async fn delete_attempts(
        &self,
        cred: &StorageCredential,
        target: &ObjectRef,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let url = target.url(&cred.endpoint);
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            async move {
                let response = self.http.delete(&url).header(AUTH_TOKEN, &token).send().await?;
                match response.status().as_u16() {
                    404 => Err(Error::NotFound),
                    s if (200..300).contains(&s) => Ok(()),
                    _ => Err(map_error(response).await),
                }
            }
        })
        .await
    }

    /// Server-side copy via the Swift `COPY` verb; no object bytes travel
    /// through the client.
    pub async fn copy_object(
        &self,
        src: &Reference,
        dst: &Reference,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let src = self.normalize(src)?;
        let dst = self.normalize(dst)?;
        let destination = format!("/{}/{}", dst.container.escape(), escape_path(&dst.path));

        let cred = self.credentials.credential(false).await?;
        match self.copy_attempts(&cred, &src, &destination, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.copy_attempts(&cred, &src, &destination, cancel).await
            }
            other => other,
        }
    }

    async fn copy_attempts(
        &self,
        cred: &StorageCredential,
        src: &ObjectRef,
        destination: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let url = src.url(&cred.endpoint);
        let method = reqwest::Method::from_bytes(b"COPY").unwrap();
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            let method = method.clone();
            let destination = destination.to_string();
            async move {
                let response = self
                    .http
                    .request(method, &url)
                    .header(AUTH_TOKEN, &token)
                    .header("Destination", &destination)
                    .send()
                    .await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(map_error(response).await)
                }
            }
        })
        .await
    }

    /// Creates a zero-byte directory marker. Succeeds when the marker is
    /// already there; an existing object of any other type is a conflict.
    pub async fn mkdir(&self, target: &Reference, cancel: Option<CancellationToken>) -> Result<(), Error> {
        match self.head_object(target, cancel.clone()).await? {
            Some(meta) if meta.content_type == TYPE_DIRECTORY => Ok(()),
            Some(_) => Err(Error::AlreadyExists),
            None => {
                self.upload_object(target, UploadSource::Empty, TYPE_DIRECTORY, cancel)
                    .await
            }
        }
    }

    /// One listing page of a container (the default container when `None`),
    /// in provider order.
    pub async fn list_objects(
        &self,
        container: Option<&str>,
        req: &ListObjectsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ListingPage, Error> {
        let container = container.unwrap_or(&self.default_container);
        if container.is_empty() {
            return Err(Error::InvalidReference("no container resolves".to_string()));
        }

        let mut req = req.clone();
        if let Some(path) = req.path.take() {
            req.path = Some(path.strip_prefix('/').unwrap_or(&path).to_string());
        }

        let cred = self.credentials.credential(false).await?;
        match self.list_attempts(&cred, container, &req, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.list_attempts(&cred, container, &req, cancel).await
            }
            other => other,
        }
    }

    async fn list_attempts(
        &self,
        cred: &StorageCredential,
        container: &str,
        req: &ListObjectsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ListingPage, Error> {
        let url = format!("{}/{}", cred.endpoint, container.escape());
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            let req = req.clone();
            async move {
                let response = self
                    .http
                    .get(&url)
                    .header(AUTH_TOKEN, &token)
                    .query(&FORMAT_JSON)
                    .query(&req)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(map_error(response).await);
                }
                let headers = response.headers().clone();
                let raw = response.json::<Vec<RawObjectEntry>>().await?;
                Ok(ListingPage::from_response(&headers, raw))
            }
        })
        .await
    }

    /// All containers of the account, keyed by name.
    pub async fn list_containers(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<HashMap<String, ContainerInfo>, Error> {
        let cred = self.credentials.credential(false).await?;
        match self.list_containers_attempts(&cred, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.list_containers_attempts(&cred, cancel).await
            }
            other => other,
        }
    }

    async fn list_containers_attempts(
        &self,
        cred: &StorageCredential,
        cancel: Option<CancellationToken>,
    ) -> Result<HashMap<String, ContainerInfo>, Error> {
        let url = format!("{}/", cred.endpoint);
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            async move {
                let response = self
                    .http
                    .get(&url)
                    .header(AUTH_TOKEN, &token)
                    .query(&FORMAT_JSON)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(map_error(response).await);
                }
                let containers = response.json::<Vec<ContainerInfo>>().await?;
                Ok(containers.into_iter().map(|c| (c.name.clone(), c)).collect())
            }
        })
        .await
    }

    /// Container counters and metadata, or `None` when the container does
    /// not exist.
    pub async fn stat_container(
        &self,
        name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<ContainerStat>, Error> {
        let cred = self.credentials.credential(false).await?;
        match self.stat_container_attempts(&cred, name, cancel.clone()).await {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.stat_container_attempts(&cred, name, cancel).await
            }
            other => other,
        }
    }

    async fn stat_container_attempts(
        &self,
        cred: &StorageCredential,
        name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<ContainerStat>, Error> {
        let url = format!("{}/{}", cred.endpoint, name.escape());
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            async move {
                let response = self.http.head(&url).header(AUTH_TOKEN, &token).send().await?;
                if response.status().as_u16() == 404 {
                    return Ok(None);
                }
                if response.status().is_success() {
                    return Ok(Some(ContainerStat::from_headers(response.headers())));
                }
                Err(map_error(response).await)
            }
        })
        .await
    }

    pub async fn create_container(&self, name: &str, cancel: Option<CancellationToken>) -> Result<(), Error> {
        self.container_request(reqwest::Method::PUT, name, cancel).await
    }

    /// Deletes a container. Swift refuses with 409 while it still holds
    /// objects; that surfaces as a fatal [`Error::Response`].
    pub async fn delete_container(&self, name: &str, cancel: Option<CancellationToken>) -> Result<(), Error> {
        self.container_request(reqwest::Method::DELETE, name, cancel).await
    }

    async fn container_request(
        &self,
        method: reqwest::Method,
        name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let cred = self.credentials.credential(false).await?;
        match self
            .container_request_attempts(&cred, method.clone(), name, cancel.clone())
            .await
        {
            Err(Error::Response(401, _)) => {
                let cred = self.refreshed_credential().await?;
                self.container_request_attempts(&cred, method, name, cancel).await
            }
            other => other,
        }
    }

    async fn container_request_attempts(
        &self,
        cred: &StorageCredential,
        method: reqwest::Method,
        name: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let url = format!("{}/{}", cred.endpoint, name.escape());
        invoke(&self.retry, cancel, || {
            let url = url.clone();
            let token = cred.token.clone();
            let method = method.clone();
            async move {
                let response = self.http.request(method, &url).header(AUTH_TOKEN, &token).send().await?;
                match response.status().as_u16() {
                    404 => Err(Error::NotFound),
                    s if (200..300).contains(&s) => Ok(()),
                    _ => Err(map_error(response).await),
                }
            }
        })
        .await
    }

    async fn refreshed_credential(&self) -> Result<StorageCredential, Error> {
        tracing::debug!("storage token rejected, forcing credential refresh");
        self.credentials.credential(true).await
    }
}

const MAX_PREALLOC_BYTES: u64 = 4 * 1024 * 1024;

/// Initial buffer size for an in-memory download. The announced
/// content-length is a server-supplied header, so preallocation is capped
/// and the buffer grows with the actual bytes.
fn prealloc_size(content_length: u64) -> usize {
    content_length.min(MAX_PREALLOC_BYTES) as usize
}

#[cfg(test)]
mod tests {
    use super::{prealloc_size, MAX_PREALLOC_BYTES};

    #[test]
    fn preallocation_is_capped_at_the_limit() {
        assert_eq!(prealloc_size(0), 0);
        assert_eq!(prealloc_size(1234), 1234);
        assert_eq!(prealloc_size(MAX_PREALLOC_BYTES), MAX_PREALLOC_BYTES as usize);
        assert_eq!(prealloc_size(u64::MAX), MAX_PREALLOC_BYTES as usize);
    }
}
