use tokio_util::sync::CancellationToken as InternalCancellationToken;

/// CancellationToken wrapper for tokio_util::sync::CancellationToken, so the
/// public API does not leak the tokio-util version.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: InternalCancellationToken,
}

impl CancellationToken {
    /// Creates a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self {
            inner: InternalCancellationToken::new(),
        }
    }

    /// Creates a child token that is cancelled whenever this one is.
    pub fn child_token(&self) -> CancellationToken {
        Self {
            inner: self.inner.child_token(),
        }
    }

    /// Cancels this token and all child tokens. In-flight transfers guarded
    /// by it abort and release their connection.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}
