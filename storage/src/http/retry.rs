use std::future::Future;
use std::time::Duration;

use tokio::select;

use crate::http::cancel::CancellationToken;
use crate::http::Error;

/// Classification of one storage response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    /// Likely to succeed on immediate retry.
    Transient,
    Fatal,
}

/// Shared response classification for every data-plane operation.
///
/// 413 is fatal even though it is a 4xx peer of nothing else here: the object
/// exceeds the provider size limit and retrying cannot help.
pub fn classify(status: u16) -> Outcome {
    match status {
        200..=299 => Outcome::Success,
        404 => Outcome::NotFound,
        408 => Outcome::Transient,
        413 => Outcome::Fatal,
        500..=599 => Outcome::Transient,
        _ => Outcome::Fatal,
    }
}

pub(crate) trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for Error {
    fn is_transient(&self) -> bool {
        match self {
            Error::Response(status, _) => classify(*status) == Outcome::Transient,
            // connection resets and timeouts before any status line
            Error::HttpClient(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Delays double from the base, saturating at `max_delay` once set.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: u64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    pub fn from_millis(base: u64) -> ExponentialBackoff {
        ExponentialBackoff {
            current: base.max(1),
            max_delay: None,
        }
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let duration = Duration::from_millis(self.current);

        if let Some(max_delay) = self.max_delay {
            if duration > max_delay {
                return Some(max_delay);
            }
        }

        self.current = self.current.checked_mul(2).unwrap_or(u64::MAX);
        Some(duration)
    }
}

/// Bounded retry for transient failures.
///
/// `attempts` counts the first try, so the default of 3 means at most two
/// retries. The exhausted case surfaces the last transient error as fatal.
#[derive(Clone, Debug)]
pub struct RetrySetting {
    pub base_millis: u64,
    pub max_delay: Option<Duration>,
    pub attempts: usize,
}

impl RetrySetting {
    fn strategy(&self) -> ExponentialBackoff {
        let mut st = ExponentialBackoff::from_millis(self.base_millis);
        st.max_delay = self.max_delay;
        st
    }
}

impl Default for RetrySetting {
    fn default() -> Self {
        Self {
            base_millis: 100,
            max_delay: Some(Duration::from_secs(2)),
            attempts: 3,
        }
    }
}

/// Runs `a` until success, a non-transient error, or the attempt bound,
/// sleeping per the backoff strategy between attempts. Cancellation aborts
/// the whole loop.
pub(crate) async fn invoke<R, A>(
    setting: &RetrySetting,
    cancel: Option<CancellationToken>,
    mut a: impl FnMut() -> A,
) -> Result<R, Error>
where
    A: Future<Output = Result<R, Error>>,
{
    let fn_loop = async {
        let mut strategy = setting.strategy();
        let mut remaining = setting.attempts.max(1) - 1;
        loop {
            let err = match a().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if remaining == 0 || !err.is_transient() {
                return Err(err);
            }
            remaining -= 1;
            tracing::debug!("transient failure, retrying: {err}");
            match strategy.next() {
                Some(duration) => tokio::time::sleep(duration).await,
                None => return Err(err),
            }
        }
    };

    match cancel {
        Some(cancel) => {
            select! {
                _ = cancel.cancelled() => Err(Error::Cancelled),
                v = fn_loop => v
            }
        }
        None => fn_loop.await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{classify, invoke, ExponentialBackoff, Outcome, RetrySetting};
    use crate::http::cancel::CancellationToken;
    use crate::http::Error;

    fn fast() -> RetrySetting {
        RetrySetting {
            base_millis: 1,
            max_delay: Some(Duration::from_millis(2)),
            attempts: 3,
        }
    }

    #[test]
    fn classification_matches_policy() {
        assert_eq!(classify(200), Outcome::Success);
        assert_eq!(classify(204), Outcome::Success);
        assert_eq!(classify(404), Outcome::NotFound);
        assert_eq!(classify(408), Outcome::Transient);
        assert_eq!(classify(502), Outcome::Transient);
        assert_eq!(classify(503), Outcome::Transient);
        assert_eq!(classify(500), Outcome::Transient);
        assert_eq!(classify(413), Outcome::Fatal);
        assert_eq!(classify(302), Outcome::Fatal);
        assert_eq!(classify(401), Outcome::Fatal);
    }

    #[test]
    fn backoff_grows_until_capped() {
        let mut st = ExponentialBackoff::from_millis(100);
        st.max_delay = Some(Duration::from_millis(500));
        assert_eq!(st.next(), Some(Duration::from_millis(100)));
        assert_eq!(st.next(), Some(Duration::from_millis(200)));
        assert_eq!(st.next(), Some(Duration::from_millis(400)));
        assert_eq!(st.next(), Some(Duration::from_millis(500)));
        assert_eq!(st.next(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn backoff_doubles_without_a_cap() {
        let mut st = ExponentialBackoff::from_millis(100);
        assert_eq!(st.next(), Some(Duration::from_millis(100)));
        assert_eq!(st.next(), Some(Duration::from_millis(200)));
        assert_eq!(st.next(), Some(Duration::from_millis(400)));
        assert_eq!(st.next(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn zero_base_still_advances() {
        let mut st = ExponentialBackoff::from_millis(0);
        assert_eq!(st.next(), Some(Duration::from_millis(1)));
        assert_eq!(st.next(), Some(Duration::from_millis(2)));
    }

    #[tokio::test]
    async fn transient_twice_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result: Result<&str, Error> = invoke(&fast(), None, move || {
            let c = c.clone();
            async move {
                match c.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(Error::Response(503, "unavailable".to_string())),
                    _ => Ok("ok"),
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result: Result<(), Error> = invoke(&fast(), None, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(Error::Response(503, "unavailable".to_string()))
            }
        })
        .await;
        match result.unwrap_err() {
            Error::Response(status, _) => assert_eq!(status, 503),
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result: Result<(), Error> = invoke(&fast(), None, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(Error::Response(413, "too large".to_string()))
            }
        })
        .await;
        assert!(matches!(result.unwrap_err(), Error::Response(413, _)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_loop() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), Error> = invoke(&fast(), Some(cancel), || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result.unwrap_err(), Error::Cancelled));
    }
}
