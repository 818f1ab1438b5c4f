use async_trait::async_trait;

use crate::error::Error;
use crate::token::Token;
use crate::token_source::TokenSource;

/// Caches the current token and serializes refresh behind a single lock, so
/// concurrent callers observing an expired token trigger exactly one exchange.
#[derive(Debug)]
pub struct ReuseTokenSource {
    target: Box<dyn TokenSource>,
    current_token: std::sync::RwLock<Token>,
    guard: tokio::sync::Mutex<()>,
}

impl ReuseTokenSource {
    pub fn new(target: Box<dyn TokenSource>, token: Token) -> ReuseTokenSource {
        ReuseTokenSource {
            target,
            current_token: std::sync::RwLock::new(token),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    fn r_lock_token(&self) -> Result<Token, Error> {
        let token = self.current_token.read()?;
        if token.valid() {
            Ok(token.clone())
        } else {
            Err(Error::InvalidToken)
        }
    }
}

#[async_trait]
impl TokenSource for ReuseTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        // Only a single task refreshes.
        let _locking = self.guard.lock().await;

        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        let token = self.target.token().await?;
        tracing::debug!("access token refreshed, expiry={:?}", token.expiry);
        *self.current_token.write()? = token.clone();
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::ReuseTokenSource;
    use crate::error::Error;
    use crate::token::Token;
    use crate::token_source::TokenSource;

    #[derive(Debug)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn token(&self) -> Result<Token, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Token {
                access_token: "fresh".to_string(),
                token_type: "Bearer".to_string(),
                expiry: Some(time::OffsetDateTime::now_utc() + time::Duration::hours(1)),
            })
        }
    }

    fn valid_token(value: &str) -> Token {
        Token {
            access_token: value.to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(time::OffsetDateTime::now_utc() + time::Duration::hours(1)),
        }
    }

    fn expired_token() -> Token {
        Token {
            access_token: "stale".to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(time::OffsetDateTime::now_utc() - time::Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn valid_token_is_reused_without_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ts = ReuseTokenSource::new(Box::new(CountingSource { calls: calls.clone() }), valid_token("seed"));
        let token = ts.token().await.unwrap();
        assert_eq!(token.access_token, "seed");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_triggers_single_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ts = ReuseTokenSource::new(Box::new(CountingSource { calls: calls.clone() }), expired_token());
        let token = ts.token().await.unwrap();
        assert_eq!(token.access_token, "fresh");
        let token = ts.token().await.unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
