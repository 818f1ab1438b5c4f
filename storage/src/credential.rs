use std::sync::RwLock;

use crate::http::account::AccountClient;
use crate::http::Error;

/// A credential scoped to the object storage endpoint, derived from the
/// account API and re-derived when expired or forced.
#[derive(Debug, Clone)]
pub struct StorageCredential {
    pub endpoint: String,
    pub token: String,
    pub expires: Option<time::OffsetDateTime>,
}

impl StorageCredential {
    pub fn valid(&self) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.expires {
            None => true,
            Some(expires) => time::OffsetDateTime::now_utc() < expires - time::Duration::seconds(10),
        }
    }
}

/// Caches the storage credential and serializes refetching, mirroring the
/// reuse-token-source shape: the whole credential value is swapped in
/// atomically, never mutated field by field.
pub(crate) struct CredentialCache {
    account: AccountClient,
    current: RwLock<Option<StorageCredential>>,
    guard: tokio::sync::Mutex<()>,
}

impl CredentialCache {
    pub(crate) fn new(account: AccountClient) -> Self {
        Self {
            account,
            current: RwLock::new(None),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns a valid credential, refetching when absent, expired or
    /// `force` is set (e.g. after a 401 from the data plane).
    pub(crate) async fn credential(&self, force: bool) -> Result<StorageCredential, Error> {
        if !force {
            if let Some(cred) = self.r_lock_credential()? {
                return Ok(cred);
            }
        }

        // Only a single task refetches.
        let _locking = self.guard.lock().await;

        if !force {
            if let Some(cred) = self.r_lock_credential()? {
                return Ok(cred);
            }
        }

        let response = self.account.credentials().await?;
        let expires = response.expires.as_deref().and_then(parse_expiry);
        let cred = StorageCredential {
            endpoint: response.endpoint.trim_end_matches('/').to_string(),
            token: response.token,
            expires,
        };
        tracing::debug!(endpoint = %cred.endpoint, "storage credential refreshed, expires={:?}", cred.expires);
        *self.current.write()? = Some(cred.clone());
        Ok(cred)
    }

    fn r_lock_credential(&self) -> Result<Option<StorageCredential>, Error> {
        Ok(self.current.read()?.clone().filter(|c| c.valid()))
    }
}

fn parse_expiry(raw: &str) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_expiry, StorageCredential};

    #[test]
    fn rfc3339_expiry_parses() {
        let e = parse_expiry("2014-07-24T12:00:00+02:00").unwrap();
        assert_eq!(e.year(), 2014);
        assert_eq!(e.offset().whole_hours(), 2);
        assert!(parse_expiry("tomorrow").is_none());
    }

    #[test]
    fn credential_validity_honors_leeway() {
        let live = StorageCredential {
            endpoint: "https://storage.example.com/v1/AUTH_x".to_string(),
            token: "tok".to_string(),
            expires: Some(time::OffsetDateTime::now_utc() + time::Duration::hours(1)),
        };
        assert!(live.valid());

        let near_expiry = StorageCredential {
            expires: Some(time::OffsetDateTime::now_utc() + time::Duration::seconds(5)),
            ..live.clone()
        };
        assert!(!near_expiry.valid());

        let no_expiry = StorageCredential {
            expires: None,
            ..live.clone()
        };
        assert!(no_expiry.valid());

        let empty_token = StorageCredential {
            token: String::new(),
            ..live
        };
        assert!(!empty_token.valid());
    }
}
