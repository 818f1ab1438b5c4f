use std::ops::Deref;
use std::sync::Arc;

use hubic_auth::store::{FileTokenStore, TokenStore};
use hubic_auth::token::UserTokenSourceProvider;
use hubic_auth::token_source::TokenSource;

use crate::credential::CredentialCache;
use crate::http::account::{Account, AccountClient, Usage};
use crate::http::retry::RetrySetting;
use crate::http::storage_client::StorageClient;
use crate::http::Error;

/// Assembles a [`Client`]. A token source must be provided, either directly
/// or via [`ClientConfig::with_auth`].
pub struct ClientConfig {
    pub http: Option<reqwest::Client>,
    /// Account API base, normally `https://api.hubic.com`.
    pub api_endpoint: String,
    /// Container that bare object paths resolve into.
    pub default_container: String,
    pub token_source: Option<Arc<dyn TokenSource>>,
    pub retry: RetrySetting,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http: None,
            api_endpoint: hubic_auth::DEFAULT_ENDPOINT.to_string(),
            default_container: "default".to_string(),
            token_source: None,
            retry: RetrySetting::default(),
        }
    }
}

impl ClientConfig {
    /// Runs the OAuth setup for `user` and installs the resulting token
    /// source. The refresh token lands in the default file store; pass
    /// `force` to redo the authorization flow even when one is stored.
    pub async fn with_auth(
        mut self,
        auth_config: hubic_auth::Config,
        user: &str,
        password: Option<&str>,
        force: bool,
    ) -> Result<Self, Error> {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new()?);
        let provider = UserTokenSourceProvider::new(auth_config, user, password, store, force).await?;
        self.token_source = Some(provider.token_source());
        Ok(self)
    }
}

/// The hubiC client: the Swift data plane plus the account control plane.
/// Cheap to clone; clones share the credential cache.
#[derive(Clone)]
pub struct Client {
    storage_client: StorageClient,
    account_client: AccountClient,
}

impl Deref for Client {
    type Target = StorageClient;

    fn deref(&self) -> &Self::Target {
        &self.storage_client
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let ts = config.token_source.ok_or(Error::TokenSourceRequired)?;
        let http = config.http.unwrap_or_default();
        let account_client = AccountClient::new(ts, &config.api_endpoint, http.clone());
        let credentials = Arc::new(CredentialCache::new(account_client.clone()));
        Ok(Self {
            storage_client: StorageClient::new(credentials, http, config.default_container, config.retry),
            account_client,
        })
    }

    /// Account identity and subscription details.
    pub async fn account(&self) -> Result<Account, Error> {
        self.account_client.account().await
    }

    /// Storage consumption against the account quota.
    pub async fn usage(&self) -> Result<Usage, Error> {
        self.account_client.usage().await
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientConfig};
    use crate::http::Error;

    #[test]
    fn client_requires_a_token_source() {
        let result = Client::new(ClientConfig::default());
        assert!(matches!(result, Err(Error::TokenSourceRequired)));
    }

    #[test]
    fn default_config_targets_the_hubic_api() {
        let config = ClientConfig::default();
        assert_eq!(config.api_endpoint, "https://api.hubic.com");
        assert_eq!(config.default_container, "default");
    }
}
