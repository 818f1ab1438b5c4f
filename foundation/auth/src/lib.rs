//! # hubic-auth
//!
//! OAuth2 authentication for the hubiC account API.
//!
//! The provider exposes an OAuth2 authorization-code flow behind a hosted
//! login page. This crate automates that flow (form autofill, code exchange)
//! for the first login, persists the resulting refresh token in a
//! [`store::TokenStore`], and afterwards mints short-lived access tokens from
//! the refresh token only.
//!
//! ```
//! use hubic_auth::{token::UserTokenSourceProvider, store::FileTokenStore, Config};
//! use std::sync::Arc;
//!
//! async fn run() {
//!     let config = Config::new("app_id", "app_secret", "http://localhost/");
//!     let store = Arc::new(FileTokenStore::new().unwrap());
//!     let provider = UserTokenSourceProvider::new(config, "user@example.com", Some("secret"), store, false)
//!         .await
//!         .unwrap();
//!     let ts = provider.token_source();
//!     let token = ts.token().await.unwrap();
//!     println!("{}", token.value());
//! }
//! ```

pub mod error;
mod form;
pub mod oauth;
pub mod store;
pub mod token;
pub mod token_source;

pub const DEFAULT_ENDPOINT: &str = "https://api.hubic.com";
const DEFAULT_SCOPE: &str = "account.r,usage.r,links.drw,credentials.r";

/// OAuth2 application registration plus the account API endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub endpoint: String,
    pub scope: String,
}

impl Config {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub(crate) fn token_url(&self) -> String {
        format!("{}/oauth/token", self.endpoint)
    }

    pub(crate) fn auth_url(&self) -> String {
        format!("{}/oauth/auth", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn config_defaults() {
        let config = Config::new("id", "secret", "http://localhost/");
        assert_eq!(config.endpoint, "https://api.hubic.com");
        assert_eq!(config.token_url(), "https://api.hubic.com/oauth/token");
        assert_eq!(config.auth_url(), "https://api.hubic.com/oauth/auth");
        assert!(config.scope.contains("credentials.r"));
    }
}
