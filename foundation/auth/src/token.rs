use std::sync::Arc;

use crate::error::Error;
use crate::oauth::AuthorizationCodeFlow;
use crate::store::TokenStore;
use crate::token_source::refresh_token_source::RefreshTokenSource;
use crate::token_source::reuse_token_source::ReuseTokenSource;
use crate::token_source::TokenSource;
use crate::Config;

/// A short-lived bearer credential for the account API.
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expiry: Option<time::OffsetDateTime>,
}

impl Token {
    /// Header value for `Authorization`.
    pub fn value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn valid(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }

    fn expired(&self) -> bool {
        match self.expiry {
            None => false,
            Some(s) => {
                let now = time::OffsetDateTime::now_utc();
                let exp = s - time::Duration::seconds(10);
                now > exp
            }
        }
    }
}

/// Builds the token source for one hubiC user.
///
/// When the store already holds a refresh token (and `force` is not set) the
/// access token is minted from it directly and the hosted login page is never
/// touched. Otherwise the authorization-code flow runs with the supplied
/// password and the newly granted refresh token is handed to the store.
pub struct UserTokenSourceProvider {
    ts: Arc<ReuseTokenSource>,
    pub user: String,
}

impl UserTokenSourceProvider {
    pub async fn new(
        config: Config,
        user: &str,
        password: Option<&str>,
        store: Arc<dyn TokenStore>,
        force: bool,
    ) -> Result<Self, Error> {
        let refresh_token = if force { None } else { store.load(user).await? };

        let ts = match refresh_token {
            Some(refresh_token) => {
                tracing::debug!(user, "using stored refresh token");
                let source = RefreshTokenSource::new(&config, refresh_token);
                let token = source.token().await?;
                ReuseTokenSource::new(Box::new(source), token)
            }
            None => {
                let password = password.ok_or(Error::PasswordRequired)?;
                let flow = AuthorizationCodeFlow::new(&config);
                let grant = flow.login(user, password).await?;
                store.save(user, &grant.refresh_token).await?;
                tracing::debug!(user, "authorization code flow complete, refresh token stored");
                let source = RefreshTokenSource::new(&config, grant.refresh_token);
                ReuseTokenSource::new(Box::new(source), grant.token)
            }
        };

        Ok(Self {
            ts: Arc::new(ts),
            user: user.to_string(),
        })
    }

    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        self.ts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Token;

    #[test]
    fn token_value_is_bearer() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        assert_eq!(token.value(), "Bearer abc");
    }

    #[test]
    fn token_without_expiry_is_valid() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        assert!(token.valid());
    }

    #[test]
    fn token_near_expiry_is_invalid() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(time::OffsetDateTime::now_utc() + time::Duration::seconds(5)),
        };
        // within the 10s leeway
        assert!(!token.valid());
    }

    #[test]
    fn empty_token_is_invalid() {
        let token = Token {
            access_token: String::new(),
            token_type: "Bearer".to_string(),
            expiry: None,
        };
        assert!(!token.valid());
    }
}
