pub mod refresh_token_source;
pub mod reuse_token_source;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Error;
use crate::token::Token;

#[async_trait]
pub trait TokenSource: Send + Sync + Debug {
    async fn token(&self) -> Result<Token, Error>;
}

/// The OAuth flow must observe the 302 carrying the authorization code, so
/// redirects are never followed.
pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

#[derive(Clone, Deserialize)]
pub(crate) struct InternalToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

impl InternalToken {
    /// `now` is the server clock taken from the `Date` response header, which
    /// keeps the expiry correct under local clock skew.
    pub(crate) fn to_token(&self, now: time::OffsetDateTime) -> Token {
        Token {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone().unwrap_or_else(|| "Bearer".to_string()),
            expiry: self.expires_in.map(|s| now + time::Duration::seconds(s)),
        }
    }
}

#[derive(Deserialize, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Server wall-clock from the `Date` header, falling back to the local clock.
pub(crate) fn server_date(response: &reqwest::Response) -> time::OffsetDateTime {
    response
        .headers()
        .get(reqwest::header::DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| time::OffsetDateTime::parse(v, &time::format_description::well_known::Rfc2822).ok())
        .unwrap_or_else(time::OffsetDateTime::now_utc)
}

#[cfg(test)]
mod tests {
    use super::InternalToken;

    #[test]
    fn expiry_is_anchored_to_server_date() {
        let now = time::macros::datetime!(2015-01-02 03:04:05 UTC);
        let it = InternalToken {
            access_token: "a".to_string(),
            token_type: None,
            expires_in: Some(3600),
            refresh_token: None,
        };
        let token = it.to_token(now);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expiry, Some(now + time::Duration::seconds(3600)));
    }
}
