use async_trait::async_trait;

use crate::error::Error;
use crate::token::Token;
use crate::token_source::{default_http_client, server_date, ErrorBody, InternalToken, TokenSource};
use crate::Config;

/// Exchanges a previously granted refresh token for a fresh access token.
#[derive(Debug)]
pub struct RefreshTokenSource {
    client_id: String,
    client_secret: String,
    token_url: String,
    refresh_token: String,

    client: reqwest::Client,
}

impl RefreshTokenSource {
    pub fn new(config: &Config, refresh_token: String) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url(),
            refresh_token,
            client: default_http_client(),
        }
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        let form = [
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;
        let now = server_date(&response);

        match response.status().as_u16() {
            200 => {
                let it = response.json::<InternalToken>().await?;
                Ok(it.to_token(now))
            }
            400 | 401 | 500 => {
                let body = response.json::<ErrorBody>().await.unwrap_or_default();
                Err(Error::AuthResponse {
                    error: body.error,
                    description: body.error_description,
                })
            }
            s => Err(Error::UnexpectedStatusCode(s)),
        }
    }
}
