use std::collections::HashMap;

use url::Url;

use crate::error::Error;
use crate::form;
use crate::token::Token;
use crate::token_source::{default_http_client, server_date, ErrorBody, InternalToken};
use crate::Config;

/// The first-login grant: an access token plus the refresh token that the
/// caller must hand to a token store.
pub struct TokenGrant {
    pub token: Token,
    pub refresh_token: String,
}

/// Automates the hosted-login authorization-code flow.
pub struct AuthorizationCodeFlow {
    config: Config,
    client: reqwest::Client,
}

impl AuthorizationCodeFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            client: default_http_client(),
        }
    }

    pub async fn login(&self, user: &str, password: &str) -> Result<TokenGrant, Error> {
        let code = self.request_code(user, password).await?;
        self.exchange_code(&code).await
    }

    /// Fetches the hosted confirmation page, autofills it and posts it back,
    /// then pulls the authorization code out of the 302 redirect.
    async fn request_code(&self, user: &str, password: &str) -> Result<String, Error> {
        let page = self
            .client
            .get(self.config.auth_url())
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("state", "random"),
            ])
            .send()
            .await?
            .text()
            .await?;

        let fields = form::autofill(&page, user, password)?;

        let response = self.client.post(self.config.auth_url()).form(&fields).send().await?;
        let status = response.status().as_u16();
        let query = self.redirect_query(&response);

        match status {
            302 => query?
                .get("code")
                .cloned()
                .ok_or(Error::MissingAuthorizationCode),
            400 | 401 | 500 => {
                // The provider reports the error in the redirect query when
                // it redirects at all.
                let query = query.unwrap_or_default();
                Err(Error::AuthResponse {
                    error: query.get("error").cloned().unwrap_or_default(),
                    description: query.get("error_description").cloned().unwrap_or_default(),
                })
            }
            s => Err(Error::UnexpectedStatusCode(s)),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, Error> {
        let form = [
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self.client.post(self.config.token_url()).form(&form).send().await?;
        let now = server_date(&response);

        match response.status().as_u16() {
            200 => {
                let it = response.json::<InternalToken>().await?;
                let refresh_token = it.refresh_token.clone().ok_or(Error::RefreshTokenIsRequired)?;
                Ok(TokenGrant {
                    token: it.to_token(now),
                    refresh_token,
                })
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

    /// Query parameters of the `Location` header. The provider may answer
    /// with a relative location, resolved against the account endpoint.
    fn redirect_query(&self, response: &reqwest::Response) -> Result<HashMap<String, String>, Error> {
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::MissingRedirectLocation)?;

        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&self.config.endpoint)?.join(location)?,
            Err(e) => return Err(e.into()),
        };

        Ok(url.query_pairs().into_owned().collect())
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    #[test]
    fn redirect_query_extracts_code() {
        let url = Url::parse("http://localhost/?code=abc123&state=random&scope=account.r").unwrap();
        let query: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("code").map(String::as_str), Some("abc123"));
    }
}
