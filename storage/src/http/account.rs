use std::sync::Arc;

use hubic_auth::token_source::TokenSource;
use serde::Deserialize;

use crate::http::{map_error, Error};

/// The hubiC account control plane, authenticated with the OAuth2 bearer
/// token. The object storage endpoint and its scoped token are obtained here.
#[derive(Clone)]
pub struct AccountClient {
    ts: Arc<dyn TokenSource>,
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Account {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub offer: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub used: u64,
    pub quota: u64,
}

/// Wire shape of `GET /1.0/account/credentials`.
#[derive(Deserialize, Debug, Clone)]
pub struct CredentialsResponse {
    pub endpoint: String,
    pub token: String,
    #[serde(default)]
    pub expires: Option<String>,
}

impl AccountClient {
    pub(crate) fn new(ts: Arc<dyn TokenSource>, endpoint: &str, http: reqwest::Client) -> Self {
        Self {
            ts,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub async fn account(&self) -> Result<Account, Error> {
        self.get("/1.0/account").await
    }

    pub async fn usage(&self) -> Result<Usage, Error> {
        self.get("/1.0/account/usage").await
    }

    pub async fn credentials(&self) -> Result<CredentialsResponse, Error> {
        self.get("/1.0/account/credentials").await
    }

    async fn get<T: for<'de> serde::Deserialize<'de>>(&self, path: &str) -> Result<T, Error> {
        let token = self.ts.token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.endpoint, path))
            .header(reqwest::header::AUTHORIZATION, token.value())
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(map_error(response).await)
        }
    }
}
