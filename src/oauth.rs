//! GitHub OAuth login: the authorize URL and the code-for-token exchange.
//!
//! The client secret never lives here. The code is handed to a small exchange
//! service (`exchange_url`) that answers with `{ "access_token": ... }`.

use std::time::Duration;

use async_trait::async_trait;
use leetcode_tracker_core::contract::{ApiError, IdentityExchange};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;

pub const AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_EXCHANGE_URL: &str = "http://localhost:4000/exchange-code";
pub const OAUTH_SCOPE: &str = "repo read:user";

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid authorize URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("exchange request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("exchange response has no access_token")]
    MissingToken,
}

/// Browser URL that starts the GitHub OAuth flow.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
    Ok(Url::parse_with_params(
        AUTHORIZE_ENDPOINT,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", OAUTH_SCOPE),
        ],
    )?)
}

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Pull the token out of the exchange service's reply.
fn token_from_response(body: &str) -> Result<String, OAuthError> {
    let parsed: ExchangeResponse =
        serde_json::from_str(body).map_err(|_| OAuthError::MissingToken)?;
    parsed
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or(OAuthError::MissingToken)
}

pub struct OAuthExchangeClient {
    http: Client,
    exchange_url: String,
}

impl OAuthExchangeClient {
    pub fn new(exchange_url: &str, timeout: Duration) -> Result<Self, OAuthError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            exchange_url: exchange_url.to_string(),
        })
    }

    async fn exchange(&self, code: &str) -> Result<String, OAuthError> {
        info!(exchange_url = %self.exchange_url, "Exchanging OAuth code for a token");
        let response = self
            .http
            .post(&self.exchange_url)
            .json(&ExchangeRequest { code })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(%status, body = %body, "Exchange service rejected the code");
            return Err(OAuthError::Status { status, body });
        }
        token_from_response(&body).map_err(|e| {
            error!("Exchange response carried no access_token");
            e
        })
    }
}

#[async_trait]
impl IdentityExchange for OAuthExchangeClient {
    async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        Ok(self.exchange(code).await?)
    }
}
