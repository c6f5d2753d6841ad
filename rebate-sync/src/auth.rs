//! OAuth2 client-credentials token exchange.
//!
//! Both the mail relay and the redemption registry hand out bearer tokens this
//! way. A fresh token is requested for every outbound call.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Credentials for one token endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    client: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(client: Client, auth_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            auth_url,
            client_id,
            client_secret,
        }
    }

    /// Request a bearer token using HTTP basic auth and a form-encoded grant.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        debug!(auth_url = %self.auth_url, "oauth_token_requesting");

        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!(auth_url = %self.auth_url, error = %e, "oauth_token_rejected");
                e
            })?;

        let body: TokenResponse = response.json().await?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)
    }
}
