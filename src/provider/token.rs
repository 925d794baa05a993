//! OAuth client-credentials exchange against the PhonePe identity service.

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{read_failure, Environment, PhonePeClient, ProviderError};
use crate::credentials::MerchantCredentials;

/// Bearer token issued by the identity endpoint.
///
/// Never persisted; a fresh one is fetched for every initiate and status call.
#[derive(Deserialize, Debug)]
pub struct ProviderToken {
    pub access_token: SecretString,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry as epoch seconds, when the provider sends one
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl ProviderToken {
    /// Expiry as epoch seconds.
    ///
    /// Prefers the provider's absolute `expires_at` and falls back to
    /// now + `expires_in`. An `expires_in` too large to represent yields `None`.
    pub fn expires_at_timestamp(&self) -> Option<i64> {
        self.expires_at.or_else(|| {
            let lifetime = Duration::try_seconds(self.expires_in?)?;
            Utc::now()
                .checked_add_signed(lifetime)
                .map(|expiry| expiry.timestamp())
        })
    }
}

impl PhonePeClient {
    /// Exchange merchant credentials for an access token.
    ///
    /// # Errors
    /// Transport errors, timeouts and non-2xx responses all come back as a
    /// `ProviderError` with the upstream body attached.
    pub async fn fetch_token(
        &self,
        environment: Environment,
        credentials: &MerchantCredentials,
    ) -> Result<ProviderToken, ProviderError> {
        let url = format!("{}/v1/oauth/token", self.endpoints(environment).identity_base);

        let form = [
            ("client_id", credentials.merchant_id.as_str()),
            ("client_version", credentials.salt_index.as_str()),
            ("client_secret", credentials.api_key.expose_secret().as_str()),
            ("grant_type", "client_credentials"),
        ];

        tracing::debug!(environment = %environment, "Requesting PhonePe access token");

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::transport("token exchange", e))?;

        if !response.status().is_success() {
            return Err(read_failure(response, "token exchange").await);
        }

        let token: ProviderToken = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("token exchange", e))?;

        tracing::debug!(
            environment = %environment,
            expires_in = ?token.expires_in,
            "Token exchange successful"
        );

        Ok(token)
    }
}
