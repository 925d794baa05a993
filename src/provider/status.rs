//! Order status lookup and state normalization.

use serde::Serialize;
use serde_json::Value;

use super::{
    authorization, read_failure, Environment, PhonePeClient, ProviderError, ProviderToken,
};

/// Normalized order outcome exposed to the storefront.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Success,
    Failure,
    Pending,
}

impl OrderStatus {
    /// Map a raw PhonePe state.
    ///
    /// `completed` and `failed` are terminal (case-insensitive). Every other
    /// value, including `pending`, empty strings and states PhonePe may add
    /// later, is `Pending`.
    pub fn from_provider_state(state: &str) -> Self {
        let state = state.trim();
        if state.eq_ignore_ascii_case("completed") {
            OrderStatus::Success
        } else if state.eq_ignore_ascii_case("failed") {
            OrderStatus::Failure
        } else {
            OrderStatus::Pending
        }
    }

    /// Normalize a full status document.
    ///
    /// Reads `state`, falling back to `data.state`; a missing state is pending.
    pub fn from_status_document(raw: &Value) -> Self {
        let state = raw
            .get("state")
            .or_else(|| raw.pointer("/data/state"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        Self::from_provider_state(state)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Success => "success",
            OrderStatus::Failure => "failure",
            OrderStatus::Pending => "pending",
        }
    }
}

impl PhonePeClient {
    /// Fetch the raw order status document for a merchant order id.
    pub async fn order_status(
        &self,
        environment: Environment,
        token: &ProviderToken,
        order_id: &str,
    ) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/checkout/v2/order/{}/status",
            self.endpoints(environment).pg_base,
            urlencoding::encode(order_id)
        );

        tracing::debug!(
            environment = %environment,
            order_id = %order_id,
            "Querying PhonePe order status"
        );

        let response = self
            .http
            .get(&url)
            .header("Authorization", authorization(token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::transport("order status", e))?;

        if !response.status().is_success() {
            return Err(read_failure(response, "order status").await);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::transport("order status", e))
    }
}
