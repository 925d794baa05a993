//! Hosted checkout session creation.

use serde::{Deserialize, Serialize};

use super::{
    authorization, parse_body, read_failure, Environment, PhonePeClient, ProviderError,
    ProviderToken,
};

/// Body of `POST /checkout/v2/pay`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub merchant_order_id: String,
    /// Minor units (paise)
    pub amount: i64,
    /// Seconds until PhonePe expires the order
    pub expire_after: u64,
    pub meta_info: MetaInfo,
    pub payment_flow: PaymentFlow,
}

/// Free-form metadata echoed back by PhonePe.
#[derive(Serialize, Debug, Clone)]
pub struct MetaInfo {
    pub udf1: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFlow {
    #[serde(rename = "type")]
    pub flow_type: String,
    pub message: String,
    pub merchant_urls: MerchantUrls,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MerchantUrls {
    /// Where PhonePe sends the browser after payment
    pub redirect_url: String,
}

/// Response of `POST /checkout/v2/pay`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub expire_at: Option<i64>,
    /// Hosted checkout page for the browser
    pub redirect_url: String,
}

impl PhonePeClient {
    /// Create a hosted checkout session.
    ///
    /// # Errors
    /// Transport failures, non-2xx responses and 2xx responses without a
    /// `redirectUrl` all return a `ProviderError` carrying the upstream body.
    pub async fn create_checkout(
        &self,
        environment: Environment,
        token: &ProviderToken,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let url = format!("{}/checkout/v2/pay", self.endpoints(environment).pg_base);

        tracing::debug!(
            environment = %environment,
            order_id = %request.merchant_order_id,
            "Creating PhonePe checkout session"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization(token))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::transport("checkout session", e))?;

        if !response.status().is_success() {
            return Err(read_failure(response, "checkout session").await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport("checkout session", e))?;

        serde_json::from_str::<CheckoutSession>(&text).map_err(|_| ProviderError {
            message: "checkout session response missing redirectUrl".to_string(),
            status: None,
            body: parse_body(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, ProviderEndpoints};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(url: &str) -> PhonePeClient {
        let endpoints = ProviderEndpoints {
            identity_base: url.to_string(),
            pg_base: url.to_string(),
        };
        PhonePeClient::new(&ProviderConfig {
            request_timeout_seconds: 5,
            sandbox: endpoints.clone(),
            production: endpoints,
        })
        .unwrap()
    }

    fn token() -> ProviderToken {
        serde_json::from_str(r#"{"access_token":"tok-123","token_type":"O-Bearer"}"#).unwrap()
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            merchant_order_id: "ORD123".to_string(),
            amount: 10000,
            expire_after: 2400,
            meta_info: MetaInfo {
                udf1: "ORD123".to_string(),
            },
            payment_flow: PaymentFlow {
                flow_type: "PG_CHECKOUT".to_string(),
                message: "Payment for order ORD123".to_string(),
                merchant_urls: MerchantUrls {
                    redirect_url: "https://shop.example/payment-status?order_id=ORD123&By=phonepe"
                        .to_string(),
                },
            },
        }
    }

    #[test]
    fn test_checkout_request_serialization() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["merchantOrderId"], "ORD123");
        assert_eq!(json["amount"], 10000);
        assert_eq!(json["expireAfter"], 2400);
        assert_eq!(json["metaInfo"]["udf1"], "ORD123");
        assert_eq!(json["paymentFlow"]["type"], "PG_CHECKOUT");
        assert_eq!(
            json["paymentFlow"]["merchantUrls"]["redirectUrl"],
            "https://shop.example/payment-status?order_id=ORD123&By=phonepe"
        );
    }

    #[tokio::test]
    async fn test_create_checkout() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/checkout/v2/pay")
            .match_header("authorization", "O-Bearer tok-123")
            .match_body(Matcher::PartialJson(json!({
                "merchantOrderId": "ORD123",
                "amount": 10000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"orderId":"OMO123","state":"PENDING","expireAt":1703756259307,
                    "redirectUrl":"https://mercury-uat.phonepe.com/transact/uat_v2?token=abc"}"#,
            )
            .create_async()
            .await;

        let session = client_for(&server.url())
            .create_checkout(Environment::Sandbox, &token(), &request())
            .await
            .unwrap();

        assert_eq!(
            session.redirect_url,
            "https://mercury-uat.phonepe.com/transact/uat_v2?token=abc"
        );
        assert_eq!(session.order_id, Some("OMO123".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_checkout_without_redirect_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/checkout/v2/pay")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"OMO123","state":"PENDING"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .create_checkout(Environment::Sandbox, &token(), &request())
            .await
            .unwrap_err();

        assert!(err.message.contains("redirectUrl"));
        assert_eq!(err.body.unwrap()["orderId"], "OMO123");
    }
}
