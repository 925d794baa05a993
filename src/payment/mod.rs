//! PhonePe payment initiation and status polling.
//!
//! Flow:
//! 1. Storefront posts encrypted merchant keys to initiate
//! 2. Keys are decrypted, exchanged for a token, and a checkout session is created
//! 3. The browser is redirected to PhonePe; the encrypted keys ride along in the session cookie
//! 4. PhonePe redirects back to `{base}/payment-status?order_id=..&By=phonepe`
//! 5. Storefront polls status; keys are decrypted again and a fresh token is fetched
//!
//! Nothing is retried. A second initiate could create a second provider
//! order, and status polling belongs to the caller's loop.

use serde_json::Value;
use tracing::{info, warn};

use crate::credentials::{Decryptor, EncryptedCredentials};
use crate::error::PaymentError;
use crate::provider::{
    CheckoutRequest, Environment, MerchantUrls, MetaInfo, OrderStatus, PaymentFlow, PhonePeClient,
    ProviderError,
};
use crate::session::PaymentSession;

/// Seconds PhonePe keeps an unpaid order open.
pub const CHECKOUT_EXPIRE_AFTER_SECONDS: u64 = 2400;

/// Path on the storefront PhonePe redirects back to.
const RETURN_PATH: &str = "/payment-status";

/// Input for starting a payment.
#[derive(Debug, Clone)]
pub struct InitiatePayment {
    /// Minor units (paise)
    pub amount: i64,
    pub order_id: String,
    /// Storefront origin used to build the return URL
    pub return_base_url: String,
    pub credentials: EncryptedCredentials,
}

/// Result of a successful initiate.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    /// Hosted checkout page to send the browser to
    pub redirect_url: String,
    /// Must be handed back to the client (cookie) for status polling
    pub session: PaymentSession,
}

/// Result of a status check.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: OrderStatus,
    /// Provider status document as received
    pub raw: Value,
    /// Expiry of the token used for this check, epoch seconds
    pub token_expires_at: Option<i64>,
}

/// Stateless payment operations; one instance serves all requests.
pub struct PaymentService {
    decryptor: Decryptor,
    provider: PhonePeClient,
}

impl PaymentService {
    pub fn new(decryptor: Decryptor, provider: PhonePeClient) -> Self {
        Self {
            decryptor,
            provider,
        }
    }

    /// Start a PhonePe payment and return the hosted checkout URL.
    ///
    /// # Errors
    /// - `IntegrityCheckFailed` / `DecryptionFailed` for bad credential envelopes
    /// - `PaymentInitiationFailed` if the token exchange or session creation fails
    pub async fn initiate(&self, request: InitiatePayment) -> Result<InitiatedPayment, PaymentError> {
        let credentials = self.decryptor.decrypt_credentials(&request.credentials)?;
        let environment = Environment::from_account_mode(&credentials.account_mode);

        let token = self
            .provider
            .fetch_token(environment, &credentials)
            .await
            .map_err(|e| initiation_failed(&request.order_id, e))?;

        let checkout = build_checkout_request(&request);
        let session = self
            .provider
            .create_checkout(environment, &token, &checkout)
            .await
            .map_err(|e| initiation_failed(&request.order_id, e))?;

        info!(
            order_id = %request.order_id,
            environment = %environment,
            amount = request.amount,
            "PhonePe checkout session created"
        );

        Ok(InitiatedPayment {
            redirect_url: session.redirect_url,
            session: PaymentSession::new(request.credentials),
        })
    }

    /// Query PhonePe for an order and normalize its state.
    ///
    /// # Errors
    /// - `MissingOrderId` if `order_id` is absent or blank
    /// - `MissingCredentials` if there is no payment session
    /// - `IntegrityCheckFailed` / `DecryptionFailed` for bad session envelopes
    /// - `OrderStatusQueryFailed` if the token exchange or status query fails
    pub async fn check_status(
        &self,
        order_id: Option<&str>,
        session: Option<PaymentSession>,
    ) -> Result<StatusReport, PaymentError> {
        let order_id = order_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(PaymentError::MissingOrderId)?;
        let session = session.ok_or(PaymentError::MissingCredentials)?;

        let credentials = self.decryptor.decrypt_credentials(&session.credentials)?;
        let environment = Environment::from_account_mode(&credentials.account_mode);

        let token = self
            .provider
            .fetch_token(environment, &credentials)
            .await
            .map_err(|e| status_query_failed(order_id, e))?;

        let raw = self
            .provider
            .order_status(environment, &token, order_id)
            .await
            .map_err(|e| status_query_failed(order_id, e))?;

        let status = OrderStatus::from_status_document(&raw);
        info!(
            order_id = %order_id,
            environment = %environment,
            status = status.as_str(),
            "PhonePe order status checked"
        );

        Ok(StatusReport {
            status,
            raw,
            token_expires_at: token.expires_at_timestamp(),
        })
    }
}

/// Build the pay request, including the storefront return URL.
fn build_checkout_request(request: &InitiatePayment) -> CheckoutRequest {
    CheckoutRequest {
        merchant_order_id: request.order_id.clone(),
        amount: request.amount,
        expire_after: CHECKOUT_EXPIRE_AFTER_SECONDS,
        meta_info: MetaInfo {
            udf1: request.order_id.clone(),
        },
        payment_flow: PaymentFlow {
            flow_type: "PG_CHECKOUT".to_string(),
            message: format!("Payment for order {}", request.order_id),
            merchant_urls: MerchantUrls {
                redirect_url: return_url(&request.return_base_url, &request.order_id),
            },
        },
    }
}

fn return_url(base_url: &str, order_id: &str) -> String {
    format!(
        "{}{}?order_id={}&By=phonepe",
        base_url.trim_end_matches('/'),
        RETURN_PATH,
        urlencoding::encode(order_id)
    )
}

fn initiation_failed(order_id: &str, err: ProviderError) -> PaymentError {
    warn!(order_id = %order_id, status = ?err.status, error = %err, "PhonePe payment initiation failed");
    PaymentError::PaymentInitiationFailed {
        message: err.message,
        upstream: err.body,
    }
}

fn status_query_failed(order_id: &str, err: ProviderError) -> PaymentError {
    warn!(order_id = %order_id, status = ?err.status, error = %err, "PhonePe order status query failed");
    PaymentError::OrderStatusQueryFailed {
        message: err.message,
        upstream: err.body,
    }
}
