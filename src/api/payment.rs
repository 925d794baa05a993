//! PhonePe boundary endpoints used by the storefront.
//!
//! - `POST /api/phonepe/initiate` → hosted checkout URL + session cookie
//! - `POST /api/phonepe/status` → normalized order status

use crate::credentials::EncryptedCredentials;
use crate::error::PaymentError;
use crate::payment::{InitiatePayment, PaymentService};
use crate::provider::OrderStatus;
use crate::session::PaymentSession;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Failure body: `{success: false, message, error}`
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: Value,
}

/// Application error types for payment endpoints
#[derive(Debug)]
pub enum AppError {
    /// Request body was not valid JSON for the endpoint
    BadRequest(String),
    Payment(PaymentError),
    ServerError(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::Payment(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                json!({ "kind": "invalid_request" }),
            ),
            AppError::Payment(err) => {
                let status = if err.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                let mut error = json!({ "kind": err.kind() });
                if let Some(upstream) = err.upstream() {
                    error["upstream"] = upstream.clone();
                }
                (status, err.to_string(), error)
            }
            AppError::ServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                json!({ "kind": "internal" }),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error,
        });

        (status, body).into_response()
    }
}

/// Shared application state for payment API
#[derive(Clone)]
pub struct PaymentAppState {
    pub service: Arc<PaymentService>,
    /// Adds `Secure` to the session cookie
    pub secure_cookie: bool,
}

/// Initiate request body
#[derive(Deserialize, Debug)]
pub struct InitiateRequest {
    amount: i64,
    #[serde(rename = "merchantTransactionId")]
    merchant_transaction_id: String,
    baseurl: String,
    payment_keys: EncryptedCredentials,
}

/// Initiate success response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    success: bool,
    redirect_url: String,
}

/// Status request body
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    #[serde(default)]
    order_id: Option<String>,
}

/// Status success response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    success: bool,
    status: OrderStatus,
    raw: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expires_at: Option<i64>,
}

/// Create payment API router
pub fn create_payment_router(state: PaymentAppState) -> Router {
    Router::new()
        .route("/api/phonepe/initiate", post(initiate_payment))
        .route("/api/phonepe/status", post(payment_status))
        .with_state(Arc::new(state))
}

/// POST /api/phonepe/initiate
///
/// Creates a PhonePe checkout session and sets the `phonepe_creds` cookie
/// (encrypted keys, 300 s) for the later status call.
async fn initiate_payment(
    State(state): State<Arc<PaymentAppState>>,
    payload: Result<Json<InitiateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Rejected initiate request body");
        AppError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    debug!(order_id = %request.merchant_transaction_id, "Payment initiation requested");

    let initiated = state
        .service
        .initiate(InitiatePayment {
            amount: request.amount,
            order_id: request.merchant_transaction_id,
            return_base_url: request.baseurl,
            credentials: request.payment_keys,
        })
        .await?;

    let cookie = session_cookie_header(&initiated.session, state.secure_cookie)?;

    let mut response = Json(InitiateResponse {
        success: true,
        redirect_url: initiated.redirect_url,
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);

    Ok(response)
}

/// `Set-Cookie` header value for a session; failures are logged with their cause.
fn session_cookie_header(
    session: &PaymentSession,
    secure: bool,
) -> Result<HeaderValue, AppError> {
    let cookie = session.to_set_cookie(secure).map_err(|e| {
        error!(error = %e, "Failed to serialize payment session cookie");
        AppError::ServerError("Failed to store payment session".to_string())
    })?;

    HeaderValue::from_str(&cookie).map_err(|e| {
        error!(error = %e, "Payment session cookie is not a valid header value");
        AppError::ServerError("Failed to store payment session".to_string())
    })
}

/// POST /api/phonepe/status
///
/// Reads the session cookie, fetches a fresh token and returns the
/// normalized order status. Missing `orderId` is a 400.
async fn payment_status(
    State(state): State<Arc<PaymentAppState>>,
    headers: HeaderMap,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    // An unreadable body carries no orderId either
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let session = PaymentSession::from_headers(&headers);

    let report = state
        .service
        .check_status(request.order_id.as_deref(), session)
        .await?;

    Ok(Json(StatusResponse {
        success: true,
        status: report.status,
        raw: report.raw,
        token_expires_at: report.token_expires_at,
    }))
}
