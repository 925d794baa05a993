// HTTP boundary for the storefront

pub mod payment;

pub use payment::{create_payment_router, AppError, PaymentAppState};

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

/// GET /health for load balancer probes
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Full application router.
pub fn create_app(state: PaymentAppState) -> Router {
    create_payment_router(state).merge(create_health_router())
}
