//! HTTP client for the PhonePe standard checkout (v2) API.
//!
//! Three outbound calls, each bounded by the configured request timeout and
//! never retried:
//! 1. `POST {identity}/v1/oauth/token` (client-credentials grant)
//! 2. `POST {pg}/checkout/v2/pay` (hosted checkout session)
//! 3. `GET {pg}/checkout/v2/order/{orderId}/status`

mod checkout;
mod status;
mod token;

pub use checkout::{CheckoutRequest, CheckoutSession, MerchantUrls, MetaInfo, PaymentFlow};
pub use status::OrderStatus;
pub use token::ProviderToken;

use crate::config::{ProviderConfig, ProviderEndpoints};
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Authorization scheme PhonePe expects for bearer tokens.
const AUTH_SCHEME: &str = "O-Bearer";

/// Which PhonePe infrastructure to call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// Resolve a decrypted account mode.
    ///
    /// Only a case-insensitive `"sandbox"` selects the sandbox; every other
    /// value, including typos, resolves to production.
    pub fn from_account_mode(mode: &str) -> Self {
        let mode = mode.trim();
        if mode.eq_ignore_ascii_case("sandbox") {
            return Environment::Sandbox;
        }

        if !mode.eq_ignore_ascii_case("production") {
            // The mode is decrypted credential data and stays out of logs
            tracing::warn!("Unrecognized account mode, falling back to production");
        }
        Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => f.write_str("sandbox"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Failed call to PhonePe.
///
/// Timeouts, connection errors and non-2xx responses all land here; `status`
/// is `None` when no HTTP response was received.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<Value>,
}

impl ProviderError {
    fn transport(operation: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{} timed out", operation)
        } else {
            format!("{} request failed: {}", operation, err.without_url())
        };
        Self {
            message,
            status: None,
            body: None,
        }
    }
}

/// Builds a `ProviderError` from a non-2xx response, keeping its body.
async fn read_failure(response: Response, operation: &str) -> ProviderError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    ProviderError {
        message: format!("{} failed with status {}", operation, status),
        status: Some(status.as_u16()),
        body: parse_body(text),
    }
}

/// Upstream bodies are kept as JSON when they parse, as a string otherwise.
fn parse_body(text: String) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// PhonePe API client.
///
/// Holds one pooled `reqwest::Client`; safe to share across requests.
#[derive(Debug, Clone)]
pub struct PhonePeClient {
    http: Client,
    sandbox: ProviderEndpoints,
    production: ProviderEndpoints,
}

impl PhonePeClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("paysession/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            sandbox: config.sandbox.clone(),
            production: config.production.clone(),
        })
    }

    /// Base URLs for an environment.
    pub fn endpoints(&self, environment: Environment) -> &ProviderEndpoints {
        match environment {
            Environment::Sandbox => &self.sandbox,
            Environment::Production => &self.production,
        }
    }
}

fn authorization(token: &ProviderToken) -> String {
    format!("{} {}", AUTH_SCHEME, token.access_token.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_mode_sandbox_is_case_insensitive() {
        for mode in ["sandbox", "Sandbox", "SANDBOX", " sandbox "] {
            assert_eq!(Environment::from_account_mode(mode), Environment::Sandbox);
        }
    }

    #[test]
    fn test_account_mode_everything_else_is_production() {
        // Permissive fallback: unknown modes are NOT rejected, they go to
        // production. Kept as-is pending a decision to fail closed.
        for mode in ["production", "PRODUCTION", "prod", "sandbx", "test", ""] {
            assert_eq!(Environment::from_account_mode(mode), Environment::Production);
        }
    }

    #[test]
    fn test_endpoints_per_environment() {
        let client = PhonePeClient::new(&ProviderConfig::default()).unwrap();
        assert_eq!(
            client.endpoints(Environment::Sandbox).pg_base,
            "https://api-preprod.phonepe.com/apis/pg-sandbox"
        );
        assert_eq!(
            client.endpoints(Environment::Production).pg_base,
            "https://api.phonepe.com/apis/pg"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(String::new()), None);
        assert_eq!(
            parse_body(r#"{"code":"BAD_REQUEST"}"#.to_string()),
            Some(serde_json::json!({"code": "BAD_REQUEST"}))
        );
        assert_eq!(
            parse_body("Bad Gateway".to_string()),
            Some(Value::String("Bad Gateway".to_string()))
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unrecognized_account_mode_not_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let environment = tracing::subscriber::with_default(subscriber, || {
            Environment::from_account_mode("live-mode-7731")
        });

        assert_eq!(environment, Environment::Production);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Unrecognized account mode"));
        assert!(!output.contains("live-mode-7731"));
    }

    #[tokio::test]
    async fn test_transport_timeout_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        // Accept connections and never answer
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let endpoints = ProviderEndpoints {
            identity_base: url.clone(),
            pg_base: url,
        };
        let client = PhonePeClient::new(&ProviderConfig {
            request_timeout_seconds: 1,
            sandbox: endpoints.clone(),
            production: endpoints,
        })
        .unwrap();
        let token: ProviderToken = serde_json::from_str(r#"{"access_token":"tok"}"#).unwrap();

        let err = client
            .order_status(Environment::Sandbox, &token, "ORD123")
            .await
            .unwrap_err();

        assert_eq!(err.message, "order status timed out");
        assert!(err.status.is_none());
        assert!(err.body.is_none());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Sandbox.to_string(), "sandbox");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
