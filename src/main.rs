use anyhow::{Context, Result};
use paysession::api::{create_app, PaymentAppState};
use paysession::config::{apply_env_overrides, load_config, PaySessionConfig};
use paysession::credentials::Decryptor;
use paysession::payment::PaymentService;
use paysession::provider::PhonePeClient;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paysession=info,tower_http=info".into()),
        )
        .init();

    info!("paysession starting...");

    // Optional TOML config, then env overrides
    let mut config = match std::env::var("PAYSESSION_CONFIG") {
        Ok(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => PaySessionConfig::default(),
    };
    apply_env_overrides(&mut config);

    // APP_KEY is fatal at start-up, never per request
    let app_key = std::env::var("APP_KEY")
        .context("APP_KEY is required (base64-encoded 32-byte key, optional 'base64:' prefix)")?;
    let decryptor = Decryptor::from_app_key(&app_key).context("APP_KEY is invalid")?;

    let provider = PhonePeClient::new(&config.provider)?;

    info!(
        bind_addr = %config.server.bind_addr,
        request_timeout_seconds = config.provider.request_timeout_seconds,
        secure_cookie = config.session.secure_cookie,
        "Configuration loaded"
    );

    let state = PaymentAppState {
        service: Arc::new(PaymentService::new(decryptor, provider)),
        secure_cookie: config.session.secure_cookie,
    };
    let router = create_app(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(bind_addr = %config.server.bind_addr, "Payment API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Payment API server error")?;

    info!("paysession stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
    }
    info!("Shutdown signal received");
}
