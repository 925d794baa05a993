// Error taxonomy
pub mod error;

// Configuration (TOML file + env overrides)
pub mod config;

// Encrypted merchant credentials
pub mod credentials;

// PhonePe HTTP client
pub mod provider;

// Session cookie bridging initiate and status
pub mod session;

// Payment initiation and status polling
pub mod payment;

// HTTP API
pub mod api;
