pub mod runtime;
pub use runtime::apply_env_overrides;

use serde::Deserialize;

/// Complete paysession configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaySessionConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// PhonePe endpoints and outbound call limits
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Upper bound for each outbound call (token exchange, pay, status)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "ProviderEndpoints::sandbox")]
    pub sandbox: ProviderEndpoints,
    #[serde(default = "ProviderEndpoints::production")]
    pub production: ProviderEndpoints,
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            sandbox: ProviderEndpoints::sandbox(),
            production: ProviderEndpoints::production(),
        }
    }
}

/// Base URLs for one PhonePe environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderEndpoints {
    /// Base for `/v1/oauth/token`
    pub identity_base: String,
    /// Base for `/checkout/v2/...`
    pub pg_base: String,
}

impl ProviderEndpoints {
    pub fn sandbox() -> Self {
        Self {
            identity_base: "https://api-preprod.phonepe.com/apis/pg-sandbox".to_string(),
            pg_base: "https://api-preprod.phonepe.com/apis/pg-sandbox".to_string(),
        }
    }

    pub fn production() -> Self {
        Self {
            identity_base: "https://api.phonepe.com/apis/identity-manager".to_string(),
            pg_base: "https://api.phonepe.com/apis/pg".to_string(),
        }
    }
}

/// Payment session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Only disable for local plain-HTTP development
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
}

fn default_secure_cookie() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookie: default_secure_cookie(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<PaySessionConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: PaySessionConfig = toml::from_str(&contents)?;
    Ok(config)
}
