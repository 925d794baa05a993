//! Payment session carried between initiate and status requests.
//!
//! Initiate hands back a `PaymentSession`; the API writes it as the
//! `phonepe_creds` cookie and the status endpoint reads it back. The cookie
//! holds only the still-encrypted credentials and expires with the provider
//! token, which is the only cleanup there is.

use axum::http::{header, HeaderMap};

use crate::credentials::EncryptedCredentials;

/// Cookie name shared with the storefront.
pub const SESSION_COOKIE: &str = "phonepe_creds";

/// Cookie lifetime in seconds, matching the provider token window.
pub const SESSION_MAX_AGE_SECONDS: u64 = 300;

/// Encrypted merchant credentials bound to one browser's checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentSession {
    pub credentials: EncryptedCredentials,
}

impl PaymentSession {
    pub fn new(credentials: EncryptedCredentials) -> Self {
        Self { credentials }
    }

    /// Build the `Set-Cookie` header value.
    ///
    /// The value is percent-encoded JSON so it survives cookie syntax.
    /// `secure` is only turned off for local plain-HTTP development.
    pub fn to_set_cookie(&self, secure: bool) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(&self.credentials)?;
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            urlencoding::encode(&json),
            SESSION_MAX_AGE_SECONDS
        );
        if secure {
            cookie.push_str("; Secure");
        }
        Ok(cookie)
    }

    /// Read the session from request `Cookie` headers.
    ///
    /// Returns `None` when the cookie is absent or does not decode; callers
    /// treat both as missing credentials.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| parse_cookie_value(value))
    }
}

fn parse_cookie_value(value: &str) -> Option<PaymentSession> {
    let json = urlencoding::decode(value.trim_matches('"')).ok()?;
    let credentials = serde_json::from_str::<EncryptedCredentials>(&json).ok()?;
    Some(PaymentSession::new(credentials))
}
