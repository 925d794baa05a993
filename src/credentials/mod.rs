//! Merchant credentials for the PhonePe gateway.
//!
//! Credentials arrive from the storefront as four independently encrypted
//! envelopes and stay encrypted everywhere except inside a single request:
//!
//! ```text
//! ┌────────────────────────────┐   decrypt    ┌───────────────────────┐
//! │  EncryptedCredentials      │ ───────────▶ │  MerchantCredentials  │
//! │  (request body / cookie)   │              │  (in-process only)    │
//! └────────────────────────────┘              └───────────────────────┘
//! ```
//!
//! # Security
//!
//! - Envelopes are AES-256-CBC with an HMAC-SHA256 over iv and value
//! - MAC verification happens before any decryption attempt
//! - The APP_KEY must be 32 bytes and lives in memory only
//! - Plaintext is never cached or persisted; the API key is a `SecretString`

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

mod encryption;

pub use encryption::{Decryptor, KEY_SIZE};

/// Merchant credentials as four encrypted envelopes.
///
/// This is the shape of both the `payment_keys` request field and the
/// session cookie value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredentials {
    pub merchant_id: String,
    pub salt_index: String,
    pub api_key: String,
    pub account_mode: String,
}

/// Decrypted merchant credentials.
///
/// Used for the OAuth client-credentials grant: `merchant_id` is the client
/// id, `salt_index` the client version and `api_key` the client secret.
#[derive(Debug)]
pub struct MerchantCredentials {
    pub merchant_id: String,
    pub salt_index: String,
    pub api_key: SecretString,
    pub account_mode: String,
}

impl Decryptor {
    /// Decrypts all four credential fields.
    pub fn decrypt_credentials(
        &self,
        encrypted: &EncryptedCredentials,
    ) -> Result<MerchantCredentials, PaymentError> {
        Ok(MerchantCredentials {
            merchant_id: self.decrypt(&encrypted.merchant_id)?,
            salt_index: self.decrypt(&encrypted.salt_index)?,
            api_key: SecretString::new(self.decrypt(&encrypted.api_key)?),
            account_mode: self.decrypt(&encrypted.account_mode)?,
        })
    }

    /// Encrypts plaintext merchant credentials field by field.
    pub fn encrypt_credentials(
        &self,
        merchant_id: &str,
        salt_index: &str,
        api_key: &str,
        account_mode: &str,
    ) -> Result<EncryptedCredentials, PaymentError> {
        Ok(EncryptedCredentials {
            merchant_id: self.encrypt(merchant_id)?,
            salt_index: self.encrypt(salt_index)?,
            api_key: self.encrypt(api_key)?,
            account_mode: self.encrypt(account_mode)?,
        })
    }
}
