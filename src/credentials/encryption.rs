//! AES-256-CBC envelopes with an HMAC-SHA256 integrity check.
//!
//! An envelope is base64 of `{"iv": .., "value": .., "mac": ..}` where `iv`
//! and `value` are base64 and `mac` is hex of
//! HMAC-SHA256(key, iv_string || value_string). The MAC is computed over the
//! base64 text, not the decoded bytes.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::PaymentError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the CBC initialization vector in bytes
const IV_SIZE: usize = 16;

/// Marks an APP_KEY value as base64-encoded.
const KEY_PREFIX: &str = "base64:";

/// Decoded envelope payload.
#[derive(Serialize, Deserialize)]
struct EnvelopePayload {
    iv: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mac: Option<String>,
}

/// Decrypts (and, for provisioning, encrypts) credential envelopes with the
/// server-held APP_KEY.
pub struct Decryptor {
    key: Secret<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decryptor").field("key", &"[REDACTED]").finish()
    }
}

impl Decryptor {
    /// Builds a decryptor from an APP_KEY value.
    ///
    /// The optional `base64:` prefix is stripped, the rest must be base64
    /// that decodes to exactly 32 bytes.
    ///
    /// # Errors
    /// `InvalidKeyFormat` if the key is not base64 or not 32 bytes. The
    /// message never includes the key itself.
    pub fn from_app_key(raw: &str) -> Result<Self, PaymentError> {
        let encoded = raw.trim();
        let encoded = encoded.strip_prefix(KEY_PREFIX).unwrap_or(encoded);

        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| PaymentError::InvalidKeyFormat("key is not valid base64".to_string()))?;

        Self::from_bytes(&bytes)
    }

    /// Builds a decryptor from raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PaymentError> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            PaymentError::InvalidKeyFormat(format!(
                "key must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                bytes.len()
            ))
        })?;

        Ok(Self {
            key: Secret::new(key),
        })
    }

    /// Decrypts one envelope to its plaintext string.
    ///
    /// # Errors
    /// - `IntegrityCheckFailed` if a `mac` is present and does not match
    /// - `DecryptionFailed` for malformed envelopes, bad padding, a wrong key
    ///   or non-UTF-8 plaintext
    pub fn decrypt(&self, envelope: &str) -> Result<String, PaymentError> {
        let payload = decode_envelope(envelope)?;

        if let Some(mac) = &payload.mac {
            self.verify_mac(&payload.iv, &payload.value, mac)?;
        }

        let iv = BASE64
            .decode(&payload.iv)
            .map_err(|_| PaymentError::DecryptionFailed)?;
        if iv.len() != IV_SIZE {
            return Err(PaymentError::DecryptionFailed);
        }
        let ciphertext = BASE64
            .decode(&payload.value)
            .map_err(|_| PaymentError::DecryptionFailed)?;

        let plaintext = Aes256CbcDec::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|_| PaymentError::DecryptionFailed)?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| PaymentError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| PaymentError::DecryptionFailed)
    }

    /// Decrypts every string leaf of a JSON tree.
    ///
    /// Leaves that fail to decrypt are kept as-is, so trees mixing plaintext
    /// and ciphertext come back with only the ciphertext replaced.
    pub fn decrypt_tree(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => match self.decrypt(s) {
                Ok(plaintext) => Value::String(plaintext),
                Err(_) => value.clone(),
            },
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.decrypt_tree(item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.decrypt_tree(v)))
                    .collect::<Map<String, Value>>(),
            ),
            other => other.clone(),
        }
    }

    /// Decrypts an envelope whose plaintext may itself be a JSON object.
    ///
    /// Plaintext starting with `{` that parses as JSON is returned parsed;
    /// anything else comes back as a JSON string.
    pub fn decrypt_json(&self, envelope: &str) -> Result<Value, PaymentError> {
        let plaintext = self.decrypt(envelope)?;

        if plaintext.trim_start().starts_with('{') {
            if let Ok(parsed) = serde_json::from_str::<Value>(&plaintext) {
                return Ok(parsed);
            }
        }

        Ok(Value::String(plaintext))
    }

    /// Encrypts plaintext into an envelope that `decrypt` accepts.
    ///
    /// Uses a fresh random IV per call and always attaches a MAC.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, PaymentError> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|_| PaymentError::InvalidKeyFormat("cipher rejected key".to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let iv = BASE64.encode(iv);
        let value = BASE64.encode(ciphertext);
        let mac = hex::encode(self.compute_mac(&iv, &value)?);

        let payload = EnvelopePayload {
            iv,
            value,
            mac: Some(mac),
        };
        let json = serde_json::to_vec(&payload).map_err(|_| PaymentError::DecryptionFailed)?;

        Ok(BASE64.encode(json))
    }

    fn compute_mac(&self, iv: &str, value: &str) -> Result<Vec<u8>, PaymentError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.expose_secret())
            .map_err(|_| PaymentError::IntegrityCheckFailed)?;
        mac.update(iv.as_bytes());
        mac.update(value.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify_mac(&self, iv: &str, value: &str, mac_hex: &str) -> Result<(), PaymentError> {
        let given = hex::decode(mac_hex).map_err(|_| PaymentError::IntegrityCheckFailed)?;
        let expected = self.compute_mac(iv, value)?;

        if bool::from(expected.as_slice().ct_eq(given.as_slice())) {
            Ok(())
        } else {
            Err(PaymentError::IntegrityCheckFailed)
        }
    }
}

fn decode_envelope(envelope: &str) -> Result<EnvelopePayload, PaymentError> {
    let json = BASE64
        .decode(envelope.trim())
        .map_err(|_| PaymentError::DecryptionFailed)?;
    serde_json::from_slice(&json).map_err(|_| PaymentError::DecryptionFailed)
}
