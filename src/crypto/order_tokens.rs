//! Reversible order-id tokens built on ChaCha20-Poly1305.
//! A token is a URL-safe base64 envelope of `version || issued_at || nonce ||
//! ciphertext+tag`, where the plaintext is the order id's decimal string. The
//! version byte and timestamp are bound as associated data, so a tampered
//! header fails authentication along with the body.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

const TOKEN_VERSION: u8 = 1;
const HEADER_LEN: usize = 1 + 8;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum OrderTokenError {
    #[error("invalid key length; expected {KEY_LEN} bytes")]
    InvalidKeyLength,
    #[error("key source unreadable: {0}")]
    KeySourceUnreadable(String),
    #[error("key is not valid base64: {0}")]
    KeyDecodeFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("invalid or tampered order token")]
    InvalidToken,
    #[error("order token expired; issued at {issued_at}, validity window {window_secs}s")]
    Expired { issued_at: u64, window_secs: u64 },
    #[error("system clock is before the unix epoch")]
    ClockSkew,
}

/// Encrypts order identifiers into opaque URL path segments and resolves
/// them back. Bound to one symmetric key for the process lifetime; safe to
/// share by reference across request handlers.
pub struct OrderTokenCodec {
    key: Key,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for OrderTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes must never reach debug output or logs.
        f.debug_struct("OrderTokenCodec")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl OrderTokenCodec {
    /// Builds a codec from raw key bytes. The key must be 32 bytes for
    /// ChaCha20-Poly1305; anything else is a startup error, never a
    /// per-request one.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, OrderTokenError> {
        if key_bytes.len() != KEY_LEN {
            return Err(OrderTokenError::InvalidKeyLength);
        }
        let mut key = Key::default();
        key.copy_from_slice(key_bytes);
        Ok(Self { key, ttl: None })
    }

    /// Reads a base64-encoded key from an environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, OrderTokenError> {
        let encoded = std::env::var(var)
            .map_err(|e| OrderTokenError::KeySourceUnreadable(format!("{var}: {e}")))?;
        let mut decoded = STANDARD_NO_PAD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| OrderTokenError::KeyDecodeFailed(format!("{e}")))?;
        let codec = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        codec
    }

    /// Reads a base64-encoded key from disk.
    pub fn from_key_file(path: &Path) -> Result<Self, OrderTokenError> {
        let content = fs::read_to_string(path)
            .map_err(|e| OrderTokenError::KeySourceUnreadable(format!("{e}")))?;
        let mut decoded = STANDARD_NO_PAD
            .decode(content.trim().as_bytes())
            .map_err(|e| OrderTokenError::KeyDecodeFailed(format!("{e}")))?;
        let codec = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        codec
    }

    /// Opts into a validity window. Tokens older than `ttl` at decode time
    /// are rejected as expired. Without this, tokens never expire.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Encrypts an order id into a URL-safe token. Each call draws a fresh
    /// nonce, so repeated encodes of one id produce distinct tokens that all
    /// decode to the same value.
    pub fn encode(&self, order_id: u64) -> Result<String, OrderTokenError> {
        self.encode_at(order_id, unix_now()?)
    }

    fn encode_at(&self, order_id: u64, issued_at: u64) -> Result<String, OrderTokenError> {
        let mut header = [0u8; HEADER_LEN];
        header[0] = TOKEN_VERSION;
        header[1..].copy_from_slice(&issued_at.to_be_bytes());

        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let plaintext = order_id.to_string();
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &header,
                },
            )
            .map_err(|e| OrderTokenError::EncryptionFailed(format!("{e}")))?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&header);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(envelope))
    }

    /// Resolves a token back to the order id it was minted for.
    ///
    /// Any malformed, truncated, or tampered token is `InvalidToken`; the
    /// error deliberately carries no detail a caller could echo back. A
    /// token outside the configured validity window is `Expired` so the
    /// handler can distinguish staleness from tampering.
    pub fn decode(&self, token: &str) -> Result<u64, OrderTokenError> {
        let envelope = URL_SAFE_NO_PAD.decode(token.as_bytes()).map_err(|_| {
            log::debug!("order token rejected: not base64");
            OrderTokenError::InvalidToken
        })?;
        if envelope.len() < HEADER_LEN + NONCE_LEN + TAG_LEN + 1 {
            log::debug!("order token rejected: envelope too short");
            return Err(OrderTokenError::InvalidToken);
        }

        let (header, rest) = envelope.split_at(HEADER_LEN);
        if header[0] != TOKEN_VERSION {
            log::debug!("order token rejected: unknown version {}", header[0]);
            return Err(OrderTokenError::InvalidToken);
        }
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(&self.key);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| {
                log::debug!("order token rejected: authentication failed");
                OrderTokenError::InvalidToken
            })?;

        // Only a timestamp that survived authentication may classify a token
        // as expired; a forged header must read as tampering, not staleness.
        let mut issued_at_bytes = [0u8; 8];
        issued_at_bytes.copy_from_slice(&header[1..]);
        let issued_at = u64::from_be_bytes(issued_at_bytes);
        if let Some(ttl) = self.ttl {
            let now = unix_now()?;
            if now > issued_at.saturating_add(ttl.as_secs()) {
                return Err(OrderTokenError::Expired {
                    issued_at,
                    window_secs: ttl.as_secs(),
                });
            }
        }

        let decimal = String::from_utf8(plaintext).map_err(|_| OrderTokenError::InvalidToken)?;
        decimal.parse::<u64>().map_err(|_| OrderTokenError::InvalidToken)
    }
}

impl Drop for OrderTokenCodec {
    fn drop(&mut self) {
        // Zero the key material on drop to reduce its lifetime in memory.
        self.key.as_mut_slice().zeroize();
    }
}

/// Generates a fresh random codec key, for provisioning via the CLI.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

fn unix_now() -> Result<u64, OrderTokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| OrderTokenError::ClockSkew)
}
