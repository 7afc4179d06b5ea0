//! Password credential hashing built around PBKDF2-HMAC-SHA512.
//! A stored credential is a single ASCII string: a 64-character hex salt
//! followed by the 128-character hex derived key. Verification always
//! re-derives with the stored salt and compares in constant time.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroize;

/// Derivation parameters shared by hashing and verification. Changing any of
/// these invalidates every stored credential, so treat them as frozen.
const SALT_LEN: usize = 32;
const SALT_HEX_LEN: usize = SALT_LEN * 2;
const DERIVED_KEY_LEN: usize = 64;
const DERIVED_KEY_HEX_LEN: usize = DERIVED_KEY_LEN * 2;
const CREDENTIAL_LEN: usize = SALT_HEX_LEN + DERIVED_KEY_HEX_LEN;
const PBKDF2_ROUNDS: u32 = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("stored credential has length {0}; expected {CREDENTIAL_LEN} ASCII hex characters")]
    WrongLength(usize),
    #[error("stored credential is not hex encoded")]
    NotHex,
}

/// Stored representation of a password: `salt_hex || derived_key_hex`.
/// Never reversible to the plaintext it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Byte view for persisting the credential in a binary column.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

impl TryFrom<&[u8]> for Credential {
    type Error = CredentialError;

    /// Re-validates the two-part layout when loading a credential back from
    /// storage. A value that fails here can never verify any password.
    fn try_from(stored: &[u8]) -> Result<Self, Self::Error> {
        split_stored(stored)?;
        let text = std::str::from_utf8(stored).map_err(|_| CredentialError::NotHex)?;
        Ok(Credential(text.to_owned()))
    }
}

/// Hashes a plaintext password into a storable credential. Each call draws a
/// fresh random salt, so two credentials for the same password never match.
/// An empty plaintext is accepted here; strength rules live in `policy`.
pub fn hash_password(plaintext: &str) -> Credential {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);

    let mut derived = derive_key(plaintext, salt_hex.as_bytes());
    let mut credential = String::with_capacity(CREDENTIAL_LEN);
    credential.push_str(&salt_hex);
    credential.push_str(&hex::encode(derived));
    derived.zeroize();

    Credential(credential)
}

/// Verifies a plaintext candidate against a stored credential.
///
/// Returns `Ok(true)` only when the candidate, derived with the stored salt
/// and the frozen parameters, reproduces the stored key. A credential that
/// violates the layout is an error, not a mismatch, so callers can tell
/// "wrong password" apart from corrupted account data.
pub fn verify_password(plaintext: &str, stored: &[u8]) -> Result<bool, CredentialError> {
    let (salt_hex, stored_key) = match split_stored(stored) {
        Ok(parts) => parts,
        Err(err) => {
            log::warn!("rejecting malformed stored credential: {err}");
            return Err(err);
        }
    };

    let mut candidate = derive_key(plaintext, salt_hex.as_bytes());
    let matches: bool = candidate.ct_eq(&stored_key).into();
    candidate.zeroize();
    Ok(matches)
}

/// The derivation loop itself. The hex-encoded salt characters are fed to
/// PBKDF2 as bytes, matching the stored-credential layout where the salt is
/// only ever handled in its hex form.
fn derive_key(plaintext: &str, salt_hex: &[u8]) -> [u8; DERIVED_KEY_LEN] {
    let mut output = [0u8; DERIVED_KEY_LEN];
    pbkdf2_hmac::<Sha512>(plaintext.as_bytes(), salt_hex, PBKDF2_ROUNDS, &mut output);
    output
}

fn split_stored(stored: &[u8]) -> Result<(&str, [u8; DERIVED_KEY_LEN]), CredentialError> {
    if stored.len() != CREDENTIAL_LEN {
        return Err(CredentialError::WrongLength(stored.len()));
    }
    let text = std::str::from_utf8(stored).map_err(|_| CredentialError::NotHex)?;
    let (salt_hex, key_hex) = text.split_at(SALT_HEX_LEN);
    if !salt_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CredentialError::NotHex);
    }

    let decoded = hex::decode(key_hex).map_err(|_| CredentialError::NotHex)?;
    let mut stored_key = [0u8; DERIVED_KEY_LEN];
    stored_key.copy_from_slice(&decoded);
    Ok((salt_hex, stored_key))
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password, Credential, CredentialError, CREDENTIAL_LEN};

    #[test]
    fn hashes_and_verifies_passwords() {
        let credential = hash_password("storefront-test-password");
        assert!(verify_password("storefront-test-password", credential.as_bytes()).unwrap());
        assert!(!verify_password("wrong-password", credential.as_bytes()).unwrap());
    }

    #[test]
    fn fresh_salt_per_credential() {
        let first = hash_password("same-password");
        let second = hash_password("same-password");
        assert_ne!(first, second);
        // Both still verify because each embeds its own salt.
        assert!(verify_password("same-password", first.as_bytes()).unwrap());
        assert!(verify_password("same-password", second.as_bytes()).unwrap());
    }

    #[test]
    fn credential_layout_is_fixed_hex() {
        let credential = hash_password("layout");
        assert_eq!(credential.as_str().len(), CREDENTIAL_LEN);
        assert!(credential.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_password_is_hashable() {
        let credential = hash_password("");
        assert!(verify_password("", credential.as_bytes()).unwrap());
        assert!(!verify_password("not-empty", credential.as_bytes()).unwrap());
    }

    #[test]
    fn rejects_short_credential() {
        let err = verify_password("anything", b"too-short").unwrap_err();
        assert_eq!(err, CredentialError::WrongLength(9));
    }

    #[test]
    fn rejects_non_hex_credential() {
        let bogus = vec![b'z'; CREDENTIAL_LEN];
        let err = verify_password("anything", &bogus).unwrap_err();
        assert_eq!(err, CredentialError::NotHex);
    }

    #[test]
    fn rejects_non_utf8_credential() {
        let mut bogus = hash_password("seed").into_bytes();
        bogus[0] = 0xFF;
        let err = verify_password("seed", &bogus).unwrap_err();
        assert_eq!(err, CredentialError::NotHex);
    }

    #[test]
    fn round_trips_through_storage_bytes() {
        let credential = hash_password("persisted");
        let bytes = credential.clone().into_bytes();
        let restored = Credential::try_from(bytes.as_slice()).unwrap();
        assert_eq!(restored, credential);
        assert!(verify_password("persisted", restored.as_bytes()).unwrap());
    }

    #[test]
    fn storage_parse_rejects_garbage() {
        assert!(Credential::try_from(&b"nope"[..]).is_err());
    }
}
