//! PKCS#11 token seam: key lookup by label and GCM cipher construction.
//!
//! The adapter only ever talks to a token through [`KeyStore`] and
//! [`GcmCipher`]. [`pkcs11::Pkcs11Context`] is the `cryptoki`-backed
//! implementation; unit tests substitute mocks or a software token.

pub mod pkcs11;

pub use pkcs11::{Pkcs11Context, SecretKeyObject, TokenConfig};

use thiserror::Error;

/// Errors raised by the token layer.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("PKCS#11 error: {0}")]
    Pkcs11(#[from] cryptoki::error::Error),

    #[error("no token with label {0:?}")]
    TokenNotFound(String),

    #[error("key {label} is not usable for GCM: {reason}")]
    UnsupportedKey { label: String, reason: String },

    #[error("token does not offer CKM_AES_GCM")]
    MechanismUnavailable,

    #[error("session lock poisoned")]
    SessionPoisoned,

    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonce { expected: usize, actual: usize },

    #[error("token operation failed: {0}")]
    Failed(String),
}

/// A PKCS#11 context that can locate secret keys and bind GCM ciphers to them.
///
/// `Key` is an opaque handle owned by the token. It is handed back to
/// [`KeyStore::new_gcm`] by value and never inspected by callers.
#[cfg_attr(test, mockall::automock(type Key = u64;))]
pub trait KeyStore {
    type Key;

    /// Find a secret key by label. `Ok(None)` means no key has that label.
    fn find_key(&self, label: &str) -> Result<Option<Self::Key>, TokenError>;

    /// Build a GCM cipher bound to `key`.
    fn new_gcm(&self, key: Self::Key) -> Result<Box<dyn GcmCipher>, TokenError>;
}

/// A token-resident AES-GCM cipher bound to one key.
///
/// `seal` returns `ciphertext || tag`; `open` expects the same layout.
#[cfg_attr(test, mockall::automock)]
pub trait GcmCipher: Send + Sync {
    /// Nonce length in bytes this cipher requires.
    fn nonce_size(&self) -> usize;

    fn seal(&self, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError>;

    fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_not_found_display() {
        let err = TokenError::TokenNotFound("tinktest".into());
        assert_eq!(err.to_string(), "no token with label \"tinktest\"");
    }

    #[test]
    fn unsupported_key_display() {
        let err = TokenError::UnsupportedKey {
            label: "k1".into(),
            reason: "key type is not AES".into(),
        };
        assert_eq!(
            err.to_string(),
            "key k1 is not usable for GCM: key type is not AES"
        );
    }

    #[test]
    fn invalid_nonce_display() {
        let err = TokenError::InvalidNonce {
            expected: 12,
            actual: 8,
        };
        assert_eq!(err.to_string(), "invalid nonce length: expected 12, got 8");
    }
}
