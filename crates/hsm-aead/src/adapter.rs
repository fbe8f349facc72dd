//! [`HsmAead`]: the generic [`Aead`] capability over a token-resident GCM key.
//!
//! # Ciphertext format
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! A fresh random nonce is drawn for every encryption. GCM loses both
//! confidentiality and authenticity if a nonce ever repeats under one key.

use std::fmt;

use common::{envelope, Aead, AeadError};
use tracing::debug;

use crate::nonce::{NonceSource, OsNonceSource};
use crate::token::{GcmCipher, KeyStore, TokenError};

/// AEAD adapter binding one HSM key, found by label, to AES-GCM.
///
/// Immutable once built and safe to share between threads; concurrent calls
/// are serialised, if at all, by the token. [`HsmAead::default`] yields an
/// adapter with no bound cipher whose every operation returns
/// [`AeadError::NotInitialized`].
pub struct HsmAead {
    cipher: Option<Box<dyn GcmCipher>>,
    nonces: Box<dyn NonceSource>,
    key_label: String,
}

impl HsmAead {
    /// Look up `key_label` in `store` and bind a GCM cipher to it.
    ///
    /// # Errors
    ///
    /// - [`AeadError::InvalidArgument`] if `store` is `None` or the label is blank.
    /// - [`AeadError::NotFound`] if no key has that label.
    /// - [`AeadError::Token`] if the lookup itself fails on the device.
    /// - [`AeadError::Construction`] if the token cannot build a GCM cipher for the key.
    pub fn new<S: KeyStore>(store: Option<&S>, key_label: &str) -> Result<Self, AeadError> {
        let store = store.ok_or_else(|| AeadError::InvalidArgument("nil context".into()))?;
        if key_label.trim().is_empty() {
            return Err(AeadError::InvalidArgument("key label must not be empty".into()));
        }

        let key = store
            .find_key(key_label)
            .map_err(|e| AeadError::Token(Box::new(e)))?
            .ok_or_else(|| AeadError::NotFound {
                label: key_label.to_string(),
            })?;

        let cipher = store
            .new_gcm(key)
            .map_err(|e| AeadError::Construction {
                label: key_label.to_string(),
                source: Box::new(e),
            })?;

        debug!(
            key_label,
            nonce_size = cipher.nonce_size(),
            "HSM AEAD initialised"
        );

        Ok(Self {
            cipher: Some(cipher),
            nonces: Box::new(OsNonceSource),
            key_label: key_label.to_string(),
        })
    }

    /// Replace the nonce source. Intended for tests and for platforms with a
    /// dedicated entropy device.
    pub fn with_nonce_source(mut self, nonces: impl NonceSource + 'static) -> Self {
        self.nonces = Box::new(nonces);
        self
    }

    /// Whether a cipher is bound.
    pub fn is_initialized(&self) -> bool {
        self.cipher.is_some()
    }

    /// Label of the bound key; empty for an uninitialised adapter.
    pub fn key_label(&self) -> &str {
        &self.key_label
    }

    fn cipher(&self) -> Result<&dyn GcmCipher, AeadError> {
        self.cipher.as_deref().ok_or(AeadError::NotInitialized)
    }
}

impl Default for HsmAead {
    fn default() -> Self {
        Self {
            cipher: None,
            nonces: Box::new(OsNonceSource),
            key_label: String::new(),
        }
    }
}

impl fmt::Debug for HsmAead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HsmAead")
            .field("key_label", &self.key_label)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Aead for HsmAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        let cipher = self.cipher()?;

        let mut nonce = vec![0u8; cipher.nonce_size()];
        self.nonces
            .fill(&mut nonce)
            .map_err(|e| AeadError::Randomness(Box::new(e)))?;

        let sealed = cipher
            .seal(&nonce, plaintext, associated_data)
            .map_err(|e| AeadError::Token(Box::new(e)))?;

        Ok(envelope::join(&nonce, &sealed))
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        let cipher = self.cipher()?;
        let (nonce, sealed) = envelope::split(ciphertext, cipher.nonce_size())?;

        // Rejections from the token collapse to one cause-free error; a
        // poisoned session lock is a local fault and keeps its cause.
        cipher
            .open(nonce, sealed, associated_data)
            .map_err(|e| match e {
                TokenError::SessionPoisoned => AeadError::Token(Box::new(e)),
                _ => {
                    debug!(key_label = %self.key_label, "GCM open rejected");
                    AeadError::AuthenticationFailure
                }
            })
    }
}
