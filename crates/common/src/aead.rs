//! The generic AEAD capability.

use std::sync::Arc;

use crate::error::AeadError;

/// Authenticated encryption with associated data.
///
/// `encrypt` returns a self-contained envelope that `decrypt` accepts along
/// with the same associated data. Implementations must be safe to share
/// across threads.
pub trait Aead: Send + Sync {
    /// Encrypt `plaintext` and authenticate it together with `associated_data`.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`AeadError`].
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError>;

    /// Verify and decrypt an envelope produced by [`Aead::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`AeadError::AuthenticationFailure`] if the envelope or the
    /// associated data was altered.
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError>;
}

impl<T: Aead + ?Sized> Aead for &T {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).encrypt(plaintext, associated_data)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).decrypt(ciphertext, associated_data)
    }
}

impl<T: Aead + ?Sized> Aead for Box<T> {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).encrypt(plaintext, associated_data)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).decrypt(ciphertext, associated_data)
    }
}

impl<T: Aead + ?Sized> Aead for Arc<T> {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).encrypt(plaintext, associated_data)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        (**self).decrypt(ciphertext, associated_data)
    }
}
