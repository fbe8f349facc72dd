//! Ciphertext envelope layout.
//!
//! ```text
//! nonce (N bytes) || ciphertext || tag
//! ```
//!
//! `N` is fixed by the cipher (12 for GCM). There is no version byte and no
//! length prefix; the tag boundary is the cipher's own convention.

use crate::error::AeadError;

/// Concatenate `nonce` and `ciphertext_and_tag` into one envelope.
pub fn join(nonce: &[u8], ciphertext_and_tag: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nonce.len() + ciphertext_and_tag.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(ciphertext_and_tag);
    out
}

/// Split an envelope into its nonce and the remaining ciphertext-and-tag.
///
/// # Errors
///
/// Returns [`AeadError::MalformedInput`] if `envelope` is shorter than
/// `nonce_len`.
pub fn split(envelope: &[u8], nonce_len: usize) -> Result<(&[u8], &[u8]), AeadError> {
    if envelope.len() < nonce_len {
        return Err(AeadError::MalformedInput {
            len: envelope.len(),
            nonce_len,
        });
    }
    Ok(envelope.split_at(nonce_len))
}
