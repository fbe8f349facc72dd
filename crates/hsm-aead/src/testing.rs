//! Software stand-in for a PKCS#11 token, used by unit tests.
//!
//! Keys live in memory and GCM runs through `aes-gcm`, so the adapter can be
//! exercised end to end without an HSM.

use std::collections::HashMap;

use aes_gcm::aead::{Aead as _, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::token::{GcmCipher, KeyStore, TokenError};

const NONCE_LEN: usize = 12;

#[derive(Default)]
pub(crate) struct SoftToken {
    keys: HashMap<String, [u8; 32]>,
}

impl SoftToken {
    /// Token holding one random AES-256 key under `label`.
    pub(crate) fn with_key(label: &str) -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let mut keys = HashMap::new();
        keys.insert(label.to_string(), key);
        Self { keys }
    }
}

impl KeyStore for SoftToken {
    type Key = [u8; 32];

    fn find_key(&self, label: &str) -> Result<Option<[u8; 32]>, TokenError> {
        Ok(self.keys.get(label).copied())
    }

    fn new_gcm(&self, key: [u8; 32]) -> Result<Box<dyn GcmCipher>, TokenError> {
        Ok(Box::new(SoftGcm {
            cipher: Aes256Gcm::new(&key.into()),
        }))
    }
}

struct SoftGcm {
    cipher: Aes256Gcm,
}

impl SoftGcm {
    fn nonce(nonce: &[u8]) -> Result<&Nonce<aes_gcm::aead::consts::U12>, TokenError> {
        if nonce.len() != NONCE_LEN {
            return Err(TokenError::InvalidNonce {
                expected: NONCE_LEN,
                actual: nonce.len(),
            });
        }
        Ok(Nonce::from_slice(nonce))
    }
}

impl GcmCipher for SoftGcm {
    fn nonce_size(&self) -> usize {
        NONCE_LEN
    }

    fn seal(&self, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError> {
        self.cipher
            .encrypt(Self::nonce(nonce)?, Payload { msg: plaintext, aad })
            .map_err(|_| TokenError::Failed("seal".into()))
    }

    fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError> {
        self.cipher
            .decrypt(Self::nonce(nonce)?, Payload { msg: ciphertext, aad })
            .map_err(|_| TokenError::Failed("tag mismatch".into()))
    }
}
