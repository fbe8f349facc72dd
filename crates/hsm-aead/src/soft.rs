//! AES-256-GCM-SIV over an in-memory key.
//!
//! Software counterpart of [`HsmAead`](crate::HsmAead) behind the same
//! [`Aead`] capability and the same `nonce || ciphertext || tag` envelope.
//! Useful where no token is available, e.g. development or tests of
//! code that only depends on `dyn Aead`.

use std::fmt;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead as _, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use common::{envelope, Aead, AeadError};

/// Byte length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce.
pub const NONCE_LEN: usize = 12;

/// Software AEAD. Key material lives only inside the cipher and is never
/// printed by `Debug`.
pub struct SoftAead {
    cipher: Aes256GcmSiv,
}

impl SoftAead {
    /// Build from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AeadError::InvalidArgument`] if `key` is not [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, AeadError> {
        if key.len() != KEY_LEN {
            return Err(AeadError::InvalidArgument(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256GcmSiv::new_from_slice(key)
            .map_err(|_| AeadError::InvalidArgument("invalid key length".into()))?;
        Ok(Self { cipher })
    }

    /// Build with a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        let aead = Self {
            cipher: Aes256GcmSiv::new(&key.into()),
        };
        key.iter_mut().for_each(|b| *b = 0);
        aead
    }
}

impl fmt::Debug for SoftAead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("SoftAead([REDACTED])")
    }
}

impl Aead for SoftAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| AeadError::Randomness(Box::new(e)))?;

        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| AeadError::Token("aead operation failed".into()))?;

        Ok(envelope::join(&nonce, &sealed))
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
        let (nonce, sealed) = envelope::split(ciphertext, NONCE_LEN)?;
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: associated_data,
                },
            )
            .map_err(|_| AeadError::AuthenticationFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SoftToken;
    use crate::HsmAead;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let aead = SoftAead::generate();
        let ct = aead.encrypt(b"123-45-6789", b"record:7").unwrap();
        assert_eq!(aead.decrypt(&ct, b"record:7").unwrap(), b"123-45-6789");
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let a = SoftAead::generate();
        let b = SoftAead::generate();
        let ct = a.encrypt(b"secret", b"").unwrap();
        assert!(matches!(
            b.decrypt(&ct, b""),
            Err(AeadError::AuthenticationFailure)
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(matches!(
            SoftAead::new(&[0u8; 16]),
            Err(AeadError::InvalidArgument(_))
        ));
        assert!(SoftAead::new(&[7u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let aead = SoftAead::generate();
        let mut ct = aead.encrypt(b"tamper me", b"").unwrap();
        ct[NONCE_LEN] ^= 0xFF;
        assert!(matches!(
            aead.decrypt(&ct, b""),
            Err(AeadError::AuthenticationFailure)
        ));
    }

    #[test]
    fn short_input_is_malformed() {
        let aead = SoftAead::generate();
        assert!(matches!(
            aead.decrypt(&[0u8; 4], b""),
            Err(AeadError::MalformedInput { len: 4, .. })
        ));
    }

    #[test]
    fn key_redacted_in_debug() {
        let aead = SoftAead::new(&[0xAB; KEY_LEN]).unwrap();
        assert_eq!(format!("{aead:?}"), "SoftAead([REDACTED])");
    }

    #[test]
    fn same_key_bytes_interoperate() {
        let key = [0x5Au8; KEY_LEN];
        let sealer = SoftAead::new(&key).unwrap();
        let opener = SoftAead::new(&key).unwrap();
        let ct = sealer.encrypt(b"payload", b"ctx").unwrap();
        assert_eq!(opener.decrypt(&ct, b"ctx").unwrap(), b"payload");
    }

    #[test]
    fn interchangeable_with_hsm_adapter() {
        let token = SoftToken::with_key("k");
        let backends: Vec<Box<dyn Aead>> = vec![
            Box::new(SoftAead::generate()),
            Box::new(HsmAead::new(Some(&token), "k").unwrap()),
        ];
        for aead in &backends {
            let ct = aead.encrypt(b"hello aead", b"user-id:42").unwrap();
            assert_eq!(ct.len(), NONCE_LEN + 10 + 16);
            assert_eq!(aead.decrypt(&ct, b"user-id:42").unwrap(), b"hello aead");
            assert!(aead.decrypt(&ct, b"user-id:43").is_err());
        }
    }
}
