//! `cryptoki`-backed token: one logged-in session on the slot whose token
//! label matches the configuration.
//!
//! Keys are AES secret keys identified by `CKA_LABEL`.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::mechanism::aead::GcmParams;
use cryptoki::mechanism::{Mechanism, MechanismType};
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::{AuthPin, Ulong};
use tracing::{debug, info};

use super::{GcmCipher, KeyStore, TokenError};

/// GCM IV length used with the token (96 bits).
pub const GCM_NONCE_LEN: usize = 12;

/// GCM authentication tag length appended by the token (128 bits).
pub const GCM_TAG_LEN: usize = 16;

const GCM_TAG_BITS: u64 = (GCM_TAG_LEN * 8) as u64;

/// Where to find the token and how to log in to it.
#[derive(Clone)]
pub struct TokenConfig {
    /// Filesystem path to the PKCS#11 module (`.so` / `.dylib` / `.dll`).
    pub module: PathBuf,
    /// Label of the token to open a session on.
    pub token_label: String,
    /// User PIN.
    pub pin: String,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("module", &self.module)
            .field("token_label", &self.token_label)
            .field("pin", &"[REDACTED]")
            .finish()
    }
}

/// Handle to a secret key object on the token.
///
/// Only obtainable through [`Pkcs11Context::find_key`](KeyStore::find_key)
/// and consumed by [`KeyStore::new_gcm`].
#[derive(Debug)]
pub struct SecretKeyObject(ObjectHandle);

struct Inner {
    session: Mutex<Session>,
    slot: Slot,
    // Dropped last: keeps the module loaded while any cipher is alive.
    pkcs11: Pkcs11,
}

impl Inner {
    fn session(&self) -> Result<MutexGuard<'_, Session>, TokenError> {
        self.session.lock().map_err(|_| TokenError::SessionPoisoned)
    }
}

/// A logged-in PKCS#11 session shared by every cipher built from it.
///
/// Cheap to clone. Session access is serialised by an internal mutex.
#[derive(Clone)]
pub struct Pkcs11Context {
    inner: Arc<Inner>,
}

impl Pkcs11Context {
    /// Load the module, find the token by label, open a session and log in.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TokenNotFound`] if no slot carries a token with
    /// the configured label, or [`TokenError::Pkcs11`] for any module error
    /// (load failure, wrong PIN, ...).
    pub fn configure(cfg: &TokenConfig) -> Result<Self, TokenError> {
        let pkcs11 = Pkcs11::new(&cfg.module)?;
        pkcs11.initialize(CInitializeArgs::OsThreads)?;

        let mut found = None;
        for slot in pkcs11.get_slots_with_token()? {
            let info = pkcs11.get_token_info(slot)?;
            if info.label().trim_end() == cfg.token_label {
                found = Some(slot);
                break;
            }
        }
        let slot = found.ok_or_else(|| TokenError::TokenNotFound(cfg.token_label.clone()))?;

        let session = pkcs11.open_rw_session(slot)?;
        session.login(UserType::User, Some(&AuthPin::new(cfg.pin.clone())))?;

        info!(
            token_label = %cfg.token_label,
            slot = slot.id(),
            "PKCS#11 session opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                slot,
                pkcs11,
            }),
        })
    }
}

impl fmt::Debug for Pkcs11Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs11Context")
            .field("slot", &self.inner.slot.id())
            .finish_non_exhaustive()
    }
}

impl KeyStore for Pkcs11Context {
    type Key = SecretKeyObject;

    fn find_key(&self, label: &str) -> Result<Option<SecretKeyObject>, TokenError> {
        let template = vec![
            Attribute::Class(ObjectClass::SECRET_KEY),
            Attribute::Label(label.as_bytes().to_vec()),
        ];

        let session = self.inner.session()?;
        let handles = session.find_objects(&template)?;
        if handles.len() > 1 {
            debug!(label, matches = handles.len(), "several keys share a label; using the first");
        }
        Ok(handles.into_iter().next().map(SecretKeyObject))
    }

    fn new_gcm(&self, key: SecretKeyObject) -> Result<Box<dyn GcmCipher>, TokenError> {
        let mechanisms = self.inner.pkcs11.get_mechanism_list(self.inner.slot)?;
        if !mechanisms.contains(&MechanismType::AES_GCM) {
            return Err(TokenError::MechanismUnavailable);
        }

        let session = self.inner.session()?;
        let attrs = session.get_attributes(key.0, &[AttributeType::KeyType, AttributeType::Label])?;
        drop(session);

        let mut key_type = None;
        let mut label = String::new();
        for attr in attrs {
            match attr {
                Attribute::KeyType(kt) => key_type = Some(kt),
                Attribute::Label(bytes) => label = String::from_utf8_lossy(&bytes).into_owned(),
                _ => {}
            }
        }

        if key_type != Some(KeyType::AES) {
            return Err(TokenError::UnsupportedKey {
                label,
                reason: "key type is not AES".into(),
            });
        }

        Ok(Box::new(Pkcs11Gcm {
            ctx: Arc::clone(&self.inner),
            key,
        }))
    }
}

/// `CKM_AES_GCM` on a token-resident key.
struct Pkcs11Gcm {
    ctx: Arc<Inner>,
    key: SecretKeyObject,
}

impl Pkcs11Gcm {
    fn check_nonce(nonce: &[u8]) -> Result<(), TokenError> {
        if nonce.len() != GCM_NONCE_LEN {
            return Err(TokenError::InvalidNonce {
                expected: GCM_NONCE_LEN,
                actual: nonce.len(),
            });
        }
        Ok(())
    }
}

impl GcmCipher for Pkcs11Gcm {
    fn nonce_size(&self) -> usize {
        GCM_NONCE_LEN
    }

    fn seal(&self, nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError> {
        Self::check_nonce(nonce)?;
        let mechanism = Mechanism::AesGcm(GcmParams::new(nonce, aad, Ulong::from(GCM_TAG_BITS)));
        let session = self.ctx.session()?;
        let sealed = session.encrypt(&mechanism, self.key.0, plaintext)?;
        if sealed.len() != plaintext.len() + GCM_TAG_LEN {
            return Err(TokenError::Failed(format!(
                "GCM output is {} bytes, expected {}",
                sealed.len(),
                plaintext.len() + GCM_TAG_LEN
            )));
        }
        Ok(sealed)
    }

    fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, TokenError> {
        Self::check_nonce(nonce)?;
        if ciphertext.len() < GCM_TAG_LEN {
            return Err(TokenError::Failed("ciphertext shorter than the GCM tag".into()));
        }
        let mechanism = Mechanism::AesGcm(GcmParams::new(nonce, aad, Ulong::from(GCM_TAG_BITS)));
        let session = self.ctx.session()?;
        Ok(session.decrypt(&mechanism, self.key.0, ciphertext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_config_redacts_pin() {
        let cfg = TokenConfig {
            module: "/usr/lib/softhsm/libsofthsm2.so".into(),
            token_label: "tinktest".into(),
            pin: "user-secret".into(),
        };
        let shown = format!("{cfg:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("user-secret"));
    }

    #[test]
    fn missing_module_fails_to_configure() {
        let cfg = TokenConfig {
            module: "/nonexistent/libpkcs11-missing.so".into(),
            token_label: "tinktest".into(),
            pin: "1234".into(),
        };
        let err = Pkcs11Context::configure(&cfg).unwrap_err();
        assert!(matches!(err, TokenError::Pkcs11(_)));
    }

    #[test]
    fn nonce_length_is_checked_before_the_token() {
        assert!(Pkcs11Gcm::check_nonce(&[0u8; GCM_NONCE_LEN]).is_ok());
        let err = Pkcs11Gcm::check_nonce(&[0u8; 8]).unwrap_err();
        assert!(matches!(
            err,
            TokenError::InvalidNonce {
                expected: 12,
                actual: 8
            }
        ));
    }
}
