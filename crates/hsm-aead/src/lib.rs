//! AES-GCM authenticated encryption with a key that never leaves a PKCS#11
//! token.
//!
//! [`HsmAead`] looks a secret key up by label, binds the token's
//! `CKM_AES_GCM` mechanism to it, and exposes the generic [`common::Aead`]
//! capability. Ciphertexts are `nonce || ciphertext || tag`. [`SoftAead`]
//! implements the same capability in software.
//!
//! ```no_run
//! use common::Aead;
//! use hsm_aead::{HsmAead, Pkcs11Context, TokenConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Pkcs11Context::configure(&TokenConfig {
//!     module: "/usr/lib/softhsm/libsofthsm2.so".into(),
//!     token_label: "tinktest".into(),
//!     pin: "user-secret".into(),
//! })?;
//! let aead = HsmAead::new(Some(&ctx), "tink-aes-gcm")?;
//! let ct = aead.encrypt(b"hello aead", b"user-id:42")?;
//! assert_eq!(aead.decrypt(&ct, b"user-id:42")?, b"hello aead");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod nonce;
pub mod soft;
pub mod telemetry;
pub mod token;

#[cfg(test)]
mod testing;

pub use adapter::HsmAead;
pub use soft::SoftAead;
pub use token::{KeyStore, Pkcs11Context, TokenConfig, TokenError};

// Both backends satisfy the shared capability and can sit behind `dyn Aead`.
const _: fn() = || {
    fn assert_aead<T: common::Aead + Send + Sync + 'static>() {}
    assert_aead::<HsmAead>();
    assert_aead::<SoftAead>();
};
const _: Option<&dyn common::Aead> = None;
