//! Common AEAD capability, error taxonomy, and envelope layout shared across
//! `hsm-aead` crates.
//!
//! Nothing here depends on PKCS#11, so software-only implementations can
//! satisfy [`Aead`] without pulling in the token stack.

pub mod aead;
pub mod envelope;
pub mod error;

pub use aead::Aead;
pub use error::{AeadError, BoxError};
