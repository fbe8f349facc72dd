//! Nonce generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Source of fresh nonces.
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    /// Fill `buf` entirely with unpredictable bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error>;
}

/// Nonces drawn from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }
}
