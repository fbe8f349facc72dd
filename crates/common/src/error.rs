//! Error taxonomy shared by every [`Aead`](crate::Aead) implementation.

use thiserror::Error;

/// Boxed underlying cause, kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by AEAD construction, encryption, and decryption.
///
/// Variants map to machine-readable codes via [`AeadError::code`]:
/// - [`AeadError::InvalidArgument`] → `invalid_argument`
/// - [`AeadError::NotFound`] → `not_found`
/// - [`AeadError::Construction`] → `construction_error`
/// - [`AeadError::NotInitialized`] → `not_initialized`
/// - [`AeadError::Randomness`] → `randomness_failure`
/// - [`AeadError::MalformedInput`] → `malformed_input`
/// - [`AeadError::AuthenticationFailure`] → `authentication_failure`
/// - [`AeadError::Token`] → `token_failure`
#[derive(Debug, Error)]
pub enum AeadError {
    /// A construction input was absent or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No key with the requested label exists on the token.
    #[error("key not found: {label}")]
    NotFound {
        /// Label that was searched for.
        label: String,
    },

    /// The token could not build a GCM cipher for the key.
    #[error("creating GCM AEAD for key {label}: {source}")]
    Construction {
        /// Label of the key the cipher was to be bound to.
        label: String,
        #[source]
        source: BoxError,
    },

    /// The adapter has no bound cipher.
    #[error("AEAD not initialized")]
    NotInitialized,

    /// The secure random source could not produce a nonce.
    #[error("nonce generation failed: {0}")]
    Randomness(#[source] BoxError),

    /// The envelope is too short to hold a nonce.
    #[error("ciphertext too short: {len} bytes, nonce alone needs {nonce_len}")]
    MalformedInput {
        /// Length of the rejected envelope.
        len: usize,
        /// Nonce length required by the cipher.
        nonce_len: usize,
    },

    /// Tag verification failed.
    ///
    /// Carries no cause: a corrupted ciphertext, a truncated tag, and
    /// mismatched associated data all look the same to the caller.
    #[error("message authentication failed")]
    AuthenticationFailure,

    /// The token failed an operation other than opening a ciphertext.
    #[error("token operation failed: {0}")]
    Token(#[source] BoxError),
}

impl AeadError {
    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AeadError::InvalidArgument(_) => "invalid_argument",
            AeadError::NotFound { .. } => "not_found",
            AeadError::Construction { .. } => "construction_error",
            AeadError::NotInitialized => "not_initialized",
            AeadError::Randomness(_) => "randomness_failure",
            AeadError::MalformedInput { .. } => "malformed_input",
            AeadError::AuthenticationFailure => "authentication_failure",
            AeadError::Token(_) => "token_failure",
        }
    }
}
