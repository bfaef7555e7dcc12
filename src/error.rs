//! Error types for cipherlink.
//!
//! Every variant of [`CoreError`] is a distinct failure mode of the core.
//! Messages are intentionally minimal. In particular `DecryptionFailure`
//! carries a single fixed message no matter which check failed: wrong key,
//! bad tag, malformed base64 and wrong IV length all look the same to the
//! caller. The precise reason is only reported on the trusted channel
//! (`tracing` and any attached [`AuditSink`](crate::audit::AuditSink)).

use thiserror::Error;

use crate::payload::Protocol;

/// User-safe message attached to every decryption failure.
pub const DECRYPTION_FAILURE_MESSAGE: &str =
    "message may be corrupted or encrypted with a different key";

/// The single error type for all core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The adapter failed while encrypting, or violated its contract
    /// (wrong IV or tag length). Never retried: a retry needs a fresh IV.
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),

    /// Wrong key, tampered data or malformed input.
    #[error("{}", DECRYPTION_FAILURE_MESSAGE)]
    DecryptionFailure,

    /// Metadata failed the structural check in the payload codec.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The payload names a protocol the engine does not implement.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(Protocol),

    /// A key string was not valid base64.
    #[error("invalid key encoding")]
    InvalidKeyEncoding,

    /// Importing key material or deriving the shared secret failed.
    #[error("key agreement failed: {0}")]
    KeyAgreementFailure(String),

    /// Password-based key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailure(String),

    /// A symmetric key could not be exported or imported.
    #[error("key import/export failed: {0}")]
    KeyImportFailure(String),

    /// The adapter's random source failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,

    /// Configuration could not be parsed or holds an invalid value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failure_message_is_generic() {
        let message = CoreError::DecryptionFailure.to_string();
        assert_eq!(message, DECRYPTION_FAILURE_MESSAGE);
        assert!(!message.contains("tag"));
        assert!(!message.contains("iv"));
    }
}
