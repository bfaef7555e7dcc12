//! Pairwise key agreement and key lifecycle helpers.
//!
//! Two parties each call [`KeyAgreement::generate_key_pair`], swap public
//! keys over any channel, and call [`KeyAgreement::perform_key_agreement`]
//! with their own private key and the peer's public key. Both end up with
//! a key handle that encrypts and decrypts interchangeably.
//!
//! Key pairs leave this module only as base64 strings. Live handles are
//! dropped before each call returns, and the shared secret itself never
//! leaves the adapter.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::adapter::CryptoAdapter;
use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::codec;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};

/// Random bytes behind a key id (128 bits).
pub const KEY_ID_LEN: usize = 16;

/// Registration ids keep the low 14 bits.
pub const REGISTRATION_ID_MASK: u32 = 0x3FFF;

/// A party's identifier in the key-agreement protocol, in `0..=16383`.
///
/// Generate once per identity and persist it. Peers hold references to it,
/// so regenerating it breaks those references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(u16);

impl RegistrationId {
    pub const MAX: u16 = REGISTRATION_ID_MASK as u16;

    /// Big-endian u32 of `bytes`, masked to 14 bits.
    pub fn from_random_bytes(bytes: [u8; 4]) -> Self {
        let masked = u32::from_be_bytes(bytes) & REGISTRATION_ID_MASK;
        // The mask keeps the value below 2^14.
        Self(masked as u16)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Both halves of a key pair, exported and base64 encoded.
pub struct ExportedKeyPair {
    /// Safe to publish.
    pub public_key: String,
    /// Secret. Zeroised on drop.
    pub private_key: Zeroizing<String>,
}

impl fmt::Debug for ExportedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"***")
            .finish()
    }
}

pub struct KeyAgreement<A: CryptoAdapter> {
    adapter: Arc<A>,
    pbkdf2_iterations: u32,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<A: CryptoAdapter> KeyAgreement<A> {
    pub fn new(adapter: Arc<A>, config: &CoreConfig) -> Self {
        Self {
            adapter,
            pbkdf2_iterations: config.pbkdf2_iterations,
            audit: None,
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// An opaque label for a key: 16 random bytes, base64 encoded.
    pub fn generate_key_id(&self) -> Result<String> {
        let bytes = self.random(KEY_ID_LEN)?;
        Ok(codec::bytes_to_base64(&bytes))
    }

    pub fn generate_key_pair(&self) -> Result<ExportedKeyPair> {
        let pair = self
            .adapter
            .generate_ecdh_key_pair()
            .map_err(|e| self.agreement_failure(e.to_string()))?;

        let public = self
            .adapter
            .export_public_key(&pair.public_key)
            .map_err(|e| self.agreement_failure(e.to_string()))?;
        let private = self
            .adapter
            .export_private_key(&pair.private_key)
            .map_err(|e| self.agreement_failure(e.to_string()))?;

        Ok(ExportedKeyPair {
            public_key: codec::bytes_to_base64(&public),
            private_key: Zeroizing::new(codec::bytes_to_base64(&private)),
        })
    }

    /// Derive the key shared with a peer.
    ///
    /// `private_key` is our own exported private key; `public_key` is the
    /// peer's exported public key. Both are base64.
    pub fn perform_key_agreement(&self, private_key: &str, public_key: &str) -> Result<A::Key> {
        let private_bytes = Zeroizing::new(codec::base64_to_bytes(private_key).map_err(|e| {
            self.encoding_failure(Operation::KeyAgreement, format!("private key: {e}"))
        })?);
        let public_bytes = codec::base64_to_bytes(public_key).map_err(|e| {
            self.encoding_failure(Operation::KeyAgreement, format!("public key: {e}"))
        })?;

        let private = self
            .adapter
            .import_private_key(&private_bytes)
            .map_err(|e| self.agreement_failure(format!("private key: {e}")))?;
        let public = self
            .adapter
            .import_public_key(&public_bytes)
            .map_err(|e| self.agreement_failure(format!("public key: {e}")))?;

        let shared = self
            .adapter
            .derive_shared_secret(&private, &public)
            .map_err(|e| self.agreement_failure(e.to_string()))?;

        tracing::debug!("shared key derived");
        Ok(shared)
    }

    pub fn generate_registration_id(&self) -> Result<RegistrationId> {
        let bytes: [u8; 4] = self
            .random(4)?
            .try_into()
            .map_err(|_| CoreError::RandomnessFailure)?;
        Ok(RegistrationId::from_random_bytes(bytes))
    }

    /// Derive a key from a password.
    ///
    /// The salt must be unique per derivation context. This cannot be
    /// checked here and is the caller's responsibility.
    pub fn derive_key_from_password(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<A::Key> {
        self.adapter
            .derive_key_from_password(password, salt, iterations)
            .map_err(|e| {
                let detail = e.to_string();
                self.report(Operation::KeyDerivation, &detail);
                CoreError::KeyDerivationFailure(detail)
            })
    }

    /// [`Self::derive_key_from_password`] with the configured iteration count.
    pub fn derive_key_with_default_iterations(
        &self,
        password: &str,
        salt: &[u8],
    ) -> Result<A::Key> {
        self.derive_key_from_password(password, salt, self.pbkdf2_iterations)
    }

    /// Export a key handle for persistence.
    pub fn export_key_to_string(&self, key: &A::Key) -> Result<Zeroizing<String>> {
        let bytes = self
            .adapter
            .export_key(key)
            .map_err(|e| self.import_failure(e.to_string()))?;
        Ok(Zeroizing::new(codec::bytes_to_base64(&bytes)))
    }

    /// Inverse of [`Self::export_key_to_string`].
    pub fn import_key_from_string(&self, encoded: &str) -> Result<A::Key> {
        let bytes = Zeroizing::new(
            codec::base64_to_bytes(encoded)
                .map_err(|e| self.encoding_failure(Operation::KeyImport, format!("key: {e}")))?,
        );
        self.adapter
            .import_key(&bytes)
            .map_err(|e| self.import_failure(e.to_string()))
    }

    fn random(&self, len: usize) -> Result<Vec<u8>> {
        let bytes = self
            .adapter
            .generate_random_bytes(len)
            .map_err(|_| CoreError::RandomnessFailure)?;
        if bytes.len() != len {
            return Err(CoreError::RandomnessFailure);
        }
        Ok(bytes)
    }

    fn agreement_failure(&self, detail: String) -> CoreError {
        self.report(Operation::KeyAgreement, &detail);
        CoreError::KeyAgreementFailure(detail)
    }

    fn import_failure(&self, detail: String) -> CoreError {
        self.report(Operation::KeyImport, &detail);
        CoreError::KeyImportFailure(detail)
    }

    fn encoding_failure(&self, operation: Operation, detail: String) -> CoreError {
        self.report(operation, &format!("invalid base64 in {detail}"));
        CoreError::InvalidKeyEncoding
    }

    fn report(&self, operation: Operation, detail: &str) {
        tracing::warn!(?operation, reason = detail, "key operation failed");
        if let Some(sink) = &self.audit {
            sink.record(AuditRecord::now(operation, None, detail));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::native::RingAdapter;

    fn agreement() -> KeyAgreement<RingAdapter> {
        KeyAgreement::new(Arc::new(RingAdapter::new()), &CoreConfig::default())
    }

    #[test]
    fn test_registration_id_masks_low_14_bits() {
        assert_eq!(RegistrationId::from_random_bytes([0xFF; 4]).value(), 16383);
        assert_eq!(RegistrationId::from_random_bytes([0, 0, 0, 0]).value(), 0);
        assert_eq!(RegistrationId::from_random_bytes([0xAB, 0xCD, 0x40, 0x01]).value(), 1);
        // Big-endian: the last two bytes carry the low bits.
        assert_eq!(RegistrationId::from_random_bytes([0, 0, 0x12, 0x34]).value(), 0x1234);
    }

    #[test]
    fn test_key_id_is_sixteen_random_bytes() {
        let agreement = agreement();
        let a = agreement.generate_key_id().unwrap();
        let b = agreement.generate_key_id().unwrap();
        assert_eq!(codec::base64_to_bytes(&a).unwrap().len(), KEY_ID_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_pair_halves_are_base64() {
        let pair = agreement().generate_key_pair().unwrap();
        assert_eq!(codec::base64_to_bytes(&pair.public_key).unwrap().len(), 32);
        assert_eq!(codec::base64_to_bytes(&pair.private_key).unwrap().len(), 32);
        assert!(!format!("{pair:?}").contains(pair.private_key.as_str()));
    }

    #[test]
    fn test_bad_base64_is_an_encoding_error() {
        let agreement = agreement();
        let pair = agreement.generate_key_pair().unwrap();
        assert!(matches!(
            agreement.perform_key_agreement("***", &pair.public_key),
            Err(CoreError::InvalidKeyEncoding)
        ));
        assert!(matches!(
            agreement.import_key_from_string("***"),
            Err(CoreError::InvalidKeyEncoding)
        ));
    }

    #[test]
    fn test_encoding_errors_reach_the_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let agreement = agreement().with_audit_sink(sink.clone());
        let pair = agreement.generate_key_pair().unwrap();

        let _ = agreement.perform_key_agreement(&pair.private_key, "not*base64");
        let _ = agreement.import_key_from_string("***");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation, Operation::KeyAgreement);
        assert!(records[0].detail.contains("public key"));
        assert_eq!(records[1].operation, Operation::KeyImport);
        assert!(records[1].detail.starts_with("invalid base64"));
    }

    #[test]
    fn test_wrong_length_key_is_an_agreement_failure() {
        let agreement = agreement();
        let pair = agreement.generate_key_pair().unwrap();
        let short = codec::bytes_to_base64(&[1u8; 16]);
        assert!(matches!(
            agreement.perform_key_agreement(&pair.private_key, &short),
            Err(CoreError::KeyAgreementFailure(_))
        ));
    }

    #[test]
    fn test_zero_iterations_fail() {
        assert!(matches!(
            agreement().derive_key_from_password("pw", b"salt", 0),
            Err(CoreError::KeyDerivationFailure(_))
        ));
    }
}
