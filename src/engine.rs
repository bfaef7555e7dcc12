//! Symmetric payload encryption.
//!
//! The engine turns text into an [`EncryptedPayload`] and back, using a key
//! handle supplied by the caller and primitives supplied by the adapter.
//!
//! Properties:
//! - A fresh 12 byte IV is drawn from the adapter for every `encrypt`
//!   call. Callers cannot supply one.
//! - `decrypt` decodes all three fields before the cipher runs; a decode
//!   failure on any of them means the cipher is never called.
//! - Every decryption failure looks identical to the caller.
//! - The engine keeps no state between calls.

use std::sync::Arc;

use crate::adapter::{CryptoAdapter, SealedBytes, IV_LEN, TAG_LEN};
use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::codec;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::payload::{EncryptedPayload, EncryptionMetadata, EncryptionMode, Protocol};

pub struct EncryptionEngine<A: CryptoAdapter> {
    adapter: Arc<A>,
    mode: EncryptionMode,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<A: CryptoAdapter> EncryptionEngine<A> {
    pub fn new(adapter: Arc<A>, config: &CoreConfig) -> Self {
        Self {
            adapter,
            mode: config.mode,
            audit: None,
        }
    }

    /// Report failure detail to `sink` in addition to `tracing`.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn mode(&self) -> EncryptionMode {
        self.mode
    }

    /// Encrypt `plaintext` under `key`.
    ///
    /// The returned metadata carries the engine's configured mode. The
    /// engine cannot know whether `key` is a conversation secret or a
    /// server key, so a caller encrypting under a key of the other kind must
    /// overwrite `metadata.mode` (see [`EncryptedPayload::with_mode`])
    /// before storing the payload.
    pub fn encrypt(
        &self,
        plaintext: &str,
        key: &A::Key,
        key_id: &str,
    ) -> Result<EncryptedPayload> {
        let iv = self
            .fresh_iv()
            .map_err(|detail| self.encryption_failure(key_id, detail))?;

        let sealed = self
            .adapter
            .encrypt(&codec::string_to_bytes(plaintext), key, &iv)
            .map_err(|e| self.encryption_failure(key_id, e.to_string()))?;

        if sealed.iv != iv {
            return Err(self.encryption_failure(key_id, "adapter returned a different iv".into()));
        }
        if sealed.auth_tag.len() != TAG_LEN {
            return Err(self.encryption_failure(
                key_id,
                format!("adapter returned a {} byte tag", sealed.auth_tag.len()),
            ));
        }

        tracing::debug!(key_id, bytes = plaintext.len(), "payload encrypted");

        Ok(EncryptedPayload {
            ciphertext: codec::bytes_to_base64(&sealed.ciphertext),
            metadata: EncryptionMetadata {
                mode: self.mode,
                protocol: Protocol::Aes256Gcm,
                key_id: key_id.to_owned(),
                iv: codec::bytes_to_base64(&sealed.iv),
                auth_tag: codec::bytes_to_base64(&sealed.auth_tag),
            },
        })
    }

    /// Decrypt `payload` with `key`, returning the original text verbatim.
    ///
    /// Fails with [`CoreError::DecryptionFailure`] on a wrong key, tampered
    /// data or malformed fields, and with [`CoreError::UnsupportedProtocol`]
    /// for protocols other than AES-256-GCM.
    pub fn decrypt(&self, payload: &EncryptedPayload, key: &A::Key) -> Result<String> {
        let metadata = &payload.metadata;
        if metadata.protocol != Protocol::Aes256Gcm {
            return Err(CoreError::UnsupportedProtocol(metadata.protocol));
        }

        let sealed = self
            .decode(payload)
            .map_err(|detail| self.decryption_failure(&metadata.key_id, &detail))?;

        let bytes = self
            .adapter
            .decrypt(&sealed, key)
            .map_err(|e| self.decryption_failure(&metadata.key_id, &e.to_string()))?;

        let text = codec::bytes_to_string(bytes).map_err(|_| {
            self.decryption_failure(&metadata.key_id, "plaintext is not valid utf-8")
        })?;

        tracing::debug!(key_id = %metadata.key_id, bytes = text.len(), "payload decrypted");
        Ok(text)
    }

    fn fresh_iv(&self) -> std::result::Result<[u8; IV_LEN], String> {
        let bytes = self
            .adapter
            .generate_random_bytes(IV_LEN)
            .map_err(|e| e.to_string())?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| format!("random source returned {} bytes, expected {}", len, IV_LEN))
    }

    /// Decode and length-check every field. Runs to completion before the
    /// cipher is invoked.
    fn decode(&self, payload: &EncryptedPayload) -> std::result::Result<SealedBytes, String> {
        let metadata = &payload.metadata;
        let ciphertext = codec::base64_to_bytes(&payload.ciphertext)
            .map_err(|e| format!("ciphertext is not valid base64: {e}"))?;
        let iv = codec::base64_to_bytes(&metadata.iv)
            .map_err(|e| format!("iv is not valid base64: {e}"))?;
        let auth_tag = codec::base64_to_bytes(&metadata.auth_tag)
            .map_err(|e| format!("auth tag is not valid base64: {e}"))?;

        if iv.len() != IV_LEN {
            return Err(format!("iv is {} bytes, expected {}", iv.len(), IV_LEN));
        }
        if auth_tag.len() != TAG_LEN {
            return Err(format!(
                "auth tag is {} bytes, expected {}",
                auth_tag.len(),
                TAG_LEN
            ));
        }

        Ok(SealedBytes {
            ciphertext,
            iv,
            auth_tag,
        })
    }

    fn encryption_failure(&self, key_id: &str, detail: String) -> CoreError {
        self.report(Operation::Encrypt, key_id, &detail);
        CoreError::EncryptionFailure(detail)
    }

    fn decryption_failure(&self, key_id: &str, detail: &str) -> CoreError {
        self.report(Operation::Decrypt, key_id, detail);
        CoreError::DecryptionFailure
    }

    fn report(&self, operation: Operation, key_id: &str, detail: &str) {
        tracing::warn!(?operation, key_id, reason = detail, "payload operation failed");
        if let Some(sink) = &self.audit {
            sink.record(AuditRecord::now(operation, Some(key_id), detail));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::native::RingAdapter;

    fn engine() -> (Arc<RingAdapter>, EncryptionEngine<RingAdapter>) {
        let adapter = Arc::new(RingAdapter::new());
        let engine = EncryptionEngine::new(Arc::clone(&adapter), &CoreConfig::default());
        (adapter, engine)
    }

    #[test]
    fn test_metadata_is_populated() {
        let (adapter, engine) = engine();
        let key = adapter.import_key(&[3u8; 32]).unwrap();
        let payload = engine.encrypt("hi", &key, "key-7").unwrap();

        assert_eq!(payload.metadata.protocol, Protocol::Aes256Gcm);
        assert_eq!(payload.metadata.mode, EncryptionMode::E2ee);
        assert_eq!(payload.metadata.key_id, "key-7");
        assert_eq!(codec::base64_to_bytes(&payload.metadata.iv).unwrap().len(), IV_LEN);
        assert_eq!(
            codec::base64_to_bytes(&payload.metadata.auth_tag).unwrap().len(),
            TAG_LEN
        );
    }

    #[test]
    fn test_mode_follows_config() {
        let adapter = Arc::new(RingAdapter::new());
        let engine = EncryptionEngine::new(Arc::clone(&adapter), &CoreConfig::server());
        let key = adapter.import_key(&[3u8; 32]).unwrap();
        let payload = engine.encrypt("at rest", &key, "srv").unwrap();
        assert_eq!(payload.metadata.mode, EncryptionMode::Server);
    }

    #[test]
    fn test_empty_and_whitespace_plaintext_survive() {
        let (adapter, engine) = engine();
        let key = adapter.import_key(&[4u8; 32]).unwrap();
        for text in ["", " ", "\n\tpadded \n"] {
            let payload = engine.encrypt(text, &key, "k").unwrap();
            assert_eq!(engine.decrypt(&payload, &key).unwrap(), text);
        }
    }

    #[test]
    fn test_wrong_iv_length_is_reported_only_to_sink() {
        let (adapter, engine) = engine();
        let sink = Arc::new(MemoryAuditSink::new());
        let engine = engine.with_audit_sink(sink.clone());
        let key = adapter.import_key(&[5u8; 32]).unwrap();

        let mut payload = engine.encrypt("hello", &key, "k5").unwrap();
        payload.metadata.iv = codec::bytes_to_base64(&[0u8; 8]);

        let err = engine.decrypt(&payload, &key).unwrap_err();
        assert!(matches!(err, CoreError::DecryptionFailure));
        assert!(!err.to_string().contains("iv"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, Operation::Decrypt);
        assert!(records[0].detail.contains("iv is 8 bytes"));
    }

    #[test]
    fn test_signal_v3_is_rejected_before_decoding() {
        let (adapter, engine) = engine();
        let key = adapter.import_key(&[6u8; 32]).unwrap();
        let mut payload = engine.encrypt("hello", &key, "k6").unwrap();
        payload.metadata.protocol = Protocol::SignalV3;
        payload.ciphertext = "%%% not base64 %%%".into();

        assert!(matches!(
            engine.decrypt(&payload, &key),
            Err(CoreError::UnsupportedProtocol(Protocol::SignalV3))
        ));
    }
}
