//! # cipherlink
//!
//! Platform-independent encryption for message payloads.
//!
//! The same protocol logic runs on every host. Each host supplies its
//! primitives (AES-256-GCM, ECDH, PBKDF2, randomness) through a
//! [`CryptoAdapter`]; the core orchestrates them and defines the payload
//! format that every platform stores and transmits.
//!
//! ## Flow
//!
//! ```text
//! plaintext -> EncryptionEngine::encrypt -> prepare_for_storage
//!           -> (storage / transport)
//!           -> reconstruct_payload -> EncryptionEngine::decrypt -> plaintext
//! ```
//!
//! Keys come either from [`KeyAgreement::perform_key_agreement`] (end to
//! end) or from [`KeyAgreement::derive_key_from_password`] and
//! [`KeyAgreement::import_key_from_string`] (at rest).
//!
//! The core has no global state: no key cache, no session, no singleton.
//! Everything it needs is passed in.

pub mod adapter;
pub mod agreement;
pub mod audit;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod native;
pub mod payload;

pub use adapter::{AdapterError, CryptoAdapter, KeyPair, SealedBytes, IV_LEN, TAG_LEN};
pub use agreement::{ExportedKeyPair, KeyAgreement, RegistrationId};
pub use config::CoreConfig;
pub use engine::EncryptionEngine;
pub use error::{CoreError, Result};
pub use native::RingAdapter;
pub use payload::{
    parse_metadata, prepare_for_storage, reconstruct_payload, validate_metadata,
    EncryptedPayload, EncryptionMetadata, EncryptionMode, Protocol, StorageRecord,
};
