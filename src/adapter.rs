//! The primitive adapter contract.
//!
//! The core never touches a cryptographic primitive directly. Every cipher
//! call, every random byte and every key operation goes through an
//! implementation of [`CryptoAdapter`], one per host platform. The crate
//! ships one implementation, [`RingAdapter`](crate::native::RingAdapter).
//!
//! Key material is represented by the adapter's associated types. The core
//! only moves those handles around; it sees raw bytes only when it calls
//! one of the explicit export methods.
//!
//! ## Requirements on implementations
//!
//! - The adapter is shared between concurrent callers, so it must be
//!   `Send + Sync`, and `generate_random_bytes` must be safe to call from
//!   many threads at once.
//! - `encrypt` is AES-256-GCM with a 12 byte IV and returns a 16 byte tag.
//! - `decrypt` must fail on any tag mismatch and never return partial
//!   plaintext.
//! - `derive_shared_secret` must return the same key on both sides of an
//!   exchange.

use thiserror::Error;
use zeroize::Zeroizing;

/// IV length for AES-256-GCM (96 bits).
pub const IV_LEN: usize = 12;

/// Authentication tag length for AES-256-GCM (128 bits).
pub const TAG_LEN: usize = 16;

/// Output of an AEAD encryption, and input to its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

/// A freshly generated ECDH key pair, as live adapter handles.
pub struct KeyPair<P, S> {
    pub public_key: P,
    pub private_key: S,
}

/// Failures reported by an adapter.
///
/// These never reach the end user directly; the core maps them onto
/// [`CoreError`](crate::error::CoreError) at each call site.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("random source failed")]
    Randomness,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cipher operation failed")]
    Cipher,

    /// Tag mismatch: wrong key or tampered data.
    #[error("authentication failed")]
    Authentication,

    #[error("key agreement failed: {0}")]
    KeyAgreement(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Capability interface every host platform implements.
pub trait CryptoAdapter: Send + Sync {
    /// Symmetric AEAD key handle.
    type Key: Send + Sync;
    /// ECDH public key handle.
    type PublicKey: Send + Sync;
    /// ECDH private key handle.
    type PrivateKey: Send + Sync;

    /// Produce exactly `len` cryptographically secure random bytes.
    fn generate_random_bytes(&self, len: usize) -> Result<Vec<u8>, AdapterError>;

    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &Self::Key,
        iv: &[u8; IV_LEN],
    ) -> Result<SealedBytes, AdapterError>;

    /// Fails with [`AdapterError::Authentication`] on tag mismatch.
    fn decrypt(&self, sealed: &SealedBytes, key: &Self::Key) -> Result<Vec<u8>, AdapterError>;

    fn generate_ecdh_key_pair(
        &self,
    ) -> Result<KeyPair<Self::PublicKey, Self::PrivateKey>, AdapterError>;

    fn export_public_key(&self, key: &Self::PublicKey) -> Result<Vec<u8>, AdapterError>;

    fn export_private_key(
        &self,
        key: &Self::PrivateKey,
    ) -> Result<Zeroizing<Vec<u8>>, AdapterError>;

    fn import_public_key(&self, bytes: &[u8]) -> Result<Self::PublicKey, AdapterError>;

    fn import_private_key(&self, bytes: &[u8]) -> Result<Self::PrivateKey, AdapterError>;

    /// ECDH between our private key and the remote party's public key.
    /// The result is a symmetric key handle; the raw shared secret never
    /// leaves the adapter.
    fn derive_shared_secret(
        &self,
        private_key: &Self::PrivateKey,
        public_key: &Self::PublicKey,
    ) -> Result<Self::Key, AdapterError>;

    fn export_key(&self, key: &Self::Key) -> Result<Zeroizing<Vec<u8>>, AdapterError>;

    fn import_key(&self, bytes: &[u8]) -> Result<Self::Key, AdapterError>;

    /// PBKDF2 (or the platform's equivalent) over `password` and `salt`.
    fn derive_key_from_password(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self::Key, AdapterError>;
}
