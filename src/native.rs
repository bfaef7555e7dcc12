//! Native primitive adapter.
//!
//! This module is the only place in the crate that imports `ring` or
//! `x25519-dalek`. Everything else reaches primitives through the
//! [`CryptoAdapter`] trait.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM, 96-bit IV, 128-bit tag
//! - **Randomness**: `ring::rand::SystemRandom`
//! - **Key agreement**: X25519, followed by HKDF-SHA256 to produce the
//!   AES-256 key
//! - **Password derivation**: PBKDF2-HMAC-SHA256
//!
//! ## Shared-secret derivation
//!
//! ```text
//! HKDF-SHA256(
//!     ikm  = X25519(private, public),
//!     salt = None,
//!     info = "cipherlink:ecdh:aes-256-gcm"
//! )
//! ```

use std::fmt;
use std::num::NonZeroU32;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::hkdf;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::adapter::{AdapterError, CryptoAdapter, KeyPair, SealedBytes, IV_LEN, TAG_LEN};

/// Size of a symmetric key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Size of an X25519 public or private key in bytes.
pub const ECDH_KEY_LEN: usize = 32;

const ECDH_INFO: &[u8] = b"cipherlink:ecdh:aes-256-gcm";

// ---------------------------------------------------------------------------
// Key handles
// ---------------------------------------------------------------------------

/// An AES-256-GCM key.
///
/// - Not `Clone`. Export and import explicitly to duplicate.
/// - Zeroised on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AesKey {
    bytes: [u8; KEY_LEN],
}

impl AesKey {
    fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKey").field("bytes", &"***").finish()
    }
}

/// An X25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdhPublicKey(PublicKey);

/// An X25519 private key. Zeroised on drop by `x25519-dalek`.
pub struct EcdhPrivateKey(StaticSecret);

impl fmt::Debug for EcdhPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EcdhPrivateKey").field(&"***").finish()
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// [`CryptoAdapter`] backed by `ring` and `x25519-dalek`.
#[derive(Debug, Clone)]
pub struct RingAdapter {
    rng: SystemRandom,
}

impl Default for RingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RingAdapter {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn random_array<const N: usize>(&self) -> Result<Zeroizing<[u8; N]>, AdapterError> {
        let mut out = Zeroizing::new([0u8; N]);
        self.rng
            .fill(&mut out[..])
            .map_err(|_| AdapterError::Randomness)?;
        Ok(out)
    }
}

fn less_safe_key(key: &AesKey) -> Result<LessSafeKey, AdapterError> {
    let unbound = UnboundKey::new(&AES_256_GCM, &key.bytes)
        .map_err(|_| AdapterError::InvalidKey("aes-256-gcm key rejected".into()))?;
    Ok(LessSafeKey::new(unbound))
}

fn fixed_len<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], AdapterError> {
    bytes.try_into().map_err(|_| {
        AdapterError::InvalidKey(format!("{} must be {} bytes, got {}", what, N, bytes.len()))
    })
}

impl CryptoAdapter for RingAdapter {
    type Key = AesKey;
    type PublicKey = EcdhPublicKey;
    type PrivateKey = EcdhPrivateKey;

    fn generate_random_bytes(&self, len: usize) -> Result<Vec<u8>, AdapterError> {
        let mut buf = vec![0u8; len];
        self.rng
            .fill(&mut buf)
            .map_err(|_| AdapterError::Randomness)?;
        Ok(buf)
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &Self::Key,
        iv: &[u8; IV_LEN],
    ) -> Result<SealedBytes, AdapterError> {
        let key = less_safe_key(key)?;
        let nonce = Nonce::assume_unique_for_key(*iv);

        let mut in_out = plaintext.to_vec();
        let tag = key
            .seal_in_place_separate_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AdapterError::Cipher)?;

        Ok(SealedBytes {
            ciphertext: in_out,
            iv: iv.to_vec(),
            auth_tag: tag.as_ref().to_vec(),
        })
    }

    fn decrypt(&self, sealed: &SealedBytes, key: &Self::Key) -> Result<Vec<u8>, AdapterError> {
        if sealed.iv.len() != IV_LEN {
            return Err(AdapterError::InvalidInput(format!(
                "iv must be {} bytes, got {}",
                IV_LEN,
                sealed.iv.len()
            )));
        }
        if sealed.auth_tag.len() != TAG_LEN {
            return Err(AdapterError::InvalidInput(format!(
                "auth tag must be {} bytes, got {}",
                TAG_LEN,
                sealed.auth_tag.len()
            )));
        }

        let key = less_safe_key(key)?;
        let nonce = Nonce::try_assume_unique_for_key(&sealed.iv)
            .map_err(|_| AdapterError::InvalidInput("iv rejected".into()))?;

        // `open_in_place` expects the tag appended to the ciphertext.
        let mut in_out = Vec::with_capacity(sealed.ciphertext.len() + TAG_LEN);
        in_out.extend_from_slice(&sealed.ciphertext);
        in_out.extend_from_slice(&sealed.auth_tag);

        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AdapterError::Authentication)?;

        Ok(plaintext.to_vec())
    }

    fn generate_ecdh_key_pair(
        &self,
    ) -> Result<KeyPair<Self::PublicKey, Self::PrivateKey>, AdapterError> {
        let seed = self.random_array::<ECDH_KEY_LEN>()?;
        let secret = StaticSecret::from(*seed);
        let public = PublicKey::from(&secret);
        Ok(KeyPair {
            public_key: EcdhPublicKey(public),
            private_key: EcdhPrivateKey(secret),
        })
    }

    fn export_public_key(&self, key: &Self::PublicKey) -> Result<Vec<u8>, AdapterError> {
        Ok(key.0.as_bytes().to_vec())
    }

    fn export_private_key(
        &self,
        key: &Self::PrivateKey,
    ) -> Result<Zeroizing<Vec<u8>>, AdapterError> {
        let bytes = Zeroizing::new(key.0.to_bytes());
        Ok(Zeroizing::new(bytes.to_vec()))
    }

    fn import_public_key(&self, bytes: &[u8]) -> Result<Self::PublicKey, AdapterError> {
        let raw = fixed_len::<ECDH_KEY_LEN>(bytes, "public key")?;
        Ok(EcdhPublicKey(PublicKey::from(raw)))
    }

    fn import_private_key(&self, bytes: &[u8]) -> Result<Self::PrivateKey, AdapterError> {
        let raw = Zeroizing::new(fixed_len::<ECDH_KEY_LEN>(bytes, "private key")?);
        Ok(EcdhPrivateKey(StaticSecret::from(*raw)))
    }

    fn derive_shared_secret(
        &self,
        private_key: &Self::PrivateKey,
        public_key: &Self::PublicKey,
    ) -> Result<Self::Key, AdapterError> {
        let shared = private_key.0.diffie_hellman(&public_key.0);

        // A low-order public key forces the output to a known value.
        if !shared.was_contributory() {
            return Err(AdapterError::KeyAgreement(
                "non-contributory shared secret".into(),
            ));
        }

        let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, &[]);
        let prk = salt.extract(shared.as_bytes());
        let info = [ECDH_INFO];
        let okm = prk
            .expand(&info, hkdf::HKDF_SHA256)
            .map_err(|_| AdapterError::KeyAgreement("hkdf expand failed".into()))?;

        let mut derived = [0u8; KEY_LEN];
        okm.fill(&mut derived)
            .map_err(|_| AdapterError::KeyAgreement("hkdf fill failed".into()))?;

        let key = AesKey::from_bytes(derived);
        derived.zeroize();
        Ok(key)
    }

    fn export_key(&self, key: &Self::Key) -> Result<Zeroizing<Vec<u8>>, AdapterError> {
        Ok(Zeroizing::new(key.bytes.to_vec()))
    }

    fn import_key(&self, bytes: &[u8]) -> Result<Self::Key, AdapterError> {
        let raw = fixed_len::<KEY_LEN>(bytes, "symmetric key")?;
        Ok(AesKey::from_bytes(raw))
    }

    fn derive_key_from_password(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self::Key, AdapterError> {
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| AdapterError::KeyDerivation("iterations must be non-zero".into()))?;

        let mut derived = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            password.as_bytes(),
            &mut derived,
        );

        let key = AesKey::from_bytes(derived);
        derived.zeroize();
        Ok(key)
    }
}
