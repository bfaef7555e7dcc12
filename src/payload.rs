//! Encrypted payloads and their storage representation.
//!
//! An [`EncryptedPayload`] is ciphertext plus the metadata needed to decrypt
//! it. For persistence the two are split into a [`StorageRecord`] with two
//! independently storable fields, and recombined with
//! [`reconstruct_payload`], which refuses malformed metadata outright.
//!
//! ## Wire shape
//!
//! ```text
//! {
//!   "encryptedContent": "<base64>",
//!   "encryptionMetadata": {
//!     "mode": "e2ee" | "server",
//!     "protocol": "aes-256-gcm" | "signal_v3",
//!     "keyId": "<text>",
//!     "iv": "<base64, 12 bytes>",
//!     "authTag": "<base64, 16 bytes>"
//!   }
//! }
//! ```
//!
//! Every host platform reads and writes exactly these field names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Whose key protects the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EncryptionMode {
    /// A per-conversation secret shared only by the participants.
    #[default]
    #[serde(rename = "e2ee")]
    E2ee,
    /// A key held by the server, for data at rest.
    #[serde(rename = "server")]
    Server,
}

impl EncryptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E2ee => "e2ee",
            Self::Server => "server",
        }
    }
}

impl FromStr for EncryptionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "e2ee" => Ok(Self::E2ee),
            "server" => Ok(Self::Server),
            other => Err(CoreError::InvalidMetadata(format!("unknown mode: {other}"))),
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm identifier carried in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// Reserved for a ratcheting session protocol. The engine does not
    /// implement it and rejects payloads that carry it.
    #[serde(rename = "signal_v3")]
    SignalV3,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::SignalV3 => "signal_v3",
        }
    }
}

impl FromStr for Protocol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "signal_v3" => Ok(Self::SignalV3),
            other => Err(CoreError::InvalidMetadata(format!(
                "unknown protocol: {other}"
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Self-describing envelope for one ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub mode: EncryptionMode,
    pub protocol: Protocol,
    /// Looks up the decryption key out-of-band. Never the key itself.
    pub key_id: String,
    /// Base64 of the 12 byte IV.
    pub iv: String,
    /// Base64 of the 16 byte GCM tag.
    pub auth_tag: String,
}

/// Ciphertext and the metadata it cannot be decrypted without.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Base64 ciphertext, without the tag.
    pub ciphertext: String,
    pub metadata: EncryptionMetadata,
}

impl EncryptedPayload {
    /// Replace the mode stamped by the engine.
    pub fn with_mode(mut self, mode: EncryptionMode) -> Self {
        self.metadata.mode = mode;
        self
    }
}

/// The flattened, persistable form of an [`EncryptedPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub encrypted_content: String,
    /// Kept untyped: it comes back from storage and must pass
    /// [`validate_metadata`] before it is trusted.
    pub encryption_metadata: Value,
}

impl StorageRecord {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::InvalidMetadata(format!("serialization failed: {e}")))
    }

    /// Parse a record from JSON. Only the outer shape is checked here;
    /// [`StorageRecord::into_payload`] validates the metadata.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidMetadata(format!("malformed storage record: {e}")))
    }

    pub fn into_payload(self) -> Result<EncryptedPayload> {
        reconstruct_payload(&self.encrypted_content, &self.encryption_metadata)
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

fn require_text<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(CoreError::InvalidMetadata(format!("{name} must be text"))),
        None => Err(CoreError::InvalidMetadata(format!("missing {name}"))),
    }
}

/// Structurally check `candidate` and narrow it to [`EncryptionMetadata`].
///
/// This is a shape gate only. No field is decoded and nothing
/// cryptographic is checked. Unknown extra fields are ignored.
pub fn parse_metadata(candidate: &Value) -> Result<EncryptionMetadata> {
    let fields = candidate
        .as_object()
        .ok_or_else(|| CoreError::InvalidMetadata("metadata must be an object".into()))?;

    let mode = require_text(fields, "mode")?.parse::<EncryptionMode>()?;
    let protocol = require_text(fields, "protocol")?.parse::<Protocol>()?;
    let key_id = require_text(fields, "keyId")?;
    let iv = require_text(fields, "iv")?;
    let auth_tag = require_text(fields, "authTag")?;

    Ok(EncryptionMetadata {
        mode,
        protocol,
        key_id: key_id.to_owned(),
        iv: iv.to_owned(),
        auth_tag: auth_tag.to_owned(),
    })
}

/// Whether `candidate` is well-formed metadata.
pub fn validate_metadata(candidate: &Value) -> bool {
    parse_metadata(candidate).is_ok()
}

/// Flatten a payload into its two storable fields. Pure; no I/O.
pub fn prepare_for_storage(payload: &EncryptedPayload) -> StorageRecord {
    let metadata = &payload.metadata;
    StorageRecord {
        encrypted_content: payload.ciphertext.clone(),
        encryption_metadata: json!({
            "mode": metadata.mode.as_str(),
            "protocol": metadata.protocol.as_str(),
            "keyId": metadata.key_id,
            "iv": metadata.iv,
            "authTag": metadata.auth_tag,
        }),
    }
}

/// Recombine stored fields into a payload.
///
/// Fails with [`CoreError::InvalidMetadata`] if the metadata does not pass
/// [`validate_metadata`]; nothing is defaulted.
pub fn reconstruct_payload(
    encrypted_content: &str,
    encryption_metadata: &Value,
) -> Result<EncryptedPayload> {
    let metadata = parse_metadata(encryption_metadata)?;
    Ok(EncryptedPayload {
        ciphertext: encrypted_content.to_owned(),
        metadata,
    })
}
