//! Trusted diagnostics channel.
//!
//! Callers only ever see a generic message when decryption fails. The
//! precise reason (bad base64, wrong IV length, tag mismatch, ...) is
//! recorded here instead, for operators. Sinks are injected by the host and
//! owned by it; the core holds no global sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The core operation a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Encrypt,
    Decrypt,
    KeyAgreement,
    KeyDerivation,
    KeyImport,
}

/// One failed operation, with the detail withheld from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation: Operation,
    /// The key id involved, when the operation has one.
    pub key_id: Option<String>,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn now(operation: Operation, key_id: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            operation,
            key_id: key_id.map(str::to_owned),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A sink that receives audit records. Implement this to forward records
/// to a file, a log pipeline or another trusted store.
///
/// Sinks are shared between concurrent engine calls and must synchronise
/// internally.
pub trait AuditSink: Send + Sync {
    /// Called once for every failed operation.
    fn record(&self, record: AuditRecord);
}

// ---------------------------------------------------------------------------
// Built-in sink: memory
// ---------------------------------------------------------------------------

/// Append-only in-memory sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the records so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
#[derive(Debug)]
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, record: AuditRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(error) => {
                tracing::warn!(
                    %error,
                    operation = ?record.operation,
                    "failed to serialize audit record"
                );
                return;
            }
        };
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(error) = writeln!(file, "{line}").and_then(|_| file.flush()) {
            tracing::warn!(%error, "failed to write audit record");
        }
    }
}
