//! Two parties agree on a key, exchange a message, and persist it.
//! Run with: `cargo run --example pairwise_exchange`
//!
//! - Alice and Bob each generate a key pair and swap public keys
//! - Alice encrypts for Bob and the payload is split for storage
//! - Bob reloads the stored record and decrypts it
//! - A decryption with the wrong key is logged to an audit file

use std::sync::Arc;

use cipherlink::audit::FileAuditSink;
use cipherlink::{
    prepare_for_storage, CoreConfig, EncryptionEngine, KeyAgreement, RingAdapter, StorageRecord,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup
    let adapter = Arc::new(RingAdapter::new());
    let config = CoreConfig::default();
    let agreement = KeyAgreement::new(Arc::clone(&adapter), &config);

    let audit_path = std::env::temp_dir().join("cipherlink_audit.jsonl");
    let engine = EncryptionEngine::new(Arc::clone(&adapter), &config)
        .with_audit_sink(Arc::new(FileAuditSink::new(&audit_path)?));

    // 2. Identities
    let alice = agreement.generate_key_pair()?;
    let bob = agreement.generate_key_pair()?;
    println!(
        "alice registration id {}, bob registration id {}",
        agreement.generate_registration_id()?,
        agreement.generate_registration_id()?
    );

    // 3. Both sides derive the conversation key
    let alice_key = agreement.perform_key_agreement(&alice.private_key, &bob.public_key)?;
    let bob_key = agreement.perform_key_agreement(&bob.private_key, &alice.public_key)?;
    let key_id = agreement.generate_key_id()?;

    // 4. Alice sends, the server stores
    let payload = engine.encrypt("see you at noon", &alice_key, &key_id)?;
    let stored = prepare_for_storage(&payload).to_json()?;
    println!("stored record: {stored}");

    // 5. Bob loads and reads
    let loaded = StorageRecord::from_json(&stored)?.into_payload()?;
    println!("bob reads: {}", engine.decrypt(&loaded, &bob_key)?);

    // 6. A stranger cannot
    let eve = agreement.generate_key_pair()?;
    let eve_key = agreement.perform_key_agreement(&eve.private_key, &alice.public_key)?;
    if let Err(error) = engine.decrypt(&loaded, &eve_key) {
        println!("eve: {error}");
    }
    println!("failure detail written to: {}", audit_path.display());

    Ok(())
}
