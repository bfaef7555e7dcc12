use std::sync::Arc;

use cipherlink::{CoreConfig, CoreError, CryptoAdapter, EncryptionEngine, RingAdapter};
use proptest::prelude::*;

fn setup() -> (Arc<RingAdapter>, EncryptionEngine<RingAdapter>) {
    let adapter = Arc::new(RingAdapter::new());
    let engine = EncryptionEngine::new(Arc::clone(&adapter), &CoreConfig::default());
    (adapter, engine)
}

#[test]
fn test_hello_scenario() {
    let (adapter, engine) = setup();
    let k1 = adapter.import_key(&adapter.generate_random_bytes(32).unwrap()).unwrap();
    let k2 = adapter.import_key(&adapter.generate_random_bytes(32).unwrap()).unwrap();

    // 1. Encrypt with K1.
    let payload = engine.encrypt("hello", &k1, "k1").unwrap();
    assert_eq!(payload.metadata.key_id, "k1");
    assert_ne!(payload.ciphertext, "hello");

    // 2. K1 opens it.
    assert_eq!(engine.decrypt(&payload, &k1).unwrap(), "hello");

    // 3. K2 does not.
    assert!(matches!(
        engine.decrypt(&payload, &k2),
        Err(CoreError::DecryptionFailure)
    ));
}

#[test]
fn test_multibyte_text_roundtrip() {
    let (adapter, engine) = setup();
    let key = adapter.import_key(&[9u8; 32]).unwrap();
    let text = "Привет, 世界! 👋\r\n";

    let payload = engine.encrypt(text, &key, "k").unwrap();
    assert_eq!(engine.decrypt(&payload, &key).unwrap(), text);
}

#[test]
fn test_large_payload_roundtrip() {
    let (adapter, engine) = setup();
    let key = adapter.import_key(&[1u8; 32]).unwrap();
    let text = "x".repeat(256 * 1024);

    let payload = engine.encrypt(&text, &key, "big").unwrap();
    assert_eq!(engine.decrypt(&payload, &key).unwrap(), text);
}

proptest! {
    #[test]
    fn prop_decrypt_inverts_encrypt(text in any::<String>(), key_id in "[A-Za-z0-9+/=]{0,24}") {
        let (adapter, engine) = setup();
        let key = adapter.import_key(&[7u8; 32]).unwrap();

        let payload = engine.encrypt(&text, &key, &key_id).unwrap();
        prop_assert_eq!(&payload.metadata.key_id, &key_id);
        prop_assert_eq!(engine.decrypt(&payload, &key).unwrap(), text);
    }
}
