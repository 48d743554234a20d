#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use vellum_core::wire::{collection_from_wire, CollectionWire};
use vellum_core::{CryptoManager, CURRENT_VERSION};

static MAIN: Lazy<CryptoManager> =
    Lazy::new(|| CryptoManager::main(&[0u8; 32], CURRENT_VERSION).unwrap());

fuzz_target!(|data: &[u8]| {
    let Ok(wire) = serde_json::from_slice::<CollectionWire>(data) else {
        return;
    };
    let Ok(collection) = collection_from_wire(&wire) else {
        return;
    };

    // Anything that parsed must still fail closed under verification with
    // an unrelated key, never panic.
    let _ = collection.verify(&MAIN);
    let _ = collection.decrypt_meta(&MAIN);
    let _ = collection.decrypt_content(&MAIN);
});
