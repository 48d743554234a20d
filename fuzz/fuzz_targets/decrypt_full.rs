#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use vellum_core::{AsymmetricCryptoManager, CryptoManager, CURRENT_VERSION};

static MAIN: Lazy<CryptoManager> =
    Lazy::new(|| CryptoManager::main(&[7u8; 32], CURRENT_VERSION).unwrap());

static IDENTITY: Lazy<AsymmetricCryptoManager> =
    Lazy::new(|| AsymmetricCryptoManager::from_seed(&[9u8; 32]));

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split = (data[0] as usize) % (data.len() + 1);
    let (ct, ad) = data.split_at(split);

    let _ = MAIN.decrypt(ct, Some(ad));
    let _ = IDENTITY.decrypt_verify(ct, &IDENTITY.public_key());

    if ad.len() >= 16 {
        let mut mac = [0u8; 16];
        mac.copy_from_slice(&ad[..16]);
        let _ = MAIN.decrypt_detached(ct, &mac, None);
    }
});
