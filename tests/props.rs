use proptest::prelude::*;

use vellum_core::{
    pretty_fingerprint, AsymmetricCryptoManager, CryptoManager, Revision, CURRENT_VERSION,
};

fn manager(key: [u8; 32]) -> CryptoManager {
    CryptoManager::main(&key, CURRENT_VERSION).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encrypt_decrypt_roundtrip(
        key in any::<[u8; 32]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        ad in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let cm = manager(key);
        let ct = cm.encrypt(&plaintext, Some(ad.as_slice())).unwrap();
        prop_assert_eq!(cm.decrypt(&ct, Some(ad.as_slice())).unwrap(), plaintext);
    }

    #[test]
    fn mismatched_additional_data_fails(
        key in any::<[u8; 32]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..256),
        ad in proptest::collection::vec(any::<u8>(), 1..64),
        other in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        prop_assume!(ad != other);
        let cm = manager(key);
        let ct = cm.encrypt(&plaintext, Some(ad.as_slice())).unwrap();
        prop_assert!(cm.decrypt(&ct, Some(other.as_slice())).is_err());
    }

    #[test]
    fn created_revisions_verify(
        key in any::<[u8; 32]>(),
        content in proptest::collection::vec(any::<u8>(), 0..256),
        meta in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..64)),
        ad in proptest::collection::vec(any::<u8>(), 0..32),
        deleted in any::<bool>(),
    ) {
        let cm = manager(key);
        let rev = Revision::create(&cm, &[ad.as_slice()], meta.as_deref(), &content, deleted).unwrap();
        prop_assert!(rev.verify(&cm, &[ad.as_slice()]).is_ok());
        prop_assert_eq!(rev.decrypt_content(&cm).unwrap(), content);
    }

    #[test]
    fn detached_roundtrip(
        key in any::<[u8; 32]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let cm = manager(key);
        let (mac, ct) = cm.encrypt_detached(&plaintext, None).unwrap();
        prop_assert_eq!(cm.decrypt_detached(&ct, &mac, None).unwrap(), plaintext);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sign_verify_roundtrip(
        seed in any::<[u8; 32]>(),
        message in proptest::collection::vec(any::<u8>(), 0..512),
        flip in 0usize..64,
    ) {
        let signer = AsymmetricCryptoManager::from_seed(&seed);
        let signature = signer.sign_detached(&message);
        prop_assert!(AsymmetricCryptoManager::verify_detached(
            &message, &signature, &signer.public_key()
        ).is_ok());

        let mut forged = signature;
        forged[flip % 64] ^= 0x01;
        prop_assert!(AsymmetricCryptoManager::verify_detached(
            &message, &forged, &signer.public_key()
        ).is_err());
    }

    #[test]
    fn encrypt_sign_roundtrip(
        sender_seed in any::<[u8; 32]>(),
        recipient_seed in any::<[u8; 32]>(),
        message in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(sender_seed != recipient_seed);
        let sender = AsymmetricCryptoManager::from_seed(&sender_seed);
        let recipient = AsymmetricCryptoManager::from_seed(&recipient_seed);

        let wrapped = sender.encrypt_sign(&message, &recipient.public_key()).unwrap();
        let opened = recipient.decrypt_verify(&wrapped, &sender.public_key()).unwrap();
        prop_assert_eq!(opened, message);
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive(
        key in any::<[u8; 32]>(),
        flip in 0usize..32,
    ) {
        let fp = pretty_fingerprint(&key, "   ");
        prop_assert_eq!(&fp, &pretty_fingerprint(&key, "   "));

        let mut other = key;
        other[flip] ^= 0x01;
        prop_assert_ne!(fp, pretty_fingerprint(&other, "   "));
    }
}
