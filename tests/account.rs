use vellum_core::{Account, AsymmetricCryptoManager, Collection, CollectionMeta, Error};

fn meta() -> CollectionMeta {
    CollectionMeta {
        collection_type: "COLTYPE".into(),
        name: "Journal".into(),
        description: None,
        color: None,
    }
}

// === Signup / login ===

#[test]
fn signup_then_login_recovers_the_identity() {
    let (account, payload) = Account::signup("alice", "alice@example.com", "hunter2 but long").unwrap();
    assert_eq!(payload.username, "alice");

    let salt = *account.salt();
    let encrypted_content = vellum_core::from_base64(&payload.encrypted_content).unwrap();

    let restored = Account::login("alice", "hunter2 but long", &salt, &encrypted_content).unwrap();
    assert_eq!(
        restored.identity().public_key(),
        account.identity().public_key()
    );

    // The login keypair is deterministic from the password-derived tree.
    assert_eq!(
        restored.login_crypto_manager().unwrap().public_key(),
        account.login_crypto_manager().unwrap().public_key()
    );
}

#[test]
fn wrong_password_fails_closed() {
    let (account, payload) = Account::signup("bob", "bob@example.com", "correct horse").unwrap();
    let salt = *account.salt();
    let encrypted_content = vellum_core::from_base64(&payload.encrypted_content).unwrap();

    let result = Account::login("bob", "incorrect horse", &salt, &encrypted_content);
    assert!(matches!(result, Err(Error::Integrity(_))));
}

#[test]
fn challenge_signature_verifies_against_login_pubkey() {
    let (account, payload) = Account::signup("carol", "carol@example.com", "pass phrase").unwrap();

    let challenge = b"server-challenge-0123456789abcdef";
    let signature = account.sign_challenge(challenge).unwrap();

    let login_pubkey: [u8; 32] = vellum_core::from_base64(&payload.login_pubkey)
        .unwrap()
        .try_into()
        .unwrap();
    AsymmetricCryptoManager::verify_detached(challenge, &signature, &login_pubkey).unwrap();
}

// === Password change ===

#[test]
fn password_change_rekeys_but_keeps_the_identity() {
    let (mut account, _) = Account::signup("dave", "dave@example.com", "old password").unwrap();
    let identity_before = account.identity().public_key();
    let old_login = account.login_crypto_manager().unwrap().public_key();

    let payload = account.change_password("new password").unwrap();

    assert_eq!(account.identity().public_key(), identity_before);
    // New salt, new login keypair, re-encrypted content.
    assert_ne!(
        account.login_crypto_manager().unwrap().public_key(),
        old_login
    );

    let salt: [u8; 16] = vellum_core::from_base64(&payload.salt).unwrap().try_into().unwrap();
    let encrypted_content = vellum_core::from_base64(&payload.encrypted_content).unwrap();
    let reopened = Account::login("dave", "new password", &salt, &encrypted_content).unwrap();
    assert_eq!(reopened.identity().public_key(), identity_before);
}

// === Persistence ===

#[test]
fn account_data_roundtrip() {
    let (mut account, _) = Account::signup("erin", "erin@example.com", "some password").unwrap();
    account.set_server_url(Some("https://sync.example.com".into()));

    let data = account.save().unwrap();
    let json = serde_json::to_string(&data).unwrap();
    let parsed: vellum_core::AccountData = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, data);

    // Restore is offline: no password, no argon2.
    let restored = Account::restore(&parsed).unwrap();
    assert_eq!(restored.username(), "erin");
    assert_eq!(restored.server_url(), Some("https://sync.example.com"));
    assert_eq!(
        restored.identity().public_key(),
        account.identity().public_key()
    );

    // And the restored account drives the same key hierarchy.
    assert_eq!(restored.save().unwrap(), data);
}

#[test]
fn restore_refuses_future_versions() {
    let (account, _) = Account::signup("frank", "frank@example.com", "some password").unwrap();
    let mut data = account.save().unwrap();
    data.version = vellum_core::CURRENT_VERSION + 1;
    assert!(matches!(Account::restore(&data), Err(Error::Version { .. })));
}

// === End to end ===

#[test]
fn account_drives_collections() {
    let (account, _) = Account::signup("grace", "grace@example.com", "some password").unwrap();
    let main = account.main_crypto_manager().unwrap();

    let col = Collection::create(&main, &meta(), b"dear diary").unwrap();
    col.verify(&main).unwrap();
    assert_eq!(col.decrypt_content(&main).unwrap(), b"dear diary");

    account.logout();
}
