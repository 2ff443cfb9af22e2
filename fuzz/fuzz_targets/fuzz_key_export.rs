#![no_main]

use libfuzzer_sys::fuzz_target;
use vrfgen_core::{EncryptedKeyExport, KeyDecryptor, KeyFile, KeystoreDecryptor, PasswordKeyDecryptor};

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON must be rejected cleanly, never panic
    if let Ok(export) = EncryptedKeyExport::from_json(data) {
        let _ = export.public_key();

        // Skip inputs that would ask for large Argon2 memory
        let params = &export.vrf_key.crypto.kdfparams;
        if params.m_cost <= 64 && params.t_cost <= 2 && params.p_cost <= 1 {
            let _ = PasswordKeyDecryptor.decrypt(&export, "password");
        }

        // Serialization should round-trip
        if let Ok(json) = export.to_json_pretty() {
            let again = EncryptedKeyExport::from_json(json.as_bytes()).unwrap();
            assert_eq!(again.public_key, export.public_key);
        }
    }

    if let Ok(KeyFile::Chainlink(export)) = KeyFile::from_json(data) {
        let _ = export.public_key();

        // Same for scrypt
        let params = &export.vrf_key.crypto.kdfparams;
        if params.n <= 1024 && params.r <= 8 && params.p <= 1 {
            let _ = KeystoreDecryptor.decrypt(&export, "password");
        }
    }
});
