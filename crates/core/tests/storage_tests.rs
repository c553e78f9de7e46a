// ═══════════════════════════════════════════════════════════════════
// Storage Tests: encryption, file format, StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::{NaiveDate, TimeZone, Utc};
use finfolio_core::errors::CoreError;
use finfolio_core::models::database::Database;
use finfolio_core::models::deposit::{Compounding, DepositSaving, ProductType};
use finfolio_core::models::money::Currency;
use finfolio_core::models::user::User;
use finfolio_core::storage::encryption::{
    decrypt, derive_key, encrypt, generate_nonce, generate_salt, KdfParams,
};
use finfolio_core::storage::format::{self, FileHeader, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use finfolio_core::storage::manager::StorageManager;

/// Cheap KDF settings so tests stay fast.
fn fast_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn sample_db() -> Database {
    let mut db = Database::default();
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
    let user_id = db.next_id();
    db.users.push(User {
        id: user_id,
        username: "minji".into(),
        email: "minji@example.com".into(),
        nickname: "Minji".into(),
        password_hash: "$argon2id$placeholder".into(),
        profile_image: None,
        is_staff: false,
        is_superuser: false,
        date_joined: now,
        last_login: None,
    });
    let deposit_id = db.next_id();
    db.deposits.push(DepositSaving {
        id: deposit_id,
        user_id,
        product_type: ProductType::Deposit,
        bank_name: "KB".into(),
        product_name: "Star Deposit".into(),
        principal_amount: 10_000_000.0,
        annual_rate: 3.5,
        compounding: Compounding::Monthly,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        maturity_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        currency: Currency::KRW,
        current_value_manual: None,
        created_at: now,
        updated_at: now,
    });
    db.settings.base_currency = Currency::USD;
    db.rate_cache.set(
        Currency::KRW,
        Currency::USD,
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        0.00068,
    );
    db
}

// ═══════════════════════════════════════════════════════════════════
// KdfParams
// ═══════════════════════════════════════════════════════════════════

mod kdf_params {
    use super::*;

    #[test]
    fn default_values() {
        let p = KdfParams::default();
        assert_eq!(p.memory_cost, 65_536);
        assert_eq!(p.time_cost, 3);
        assert_eq!(p.parallelism, 4);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_memory() {
        let p = KdfParams {
            memory_cost: 4,
            ..fast_params()
        };
        assert!(matches!(p.validate(), Err(CoreError::InvalidFileFormat(_))));

        let p = KdfParams {
            memory_cost: 2_000_000,
            ..fast_params()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_zero_time_cost_and_parallelism() {
        assert!(KdfParams {
            time_cost: 0,
            ..fast_params()
        }
        .validate()
        .is_err());
        assert!(KdfParams {
            parallelism: 0,
            ..fast_params()
        }
        .validate()
        .is_err());
        assert!(KdfParams {
            parallelism: 17,
            ..fast_params()
        }
        .validate()
        .is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Key Derivation & AES-GCM
// ═══════════════════════════════════════════════════════════════════

mod crypto {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; 16];
        let a = derive_key("hunter2", &salt, &fast_params()).unwrap();
        let b = derive_key("hunter2", &salt, &fast_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_passphrase_or_salt_changes_key() {
        let salt = [7u8; 16];
        let base = derive_key("hunter2", &salt, &fast_params()).unwrap();
        assert_ne!(base, derive_key("hunter3", &salt, &fast_params()).unwrap());
        assert_ne!(base, derive_key("hunter2", &[8u8; 16], &fast_params()).unwrap());
    }

    #[test]
    fn encrypt_then_decrypt() {
        let key = [3u8; 32];
        let nonce = [9u8; 12];
        let ciphertext = encrypt(b"portfolio", &key, &nonce).unwrap();
        assert_ne!(ciphertext.as_slice(), b"portfolio");
        // 16-byte GCM tag
        assert_eq!(ciphertext.len(), b"portfolio".len() + 16);
        assert_eq!(decrypt(&ciphertext, &key, &nonce).unwrap(), b"portfolio");
    }

    #[test]
    fn wrong_key_is_a_decryption_error() {
        let ciphertext = encrypt(b"portfolio", &[3u8; 32], &[9u8; 12]).unwrap();
        let result = decrypt(&ciphertext, &[4u8; 32], &[9u8; 12]);
        assert!(matches!(result, Err(CoreError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let mut ciphertext = encrypt(b"portfolio", &[3u8; 32], &[9u8; 12]).unwrap();
        ciphertext[0] ^= 0xFF;
        assert!(matches!(
            decrypt(&ciphertext, &[3u8; 32], &[9u8; 12]),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn random_salts_and_nonces_differ() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
        assert_ne!(generate_nonce().unwrap(), generate_nonce().unwrap());
    }
}

// ═══════════════════════════════════════════════════════════════════
// File Format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    fn header() -> FileHeader {
        FileHeader {
            version: CURRENT_VERSION,
            kdf_params: fast_params(),
            salt: [1u8; 16],
            nonce: [2u8; 12],
            ciphertext_len: 0,
        }
    }

    #[test]
    fn layout_and_read_back() {
        let bytes = format::write_file(&header(), b"ciphertext");
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);
        assert_eq!(bytes.len(), HEADER_SIZE + b"ciphertext".len());

        let (parsed, ciphertext) = format::read_file(&bytes).unwrap();
        assert_eq!(parsed.version, CURRENT_VERSION);
        assert_eq!(parsed.kdf_params, fast_params());
        assert_eq!(parsed.salt, [1u8; 16]);
        assert_eq!(parsed.nonce, [2u8; 12]);
        assert_eq!(parsed.ciphertext_len, 10);
        assert_eq!(ciphertext, b"ciphertext");
    }

    #[test]
    fn magic_is_fnfo() {
        assert_eq!(MAGIC, b"FNFO");
    }

    #[test]
    fn too_small() {
        let result = format::read_file(b"FNFO");
        assert!(matches!(result, Err(CoreError::InvalidFileFormat(_))));
    }

    #[test]
    fn wrong_magic() {
        let mut bytes = format::write_file(&header(), b"x");
        bytes[0..4].copy_from_slice(b"SVTK");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut h = header();
        h.version = CURRENT_VERSION + 1;
        let bytes = format::write_file(&h, b"x");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::UnsupportedVersion(v)) if v == CURRENT_VERSION + 1
        ));
    }

    #[test]
    fn hostile_kdf_params_rejected() {
        let mut h = header();
        h.kdf_params.memory_cost = u32::MAX;
        let bytes = format::write_file(&h, b"x");
        assert!(matches!(
            format::read_file(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn truncated_ciphertext() {
        let bytes = format::write_file(&header(), b"0123456789");
        let result = format::read_file(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(CoreError::InvalidFileFormat(msg)) if msg.contains("truncated")));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut bytes = format::write_file(&header(), b"abc");
        bytes.extend_from_slice(b"garbage");
        let (_, ciphertext) = format::read_file(&bytes).unwrap();
        assert_eq!(ciphertext, b"abc");
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager
// ═══════════════════════════════════════════════════════════════════

mod storage_manager {
    use super::*;

    #[test]
    fn save_load_empty_database() {
        let db = Database::default();
        let bytes = StorageManager::save_to_bytes_with(&db, "pass", fast_params()).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes, "pass").unwrap();
        assert!(loaded.users.is_empty());
        assert_eq!(loaded.settings.base_currency, Currency::KRW);
    }

    #[test]
    fn save_load_keeps_everything() {
        let db = sample_db();
        let bytes = StorageManager::save_to_bytes_with(&db, "pass", fast_params()).unwrap();
        let mut loaded = StorageManager::load_from_bytes(&bytes, "pass").unwrap();

        assert_eq!(loaded.users, db.users);
        assert_eq!(loaded.deposits, db.deposits);
        assert_eq!(loaded.settings.base_currency, Currency::USD);
        assert_eq!(
            loaded.rate_cache.get(
                Currency::KRW,
                Currency::USD,
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
            ),
            Some(0.00068)
        );
        // The id counter survives, so new rows never reuse ids.
        assert_eq!(loaded.next_id(), 3);
    }

    #[test]
    fn every_save_uses_a_fresh_salt_and_nonce() {
        let db = sample_db();
        let a = StorageManager::save_to_bytes_with(&db, "pass", fast_params()).unwrap();
        let b = StorageManager::save_to_bytes_with(&db, "pass", fast_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let bytes = StorageManager::save_to_bytes_with(&sample_db(), "right", fast_params()).unwrap();
        let result = StorageManager::load_from_bytes(&bytes, "wrong");
        assert!(matches!(result, Err(CoreError::Decryption)));
    }

    #[test]
    fn corrupted_data_fails() {
        let mut bytes =
            StorageManager::save_to_bytes_with(&sample_db(), "pass", fast_params()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(StorageManager::load_from_bytes(&bytes, "pass").is_err());
    }

    #[test]
    fn invalid_params_refused_on_save() {
        let params = KdfParams {
            time_cost: 0,
            ..fast_params()
        };
        assert!(StorageManager::save_to_bytes_with(&Database::default(), "pass", params).is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finfolio.db");

        StorageManager::save_to_file(&sample_db(), &path, "pass").unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("finfolio.db.tmp").exists());

        let loaded = StorageManager::load_from_file(&path, "pass").unwrap();
        assert_eq!(loaded.deposits.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StorageManager::load_from_file(dir.path().join("nope.db"), "pass");
        assert!(matches!(result, Err(CoreError::FileIO(_))));
    }
}
