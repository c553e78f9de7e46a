use std::path::Path;

use super::encryption::{self, KdfParams};
use super::format::{self, FileHeader};
use crate::errors::CoreError;
use crate::models::database::Database;

/// Save and load the whole [`Database`] as one encrypted snapshot.
///
/// Database → bincode → AES-256-GCM(Argon2id(passphrase)) → `FNFO` file bytes.
pub struct StorageManager;

impl StorageManager {
    pub fn save_to_bytes(db: &Database, passphrase: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_to_bytes_with(db, passphrase, KdfParams::default())
    }

    /// Like [`save_to_bytes`](Self::save_to_bytes) with explicit KDF cost.
    pub fn save_to_bytes_with(
        db: &Database,
        passphrase: &str,
        kdf_params: KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        kdf_params.validate()?;

        let plaintext = bincode::serialize(db)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize database: {e}")))?;

        // Fresh salt and nonce on every save.
        let header = FileHeader {
            version: format::CURRENT_VERSION,
            kdf_params,
            salt: encryption::generate_salt()?,
            nonce: encryption::generate_nonce()?,
            ciphertext_len: 0,
        };
        let key = encryption::derive_key(passphrase, &header.salt, &header.kdf_params)?;
        let ciphertext = encryption::encrypt(&plaintext, &key, &header.nonce)?;

        Ok(format::write_file(&header, &ciphertext))
    }

    pub fn load_from_bytes(data: &[u8], passphrase: &str) -> Result<Database, CoreError> {
        let (header, ciphertext) = format::read_file(data)?;
        let key = encryption::derive_key(passphrase, &header.salt, &header.kdf_params)?;
        let plaintext = encryption::decrypt(ciphertext, &key, &header.nonce)?;

        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize database: {e}")))
    }

    /// Writes `<path>.tmp` first, then renames it over `path`.
    pub fn save_to_file(
        db: &Database,
        path: impl AsRef<Path>,
        passphrase: &str,
    ) -> Result<(), CoreError> {
        let path = path.as_ref();
        let bytes = Self::save_to_bytes(db, passphrase)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>, passphrase: &str) -> Result<Database, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes, passphrase)
    }
}
