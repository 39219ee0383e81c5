//! Keystore - the mnemonic at rest, encrypted under a password.
//!
//! ```text
//! <dir>/EthereumWallet_2026-10-19-14-03-27-3735928559.json
//! {
//!   "encryptedPayload": "<base64: version ‖ salt ‖ nonce ‖ ciphertext+tag>",
//!   "createdAt": "2026-10-19T14:03:27.512Z"
//! }
//! ```
//!
//! Files are never overwritten. Each record is written to a temporary file,
//! synced, then hard-linked under its final name; linking fails if the name is
//! taken, in which case a new random suffix is drawn.

mod crypto;

pub use crypto::PAYLOAD_VERSION;

use crate::mnemonic::Mnemonic;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default filename prefix.
pub const DEFAULT_PREFIX: &str = "EthereumWallet";

const EXTENSION: &str = "json";
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("Decryption failed: wrong password or tampered keystore")]
    DecryptionFailed,

    #[error("Keystore decrypted but does not hold a valid mnemonic")]
    CorruptedMnemonic,

    #[error("Keystore I/O: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed keystore record: {0}")]
    MalformedRecord(String),

    #[error("Invalid keystore filename: {0}")]
    InvalidFilename(String),

    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// On-disk record. Unknown or missing fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeystoreRecord {
    pub encrypted_payload: String,
    pub created_at: DateTime<Utc>,
}

/// Where records live. Names are plain filenames, already validated.
pub trait KeystoreStorage: Send + Sync {
    /// Store `bytes` under `name`; `ErrorKind::AlreadyExists` if taken.
    /// A crash must never leave a partial file under `name`.
    fn create_new(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    fn list(&self) -> io::Result<Vec<String>>;
}

/// Directory-backed storage.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeystoreStorage for FsStorage {
    fn create_new(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(name);
        let temp = self.dir.join(format!(".{name}.{:08x}.tmp", rand::thread_rng().gen::<u32>()));

        let written = (|| {
            let mut file = fs::OpenOptions::new().write(true).create_new(true).open(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::hard_link(&temp, &target)
        })();
        if let Err(e) = fs::remove_file(&temp) {
            debug!(path = %temp.display(), error = %e, "temp cleanup failed");
        }
        written?;

        // Persist the new directory entry; not every platform allows opening a directory
        if let Ok(dir) = fs::File::open(&self.dir) {
            if let Err(e) = dir.sync_all() {
                debug!(path = %self.dir.display(), error = %e, "directory sync failed");
            }
        }
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.dir.join(name))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') && name.ends_with(&format!(".{EXTENSION}")) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Encrypts mnemonics into records and back.
#[derive(Debug, Clone)]
pub struct Keystore<S = FsStorage> {
    storage: S,
    prefix: String,
}

impl Keystore<FsStorage> {
    pub fn open(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self::with_storage(FsStorage::new(dir), prefix)
    }
}

impl<S: KeystoreStorage> Keystore<S> {
    pub fn with_storage(storage: S, prefix: impl Into<String>) -> Self {
        Self { storage, prefix: prefix.into() }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encrypt and write a new record. Returns the filename written.
    pub fn encrypt_and_store(&self, mnemonic: &Mnemonic, password: &str) -> Result<String, KeystoreError> {
        let phrase = zeroize::Zeroizing::new(mnemonic.phrase());
        let created_at = Utc::now();
        let record = KeystoreRecord {
            encrypted_payload: crypto::seal(phrase.as_bytes(), password)?,
            created_at,
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| KeystoreError::MalformedRecord(format!("serialize: {e}")))?;

        let mut rng = rand::thread_rng();
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = keystore_filename(&self.prefix, &created_at, rng.gen());
            match self.storage.create_new(&name, &bytes) {
                Ok(()) => {
                    info!(file = %name, "keystore written");
                    return Ok(name);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(file = %name, attempt, "keystore name taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(KeystoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free keystore name after {MAX_NAME_ATTEMPTS} attempts"),
        )))
    }

    /// Read, decrypt and validate a record.
    pub fn load_and_decrypt(&self, filename: &str, password: &str) -> Result<Mnemonic, KeystoreError> {
        validate_filename(filename)?;
        let bytes = self.storage.read(filename)?;
        let record: KeystoreRecord = serde_json::from_slice(&bytes)
            .map_err(|e| KeystoreError::MalformedRecord(e.to_string()))?;

        let plaintext = crypto::open(&record.encrypted_payload, password)?;
        let phrase = std::str::from_utf8(&plaintext).map_err(|_| KeystoreError::CorruptedMnemonic)?;
        let mnemonic = Mnemonic::parse(phrase).map_err(|_| KeystoreError::CorruptedMnemonic)?;
        info!(file = %filename, "keystore unlocked");
        Ok(mnemonic)
    }

    /// Keystore filenames, sorted.
    pub fn list(&self) -> Result<Vec<String>, KeystoreError> {
        Ok(self.storage.list()?)
    }
}

/// Encrypt `mnemonic` into a new file in `dir` with the default prefix.
pub fn encrypt_and_store(mnemonic: &Mnemonic, password: &str, dir: &Path) -> Result<String, KeystoreError> {
    Keystore::open(dir, DEFAULT_PREFIX).encrypt_and_store(mnemonic, password)
}

/// Load `filename` from `dir` and decrypt it.
pub fn load_and_decrypt(filename: &str, dir: &Path, password: &str) -> Result<Mnemonic, KeystoreError> {
    Keystore::open(dir, DEFAULT_PREFIX).load_and_decrypt(filename, password)
}

/// `<prefix>_<Y>-<M>-<D>-<h>-<m>-<s>-<suffix>.json`
pub fn keystore_filename(prefix: &str, at: &DateTime<Utc>, suffix: u32) -> String {
    format!("{prefix}_{}-{suffix}.{EXTENSION}", at.format("%Y-%m-%d-%H-%M-%S"))
}

/// Plain filename only: no separators, no parent references, no hidden files.
pub fn validate_filename(name: &str) -> Result<(), KeystoreError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
        || name.starts_with('.');
    if bad {
        return Err(KeystoreError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory storage that pretends the first `taken` names already exist.
    struct CrowdedStorage {
        taken: Mutex<usize>,
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl CrowdedStorage {
        fn new(taken: usize) -> Self {
            Self { taken: Mutex::new(taken), files: Mutex::new(HashMap::new()) }
        }
    }

    impl KeystoreStorage for CrowdedStorage {
        fn create_new(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
            let mut taken = self.taken.lock().unwrap();
            if *taken > 0 {
                *taken -= 1;
                return Err(io::Error::new(io::ErrorKind::AlreadyExists, "taken"));
            }
            self.files.lock().unwrap().insert(name.to_string(), bytes.to_vec());
            Ok(())
        }

        fn read(&self, name: &str) -> io::Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
        }

        fn list(&self) -> io::Result<Vec<String>> {
            let mut names: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    #[test]
    fn test_filename_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            keystore_filename("EthereumWallet", &at, 42),
            "EthereumWallet_2026-03-07-09-05-01-42.json"
        );
    }

    #[test]
    fn test_filename_validation() {
        assert!(validate_filename("EthereumWallet_2026-03-07-09-05-01-42.json").is_ok());
        for bad in ["", "../x.json", "a/b.json", "a\\b.json", ".hidden.json", "x..json", "a\0b"] {
            assert!(
                matches!(validate_filename(bad), Err(KeystoreError::InvalidFilename(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_collision_retries_with_new_name() {
        let keystore = Keystore::with_storage(CrowdedStorage::new(3), "W");
        let mnemonic = Mnemonic::generate().unwrap();
        let name = keystore.encrypt_and_store(&mnemonic, "pw").unwrap();
        assert!(name.starts_with("W_"));
        assert_eq!(keystore.list().unwrap(), vec![name.clone()]);
        assert_eq!(keystore.load_and_decrypt(&name, "pw").unwrap(), mnemonic);
    }

    #[test]
    fn test_collision_attempts_bounded() {
        let keystore = Keystore::with_storage(CrowdedStorage::new(usize::MAX), "W");
        let mnemonic = Mnemonic::generate().unwrap();
        let err = keystore.encrypt_and_store(&mnemonic, "pw").unwrap_err();
        assert!(matches!(err, KeystoreError::Io(ref e) if e.kind() == io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_decrypts_but_not_a_mnemonic() {
        let storage = CrowdedStorage::new(0);
        let record = KeystoreRecord {
            encrypted_payload: crypto::seal(b"hello world this is not a mnemonic", "pw").unwrap(),
            created_at: Utc::now(),
        };
        storage.create_new("odd.json", &serde_json::to_vec(&record).unwrap()).unwrap();

        let keystore = Keystore::with_storage(storage, "W");
        assert!(matches!(
            keystore.load_and_decrypt("odd.json", "pw"),
            Err(KeystoreError::CorruptedMnemonic)
        ));
        assert!(matches!(
            keystore.load_and_decrypt("odd.json", "other"),
            Err(KeystoreError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_record_schema_is_strict() {
        let ok = r#"{"encryptedPayload":"AA==","createdAt":"2026-03-07T09:05:01Z"}"#;
        assert!(serde_json::from_str::<KeystoreRecord>(ok).is_ok());

        let extra = r#"{"encryptedPayload":"AA==","createdAt":"2026-03-07T09:05:01Z","password":"x"}"#;
        assert!(serde_json::from_str::<KeystoreRecord>(extra).is_err());

        let missing = r#"{"encryptedPayload":"AA=="}"#;
        assert!(serde_json::from_str::<KeystoreRecord>(missing).is_err());
    }
}
