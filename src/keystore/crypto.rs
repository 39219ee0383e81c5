//! Password-based sealing of the mnemonic text.
//!
//! Payload: `version(1) ‖ salt(16) ‖ nonce(12) ‖ ciphertext+tag`, base64 in the record.
//! Key: Argon2id(password, salt), 32 bytes. Cipher: AES-256-GCM with fixed AAD.

use super::KeystoreError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

pub const PAYLOAD_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_LEN;
const AAD: &[u8] = b"seedwallet-keystore-v1";

fn derive_key(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, KeystoreError> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| KeystoreError::Encryption(format!("argon2: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` under `password` with a fresh salt and nonce.
pub fn seal(plaintext: &[u8], password: &str) -> Result<String, KeystoreError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .and_then(|_| OsRng.try_fill_bytes(&mut nonce))
        .map_err(|e| KeystoreError::EntropyUnavailable(e.to_string()))?;

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| KeystoreError::Encryption(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad: AAD })
        .map_err(|_| KeystoreError::Encryption("aes-gcm encrypt".into()))?;

    let mut payload = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    payload.push(PAYLOAD_VERSION);
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(payload))
}

/// Decrypt a payload produced by [`seal`].
///
/// Structural problems are `MalformedRecord`; a wrong password or any
/// tampering with salt, nonce or ciphertext is `DecryptionFailed`.
pub fn open(encoded: &str, password: &str) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
    let payload = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| KeystoreError::MalformedRecord(format!("base64: {e}")))?;
    if payload.len() < HEADER_LEN + TAG_LEN {
        return Err(KeystoreError::MalformedRecord(format!(
            "payload truncated ({} bytes)",
            payload.len()
        )));
    }
    if payload[0] != PAYLOAD_VERSION {
        return Err(KeystoreError::MalformedRecord(format!(
            "unsupported payload version {}",
            payload[0]
        )));
    }

    let salt = &payload[1..1 + SALT_LEN];
    let nonce = &payload[1 + SALT_LEN..HEADER_LEN];
    let ciphertext = &payload[HEADER_LEN..];

    let key = derive_key(password, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| KeystoreError::Encryption(format!("cipher init: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad: AAD })
        .map(Zeroizing::new)
        .map_err(|_| KeystoreError::DecryptionFailed)
}
