//! HD - BIP32 key derivation along a fixed BIP44-shaped path.
//!
//! ```text
//! Seed (64 bytes)
//!   └── m / 44' / 60' / 0' / change / index
//!                               │       └── account index (non-hardened, 0..2^31)
//!                               └── CHANGE = 3 for this wallet family
//! ```
//!
//! The change component deviates from BIP44 (0 = external, 1 = internal). It is
//! kept so existing wallets of this family re-derive the same accounts;
//! `DerivationScheme::standard()` selects the BIP44 external chain instead.

mod address;

pub use address::{Address, AddressError};

use crate::mnemonic::Seed;
use bitcoin::bip32::{ChildNumber, Xpriv};
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PURPOSE: u32 = 44;
/// SLIP-44 coin type for Ether.
pub const COIN_TYPE: u32 = 60;
pub const ACCOUNT: u32 = 0;
/// Non-standard change component inherited from earlier wallets of this family.
pub const CHANGE: u32 = 3;
/// BIP44 external (receive) chain.
pub const STANDARD_CHANGE: u32 = 0;

/// Errors during key derivation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("Account index {0} is outside the non-hardened range")]
    IndexOutOfRange(u32),

    #[error("Derivation failed: {0}")]
    Bip32(String),
}

/// Path template `m/purpose'/coin_type'/account'/change/index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationScheme {
    pub purpose: u32,
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
}

impl Default for DerivationScheme {
    fn default() -> Self {
        Self { purpose: PURPOSE, coin_type: COIN_TYPE, account: ACCOUNT, change: CHANGE }
    }
}

impl DerivationScheme {
    /// BIP44 external chain, interoperable with common wallets.
    pub fn standard() -> Self {
        Self { change: STANDARD_CHANGE, ..Self::default() }
    }

    pub fn with_change(mut self, change: u32) -> Self {
        self.change = change;
        self
    }

    pub fn with_coin_type(mut self, coin_type: u32) -> Self {
        self.coin_type = coin_type;
        self
    }

    pub fn path(&self, index: u32) -> Result<[ChildNumber; 5], DerivationError> {
        let bip32 = |e: bitcoin::bip32::Error| DerivationError::Bip32(e.to_string());
        Ok([
            ChildNumber::from_hardened_idx(self.purpose).map_err(bip32)?,
            ChildNumber::from_hardened_idx(self.coin_type).map_err(bip32)?,
            ChildNumber::from_hardened_idx(self.account).map_err(bip32)?,
            ChildNumber::from_normal_idx(self.change).map_err(bip32)?,
            ChildNumber::from_normal_idx(index).map_err(|_| DerivationError::IndexOutOfRange(index))?,
        ])
    }

    /// Human-readable path, e.g. `m/44'/60'/0'/3/7`.
    pub fn path_string(&self, index: u32) -> String {
        format!("m/{}'/{}'/{}'/{}/{}", self.purpose, self.coin_type, self.account, self.change, index)
    }
}

/// secp256k1 private key. Erased on drop, never printed.
#[derive(Clone)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn from_secret_key(key: SecretKey) -> Self {
        Self(key)
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.0
    }

    /// 0x-prefixed hex. Only for explicit export by the key holder.
    pub fn reveal_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.secret_bytes()))
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.non_secure_erase();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(redacted)")
    }
}

/// One derived account.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub index: u32,
    pub public_key: PublicKey,
    pub address: Address,
    private_key: PrivateKey,
}

impl Keypair {
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

/// Derives accounts from a seed under one scheme. Holds the secp256k1 context.
pub struct HdDeriver {
    secp: Secp256k1<All>,
    scheme: DerivationScheme,
}

impl Default for HdDeriver {
    fn default() -> Self {
        Self::new(DerivationScheme::default())
    }
}

impl HdDeriver {
    pub fn new(scheme: DerivationScheme) -> Self {
        Self { secp: Secp256k1::new(), scheme }
    }

    pub fn scheme(&self) -> DerivationScheme {
        self.scheme
    }

    /// Keypair at `index`. Pure: same seed and index, same keypair.
    pub fn derive_account(&self, seed: &Seed, index: u32) -> Result<Keypair, DerivationError> {
        let path = self.scheme.path(index)?;
        let master = Xpriv::new_master(bitcoin::Network::Bitcoin, seed.as_bytes())
            .map_err(|e| DerivationError::Bip32(e.to_string()))?;
        let derived = master
            .derive_priv(&self.secp, &path)
            .map_err(|e| DerivationError::Bip32(e.to_string()))?;

        let secret = derived.private_key;
        let public_key = PublicKey::from_secret_key(&self.secp, &secret);
        Ok(Keypair {
            index,
            public_key,
            address: Address::from_public_key(&public_key),
            private_key: PrivateKey(secret),
        })
    }

    /// `count` accounts starting at `start`, ordered by index. Callers bound `count`.
    pub fn derive_range(&self, seed: &Seed, start: u32, count: u32) -> Result<Vec<Keypair>, DerivationError> {
        let end = start
            .checked_add(count)
            .ok_or(DerivationError::IndexOutOfRange(u32::MAX))?;
        (start..end).map(|index| self.derive_account(seed, index)).collect()
    }
}

/// Derive one account with the default scheme.
pub fn derive_account(seed: &Seed, index: u32) -> Result<Keypair, DerivationError> {
    HdDeriver::default().derive_account(seed, index)
}

/// Derive a contiguous range with the default scheme.
pub fn derive_range(seed: &Seed, start: u32, count: u32) -> Result<Vec<Keypair>, DerivationError> {
    HdDeriver::default().derive_range(seed, start, count)
}
