//! Accounts - the bounded window of derived keypairs for one session.
//!
//! The window is recomputed from the seed whenever a session opens and is never
//! written to disk. Balance lookups fan out one query per address and capture
//! each failure next to its address; one failing node call never cancels or
//! hides the others.

use crate::hd::{Address, DerivationError, DerivationScheme, HdDeriver, Keypair, PrivateKey};
use crate::mnemonic::Seed;
use crate::provider::{NetworkProvider, ProviderError};
use crate::units::Wei;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

/// Default number of accounts derived per session.
pub const DEFAULT_WINDOW_SIZE: u32 = 20;

/// Upper bound accepted for a window; keeps derivation cost and fan-out bounded.
pub const MAX_WINDOW_SIZE: u32 = 1000;

/// Balance queries in flight at once.
pub const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Keypairs for indices `0..len`, in index order.
#[derive(Debug)]
pub struct AccountWindow {
    keypairs: Vec<Keypair>,
    scheme: DerivationScheme,
}

impl AccountWindow {
    pub fn derive(seed: &Seed, scheme: DerivationScheme, size: u32) -> Result<Self, DerivationError> {
        let size = size.min(MAX_WINDOW_SIZE);
        let keypairs = HdDeriver::new(scheme).derive_range(seed, 0, size)?;
        debug!(size, path = %scheme.path_string(0), "derived account window");
        Ok(Self { keypairs, scheme })
    }

    pub fn scheme(&self) -> DerivationScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypair> {
        self.keypairs.iter()
    }

    pub fn keypair(&self, index: u32) -> Option<&Keypair> {
        self.keypairs.get(index as usize)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.keypairs.iter().map(|k| k.address).collect()
    }

    /// Signing key for `address`, or `None` when this wallet does not control it.
    ///
    /// `Address` equality is on raw bytes, so the textual case the caller used
    /// does not matter.
    pub fn resolve_signing_key(&self, address: &Address) -> Option<&PrivateKey> {
        self.keypairs
            .iter()
            .find(|k| k.address == *address)
            .map(|k| k.private_key())
    }

    /// Query every address, at most `MAX_CONCURRENT_LOOKUPS` at a time.
    /// Never fails as a whole; entries stay in window order.
    pub async fn balances<P: NetworkProvider + ?Sized>(&self, provider: &P) -> BalanceReport {
        let lookups: Vec<_> = self
            .keypairs
            .iter()
            .map(|k| async move {
                let balance = provider.balance(&k.address).await;
                if let Err(e) = &balance {
                    warn!(index = k.index, address = %k.address, error = %e, "balance lookup failed");
                }
                BalanceEntry { index: k.index, address: k.address, balance }
            })
            .collect();
        let entries: Vec<BalanceEntry> = stream::iter(lookups)
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;
        BalanceReport { entries }
    }
}

/// One address and the outcome of its balance lookup.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceEntry {
    pub index: u32,
    pub address: Address,
    #[serde(serialize_with = "serialize_balance")]
    pub balance: Result<Wei, ProviderError>,
}

fn serialize_balance<S: serde::Serializer>(
    balance: &Result<Wei, ProviderError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(1))?;
    match balance {
        Ok(wei) => map.serialize_entry("ether", &wei.to_ether_string())?,
        Err(e) => map.serialize_entry("error", &e.to_string())?,
    }
    map.end()
}

/// Per-address results, in window order.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub entries: Vec<BalanceEntry>,
}

impl BalanceReport {
    /// Sum of the successful lookups. Failed addresses contribute nothing, so
    /// check `is_complete()` before presenting this as the wallet total.
    pub fn total(&self) -> Wei {
        self.entries
            .iter()
            .filter_map(|e| e.balance.as_ref().ok())
            .fold(Wei::ZERO, |acc, w| acc.saturating_add(*w))
    }

    pub fn failures(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.entries.iter().filter(|e| e.balance.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.balance.is_ok())
    }
}
