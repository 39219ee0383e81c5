//! Provider - the network node contract the core composes calls against.
//!
//! ```text
//! AccountWindow::balances ──→ balance()              (one call per address, concurrent)
//! Validated::quote ─────────→ transaction_count(), gas_price(), estimate_gas()
//! Signed::submit ───────────→ send_raw_transaction() (never retried by the core)
//! Submitted::confirm ───────→ transaction_receipt()  (bounded polling)
//! ```
//!
//! Errors are classified, not interpreted: transport trouble is `Unavailable`,
//! a node-reported error is `Rejected`, a response we cannot read is `Malformed`.

mod rpc;

pub use rpc::JsonRpcProvider;

use crate::hd::Address;
use crate::units::Wei;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Node rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| ProviderError::Malformed(format!("tx hash without 0x: {s}")))?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| ProviderError::Malformed(format!("tx hash: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parameters for gas estimation of a plain value transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
}

/// Inclusion record for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// false when the transaction was included but reverted
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Remote node operations needed by the wallet. Timeouts belong to the implementation.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn balance(&self, address: &Address) -> Result<Wei, ProviderError>;

    /// Pending-state nonce for `address`.
    async fn transaction_count(&self, address: &Address) -> Result<u64, ProviderError>;

    async fn gas_price(&self) -> Result<Wei, ProviderError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ProviderError>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ProviderError>;

    /// `None` while the transaction is not yet included.
    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>, ProviderError>;
}
