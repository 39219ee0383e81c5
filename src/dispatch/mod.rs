//! Dispatch - value transfers as a typestate pipeline.
//!
//! ```text
//! SendRequest ─validate─→ Validated ─quote─→ TxParams ─sign─→ Signed ─submit─→ Submitted
//!   (local checks,          (nonce, gas price,   (local key,       (one attempt,      │
//!    no network)             gas estimate)        EIP-155)          never retried)    │
//!                                                                          confirm (bounded)
//!                                                                     ┌───────────┼───────────┐
//!                                                                 Confirmed     Failed    still Submitted
//! ```
//!
//! Each state only exposes the transition to the next, so a transaction cannot
//! be submitted unsigned or signed unvalidated. `Submitted` with a hash is a
//! valid place to stop: the node accepted the bytes and inclusion is its business.

mod transaction;

pub use transaction::{LegacyTransaction, SignedTransaction};

use crate::accounts::AccountWindow;
use crate::hd::{Address, AddressError, PrivateKey};
use crate::provider::{CallRequest, NetworkProvider, ProviderError, Receipt, TxHash};
use crate::units::{UnitError, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gas for a plain value transfer with empty data.
pub const TRANSFER_GAS: u64 = 21_000;

/// Default bounded confirmation wait.
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 0;
pub const DEFAULT_CONFIRM_INTERVAL: Duration = Duration::from_secs(3);

/// What the user asked for, as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    /// Major-unit decimal string, e.g. `"0.25"`.
    pub amount: String,
}

/// Why a request failed local validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("sender address: {0}")]
    Sender(AddressError),
    #[error("destination address: {0}")]
    Destination(AddressError),
    #[error("amount: {0}")]
    Amount(UnitError),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("sender {0} is not an account of this wallet")]
    UnknownSender(Address),
}

/// Stage at which the provider was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Nonce,
    GasPrice,
    GasEstimate,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Nonce => "nonce",
            Stage::GasPrice => "gas price",
            Stage::GasEstimate => "gas estimate",
            Stage::Submit => "submit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Provider unavailable during {stage}: {source}")]
    ProviderUnavailable {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("Submission rejected by node: {0}")]
    SubmissionRejected(String),
}

impl SendError {
    /// A node-reported error is a rejection of this transfer; anything else
    /// means the provider could not answer.
    fn provider(stage: Stage) -> impl FnOnce(ProviderError) -> SendError {
        move |source| match source {
            ProviderError::Rejected { code, message } => {
                warn!(%stage, code, %message, "node rejected transfer");
                SendError::SubmissionRejected(message)
            }
            source => SendError::ProviderUnavailable { stage, source },
        }
    }

    /// True when nothing reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, SendError::InvalidRequest(_))
    }
}

/// A request that passed every local check. Borrows the signing key from the window.
#[derive(Debug)]
pub struct Validated<'w> {
    from: Address,
    to: Address,
    amount: Wei,
    key: &'w PrivateKey,
}

/// Network-derived parameters for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub nonce: u64,
    pub gas_price: Wei,
    pub gas_limit: u64,
}

impl<'w> Validated<'w> {
    /// Parse and check the request. Makes no network calls.
    pub fn new(window: &'w AccountWindow, request: &SendRequest) -> Result<Self, SendError> {
        let from: Address = request.from.parse().map_err(RequestError::Sender)?;
        let to: Address = request.to.parse().map_err(RequestError::Destination)?;
        let amount = Wei::parse_ether(&request.amount).map_err(RequestError::Amount)?;
        if amount.is_zero() {
            return Err(RequestError::ZeroAmount.into());
        }
        let key = window
            .resolve_signing_key(&from)
            .ok_or(RequestError::UnknownSender(from))?;
        Ok(Self { from, to, amount, key })
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn amount(&self) -> Wei {
        self.amount
    }

    /// Fetch nonce, gas price and gas estimate. A node refusal (e.g. insufficient
    /// funds at estimation) is `SubmissionRejected`; no answer is `ProviderUnavailable`.
    pub async fn quote<P: NetworkProvider + ?Sized>(&self, provider: &P) -> Result<TxParams, SendError> {
        let nonce = provider
            .transaction_count(&self.from)
            .await
            .map_err(SendError::provider(Stage::Nonce))?;
        let gas_price = provider.gas_price().await.map_err(SendError::provider(Stage::GasPrice))?;
        let call = CallRequest { from: self.from, to: self.to, value: self.amount };
        let estimate = provider
            .estimate_gas(&call)
            .await
            .map_err(SendError::provider(Stage::GasEstimate))?;

        let params = TxParams { nonce, gas_price, gas_limit: estimate.max(TRANSFER_GAS) };
        debug!(nonce, gas_price = %params.gas_price.as_u128(), gas_limit = params.gas_limit, "quoted transfer");
        Ok(params)
    }

    /// Build and sign locally. Consumes the validated request.
    pub fn sign(self, params: TxParams, chain_id: u64) -> Signed {
        let tx = LegacyTransaction {
            nonce: params.nonce,
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            to: self.to,
            value: self.amount,
            data: Vec::new(),
            chain_id,
        };
        let signed = tx.sign(self.key);
        Signed { from: self.from, tx, signed }
    }
}

/// Signed bytes ready for one submission attempt.
#[derive(Debug, Clone)]
pub struct Signed {
    from: Address,
    tx: LegacyTransaction,
    signed: SignedTransaction,
}

impl Signed {
    pub fn transaction(&self) -> &LegacyTransaction {
        &self.tx
    }

    pub fn raw(&self) -> &[u8] {
        &self.signed.raw
    }

    /// Locally computed hash; equals what the node should return.
    pub fn hash(&self) -> TxHash {
        self.signed.hash
    }

    /// Hand the bytes to the node once. A node-reported error is
    /// `SubmissionRejected`; transport trouble is `ProviderUnavailable`.
    pub async fn submit<P: NetworkProvider + ?Sized>(self, provider: &P) -> Result<Submitted, SendError> {
        let hash = provider
            .send_raw_transaction(&self.signed.raw)
            .await
            .map_err(SendError::provider(Stage::Submit))?;
        if hash != self.signed.hash {
            warn!(local = %self.signed.hash, node = %hash, "node returned a different tx hash");
        }
        info!(from = %self.from, to = %self.tx.to, hash = %hash, "transaction submitted");
        Ok(Submitted { hash })
    }
}

/// Accepted by the node, inclusion unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub hash: TxHash,
}

impl Submitted {
    /// Poll for a receipt up to `attempts` times, `interval` apart.
    ///
    /// The transaction is already broadcast, so nothing here is an error: a
    /// failed poll or an exhausted bound both leave the send in `Submitted`.
    pub async fn confirm<P: NetworkProvider + ?Sized>(
        self,
        provider: &P,
        attempts: u32,
        interval: Duration,
    ) -> SendOutcome {
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(interval).await;
            }
            match provider.transaction_receipt(&self.hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    info!(hash = %self.hash, block = ?receipt.block_number, "transaction confirmed");
                    return SendOutcome::Confirmed(receipt);
                }
                Ok(Some(receipt)) => {
                    warn!(hash = %self.hash, "transaction included but failed");
                    return SendOutcome::Failed(receipt);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(hash = %self.hash, error = %e, "receipt lookup failed, leaving send as submitted");
                    break;
                }
            }
        }
        SendOutcome::Submitted { hash: self.hash }
    }
}

/// Terminal state of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Submitted { hash: TxHash },
    Confirmed(Receipt),
    Failed(Receipt),
}

impl SendOutcome {
    pub fn hash(&self) -> TxHash {
        match self {
            SendOutcome::Submitted { hash } => *hash,
            SendOutcome::Confirmed(r) | SendOutcome::Failed(r) => r.transaction_hash,
        }
    }
}

/// Runs the whole pipeline with fixed chain and confirmation settings.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    pub chain_id: u64,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
}

impl Dispatcher {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            confirm_interval: DEFAULT_CONFIRM_INTERVAL,
        }
    }

    pub fn with_confirmation(mut self, attempts: u32, interval: Duration) -> Self {
        self.confirm_attempts = attempts;
        self.confirm_interval = interval;
        self
    }

    pub async fn send<P: NetworkProvider + ?Sized>(
        &self,
        window: &AccountWindow,
        request: &SendRequest,
        provider: &P,
    ) -> Result<SendOutcome, SendError> {
        let validated = Validated::new(window, request)?;
        let params = validated.quote(provider).await?;
        let submitted = validated.sign(params, self.chain_id).submit(provider).await?;
        Ok(submitted
            .confirm(provider, self.confirm_attempts, self.confirm_interval)
            .await)
    }
}
