//! JSON-RPC 2.0 over HTTP provider (`eth_*` methods).

use super::{CallRequest, NetworkProvider, ProviderError, Receipt, TxHash};
use crate::hd::Address;
use crate::units::{parse_hex_u128, Wei};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub struct JsonRpcProvider {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self { client, url: url.into(), next_id: AtomicU64::new(1) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        debug!(method, id, "rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{method}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("{method}: HTTP {status}")));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("{method}: {e}")))?;
        if let Some(err) = envelope.error {
            debug!(method, id, code = err.code, "rpc error");
            return Err(ProviderError::Rejected { code: err.code, message: err.message });
        }
        serde_json::from_value(envelope.result)
            .map_err(|e| ProviderError::Malformed(format!("{method}: {e}")))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, ProviderError> {
        let raw: String = self.call(method, params).await?;
        parse_hex_u128(&raw).map_err(|e| ProviderError::Malformed(format!("{method}: {e}")))
    }
}

fn to_u64(value: u128, what: &str) -> Result<u64, ProviderError> {
    u64::try_from(value).map_err(|_| ProviderError::Malformed(format!("{what} out of range")))
}

fn optional_u64(raw: Option<String>, what: &str) -> Result<Option<u64>, ProviderError> {
    raw.map(|s| {
        parse_hex_u128(&s)
            .map_err(|e| ProviderError::Malformed(format!("{what}: {e}")))
            .and_then(|v| to_u64(v, what))
    })
    .transpose()
}

#[async_trait]
impl NetworkProvider for JsonRpcProvider {
    async fn balance(&self, address: &Address) -> Result<Wei, ProviderError> {
        let wei = self.quantity("eth_getBalance", json!([address.to_checksum(), "latest"])).await?;
        Ok(Wei::from_wei(wei))
    }

    async fn transaction_count(&self, address: &Address) -> Result<u64, ProviderError> {
        let count = self
            .quantity("eth_getTransactionCount", json!([address.to_checksum(), "pending"]))
            .await?;
        to_u64(count, "nonce")
    }

    async fn gas_price(&self) -> Result<Wei, ProviderError> {
        Ok(Wei::from_wei(self.quantity("eth_gasPrice", json!([])).await?))
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ProviderError> {
        let params = json!([{
            "from": call.from.to_checksum(),
            "to": call.to.to_checksum(),
            "value": call.value.to_hex_quantity(),
        }]);
        let gas = self.quantity("eth_estimateGas", params).await?;
        to_u64(gas, "gas estimate")
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ProviderError> {
        self.call("eth_sendRawTransaction", json!([format!("0x{}", hex::encode(raw))]))
            .await
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>, ProviderError> {
        let raw: Option<RawReceipt> = self
            .call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        let Some(raw) = raw else { return Ok(None) };

        // Pre-Byzantium receipts carry no status; treat inclusion as success
        let success = match raw.status.as_deref() {
            None => true,
            Some(s) => parse_hex_u128(s).map_err(|e| ProviderError::Malformed(format!("status: {e}")))? == 1,
        };
        Ok(Some(Receipt {
            transaction_hash: raw.transaction_hash,
            success,
            block_number: optional_u64(raw.block_number, "block number")?,
            gas_used: optional_u64(raw.gas_used, "gas used")?,
        }))
    }
}
