//! Shared test doubles: an in-memory provider and a fake JSON-RPC node.

#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use seedwallet::provider::CallRequest;
use seedwallet::{Address, Mnemonic, NetworkProvider, ProviderError, Receipt, TxHash, Wei};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// Well-known development mnemonic, never use with real funds
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

pub static TEST_WALLET: Lazy<Mnemonic> = Lazy::new(|| Mnemonic::parse(TEST_MNEMONIC).unwrap());

/// Scriptable provider. Every trait call bumps `calls`.
pub struct MockProvider {
    calls: AtomicUsize,
    pub balances: Mutex<HashMap<Address, Result<Wei, ProviderError>>>,
    pub nonce: Mutex<Result<u64, ProviderError>>,
    pub gas_price: Wei,
    pub gas_estimate: u64,
    /// Returned by `estimate_gas` instead of `gas_estimate` when set
    pub estimate_error: Mutex<Option<ProviderError>>,
    /// `None` means accept and return keccak(raw)
    pub send_result: Mutex<Option<Result<TxHash, ProviderError>>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// Popped per poll; empty queue means "not yet included"
    pub receipts: Mutex<VecDeque<Option<Receipt>>>,
    /// Returned by every receipt poll when set
    pub receipt_error: Mutex<Option<ProviderError>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            balances: Mutex::new(HashMap::new()),
            nonce: Mutex::new(Ok(0)),
            gas_price: Wei::from_wei(1_000_000_000),
            gas_estimate: 21_000,
            estimate_error: Mutex::new(None),
            send_result: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(VecDeque::new()),
            receipt_error: Mutex::new(None),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn set_balance(&self, address: Address, balance: Result<Wei, ProviderError>) {
        self.balances.lock().unwrap().insert(address, balance);
    }

    pub fn push_receipt(&self, receipt: Option<Receipt>) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkProvider for MockProvider {
    async fn balance(&self, address: &Address) -> Result<Wei, ProviderError> {
        self.hit();
        self.balances.lock().unwrap().get(address).cloned().unwrap_or(Ok(Wei::ZERO))
    }

    async fn transaction_count(&self, _address: &Address) -> Result<u64, ProviderError> {
        self.hit();
        self.nonce.lock().unwrap().clone()
    }

    async fn gas_price(&self) -> Result<Wei, ProviderError> {
        self.hit();
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, ProviderError> {
        self.hit();
        match self.estimate_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(self.gas_estimate),
        }
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ProviderError> {
        self.hit();
        self.sent.lock().unwrap().push(raw.to_vec());
        match self.send_result.lock().unwrap().clone() {
            Some(result) => result,
            None => Ok(TxHash(Keccak256::digest(raw).into())),
        }
    }

    async fn transaction_receipt(&self, _hash: &TxHash) -> Result<Option<Receipt>, ProviderError> {
        self.hit();
        if let Some(e) = self.receipt_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.receipts.lock().unwrap().pop_front().flatten())
    }
}

#[cfg(feature = "server")]
pub mod fake_node {
    //! Minimal JSON-RPC node on 127.0.0.1:0 with canned per-method responses.

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct FakeNode {
        /// method → `{"result": ..}` or `{"error": ..}`
        responses: Arc<Mutex<HashMap<String, Value>>>,
        pub calls: Arc<Mutex<Vec<(String, Value)>>>,
        fail_http: Arc<Mutex<bool>>,
    }

    impl FakeNode {
        pub fn result(&self, method: &str, result: Value) -> &Self {
            self.responses.lock().unwrap().insert(method.into(), json!({"result": result}));
            self
        }

        pub fn error(&self, method: &str, code: i64, message: &str) -> &Self {
            self.responses
                .lock()
                .unwrap()
                .insert(method.into(), json!({"error": {"code": code, "message": message}}));
            self
        }

        pub fn fail_http(&self) {
            *self.fail_http.lock().unwrap() = true;
        }

        pub fn methods_called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }

        /// Serve on an ephemeral port; returns the URL.
        pub async fn spawn(&self) -> String {
            let app = Router::new().route("/", post(handle)).with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}")
        }
    }

    async fn handle(State(node): State<FakeNode>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
        if *node.fail_http.lock().unwrap() {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        let method = body["method"].as_str().unwrap_or_default().to_string();
        node.calls.lock().unwrap().push((method.clone(), body["params"].clone()));

        let mut reply = node
            .responses
            .lock()
            .unwrap()
            .get(&method)
            .cloned()
            .unwrap_or_else(|| json!({"error": {"code": -32601, "message": "method not found"}}));
        reply["jsonrpc"] = json!("2.0");
        reply["id"] = body["id"].clone();
        Ok(Json(reply))
    }
}
