//! HTTP Server Tests - the axum router over a temp keystore and a mock provider
//!
//! These tests verify:
//! 1. Create returns 201 with the phrase once; load/receive return addresses only
//! 2. Password and filename problems map to 400/401/404 with a `step`
//! 3. Balance and send go through the provider; invalid sends never reach it

#![cfg(feature = "server")]

mod common;

use common::{MockProvider, TEST_MNEMONIC};
use reqwest::StatusCode;
use seedwallet::server::{create_router, AppState};
use seedwallet::{DerivationScheme, ProviderError, Wei, WalletConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

const FIRST: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const SECOND: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

struct TestServer {
    base: String,
    client: reqwest::Client,
    provider: Arc<MockProvider>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = WalletConfig::new(dir.path())
            .with_scheme(DerivationScheme::standard())
            .with_window_size(3);
        let provider = Arc::new(MockProvider::new());
        let app = create_router(AppState::new(config, provider.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base: format!("http://{addr}"), client: reqwest::Client::new(), provider, _dir: dir }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    /// Recover the well-known phrase and return its keystore filename.
    async fn recover_known(&self) -> String {
        let (status, body) = self
            .post("/wallets/recover", json!({"mnemonic": TEST_MNEMONIC, "password": "pw"}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["filename"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health() {
    let server = TestServer::start().await;
    let body: Value = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chainId"], 11_155_111);
}

#[tokio::test]
async fn create_then_load() {
    let server = TestServer::start().await;

    let (status, created) = server
        .post("/wallets", json!({"password": "secret1", "confirmPassword": "secret1"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let phrase = created["mnemonic"].as_str().unwrap();
    assert_eq!(phrase.split(' ').count(), 12);
    assert_eq!(created["accounts"].as_array().unwrap().len(), 3);
    assert_eq!(created["accounts"][2]["path"], "m/44'/60'/0'/0/2");

    let filename = created["filename"].as_str().unwrap();
    let (status, loaded) = server
        .post("/wallets/load", json!({"filename": filename, "password": "secret1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(loaded.get("mnemonic").is_none());
    assert_eq!(loaded["accounts"], created["accounts"]);
}

#[tokio::test]
async fn recover_and_receive() {
    let server = TestServer::start().await;
    let filename = server.recover_known().await;

    let (status, body) = server
        .post("/wallets/receive", json!({"filename": filename, "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"][0], FIRST);
    assert_eq!(body["addresses"][1], SECOND);
}

#[tokio::test]
async fn password_problems() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/wallets", json!({"password": "a", "confirmPassword": "b"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "passwords do not match");

    let (status, _) = server.post("/wallets", json!({"password": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let filename = server.recover_known().await;
    let (status, body) = server
        .post("/wallets/load", json!({"filename": filename, "password": "wrong"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["step"], "keystore");
    assert!(!body.to_string().contains("junk"));
}

#[tokio::test]
async fn bad_filenames() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/wallets/load", json!({"filename": "../secrets.json", "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["step"], "keystore");

    let (status, _) = server
        .post("/wallets/load", json!({"filename": "EthereumWallet_missing.json", "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_recovery_phrase() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/wallets/recover", json!({"mnemonic": "not a real phrase", "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["step"], "mnemonic");
}

#[tokio::test]
async fn balance_report() {
    let server = TestServer::start().await;
    let filename = server.recover_known().await;
    server
        .provider
        .set_balance(FIRST.parse().unwrap(), Ok(Wei::parse_ether("1.5").unwrap()));
    server
        .provider
        .set_balance(SECOND.parse().unwrap(), Err(ProviderError::Unavailable("timeout".into())));

    let (status, body) = server
        .post("/wallets/balance", json!({"filename": filename, "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], "1.5");
    assert_eq!(body["complete"], false);
    assert_eq!(body["entries"][0]["balance"]["ether"], "1.5");
    assert!(body["entries"][1]["balance"]["error"].is_string());
    assert_eq!(body["entries"][2]["balance"]["ether"], "0");
}

#[tokio::test]
async fn send_flow() {
    let server = TestServer::start().await;
    let filename = server.recover_known().await;

    let (status, body) = server
        .post(
            "/wallets/send",
            json!({"filename": filename, "password": "pw", "from": FIRST, "to": "0x1234", "amount": "1"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["step"], "validation");
    assert_eq!(server.provider.calls(), 0);

    let (status, body) = server
        .post(
            "/wallets/send",
            json!({"filename": filename, "password": "pw", "from": FIRST, "to": SECOND, "amount": "0.25"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "submitted");
    assert!(body["hash"].as_str().unwrap().starts_with("0x"));
    assert_eq!(server.provider.sent_count(), 1);
}

#[tokio::test]
async fn node_refusal_is_unprocessable() {
    let server = TestServer::start().await;
    let filename = server.recover_known().await;
    *server.provider.estimate_error.lock().unwrap() = Some(ProviderError::Rejected {
        code: -32000,
        message: "insufficient funds for transfer".into(),
    });

    let (status, body) = server
        .post(
            "/wallets/send",
            json!({"filename": filename, "password": "pw", "from": FIRST, "to": SECOND, "amount": "5"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["step"], "submission");
    assert_eq!(server.provider.sent_count(), 0);
}
