//! HTTP routes over the wallet entry points

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{ApiError, AppState};
use crate::dispatch::{SendOutcome, SendRequest};
use crate::hd::Address;
use crate::session::WalletSession;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    password: String,
    confirm_password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverBody {
    mnemonic: String,
    password: String,
    confirm_password: Option<String>,
}

#[derive(Deserialize)]
pub struct UnlockBody {
    filename: String,
    password: String,
}

#[derive(Deserialize)]
pub struct SendBody {
    filename: String,
    password: String,
    from: String,
    to: String,
    amount: String,
}

#[derive(Serialize)]
pub struct AccountView {
    index: u32,
    address: Address,
    path: String,
}

#[derive(Serialize)]
pub struct WalletView {
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mnemonic: Option<String>,
    accounts: Vec<AccountView>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/wallets", post(create_wallet))
        .route("/wallets/recover", post(recover_wallet))
        .route("/wallets/load", post(load_wallet))
        .route("/wallets/receive", post(receive))
        .route("/wallets/balance", post(balance))
        .route("/wallets/send", post(send))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(s): State<AppState>) -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "seedwallet", "chainId": s.config.chain_id}))
}

fn check_new_password(password: &str, confirm: Option<&str>) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::bad_request("password must not be empty"));
    }
    if confirm.is_some_and(|c| c != password) {
        return Err(ApiError::bad_request("passwords do not match"));
    }
    Ok(())
}

/// Keystore work (Argon2, disk) runs off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> crate::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker: {e}")))?
        .map_err(ApiError::from)
}

async fn unlock(s: &AppState, filename: String, password: String) -> Result<WalletSession, ApiError> {
    let (keystore, config) = (s.keystore.clone(), s.config.clone());
    blocking(move || WalletSession::load(&*keystore, &filename, &password, &config)).await
}

fn wallet_view(session: &WalletSession, reveal_mnemonic: bool) -> WalletView {
    let scheme = session.window().scheme();
    WalletView {
        filename: session.keystore_file().map(str::to_string),
        mnemonic: reveal_mnemonic.then(|| session.mnemonic().phrase()),
        accounts: session
            .window()
            .iter()
            .map(|k| AccountView { index: k.index, address: k.address, path: scheme.path_string(k.index) })
            .collect(),
    }
}

async fn create_wallet(State(s): State<AppState>, Json(body): Json<CreateBody>) -> Result<impl IntoResponse, ApiError> {
    check_new_password(&body.password, body.confirm_password.as_deref())?;
    let (keystore, config) = (s.keystore.clone(), s.config.clone());
    let session = blocking(move || WalletSession::create(&*keystore, &body.password, &config)).await?;
    Ok((StatusCode::CREATED, Json(wallet_view(&session, true))))
}

async fn recover_wallet(State(s): State<AppState>, Json(body): Json<RecoverBody>) -> Result<impl IntoResponse, ApiError> {
    check_new_password(&body.password, body.confirm_password.as_deref())?;
    let (keystore, config) = (s.keystore.clone(), s.config.clone());
    let session =
        blocking(move || WalletSession::recover(&*keystore, &body.mnemonic, &body.password, &config)).await?;
    Ok((StatusCode::CREATED, Json(wallet_view(&session, false))))
}

async fn load_wallet(State(s): State<AppState>, Json(body): Json<UnlockBody>) -> Result<Json<WalletView>, ApiError> {
    let session = unlock(&s, body.filename, body.password).await?;
    Ok(Json(wallet_view(&session, false)))
}

async fn receive(State(s): State<AppState>, Json(body): Json<UnlockBody>) -> Result<impl IntoResponse, ApiError> {
    let session = unlock(&s, body.filename, body.password).await?;
    Ok(Json(json!({"addresses": session.receive()})))
}

async fn balance(State(s): State<AppState>, Json(body): Json<UnlockBody>) -> Result<impl IntoResponse, ApiError> {
    let session = unlock(&s, body.filename, body.password).await?;
    let report = session.balance(s.provider.as_ref()).await;
    Ok(Json(json!({
        "total": report.total().to_ether_string(),
        "complete": report.is_complete(),
        "entries": report.entries,
    })))
}

async fn send(State(s): State<AppState>, Json(body): Json<SendBody>) -> Result<Json<SendOutcome>, ApiError> {
    let session = unlock(&s, body.filename, body.password).await?;
    let request = SendRequest { from: body.from, to: body.to, amount: body.amount };
    let outcome = session
        .send(s.provider.as_ref(), &s.config.dispatcher(), &request)
        .await?;
    Ok(Json(outcome))
}
