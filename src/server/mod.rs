//! HTTP front end. Stateless: every wallet request names its keystore file and
//! password, and the session lives only for that request.

mod routes;

pub use routes::create_router;

use crate::config::WalletConfig;
use crate::dispatch::SendError;
use crate::error::{Error, Step};
use crate::keystore::{Keystore, KeystoreError};
use crate::mnemonic::MnemonicError;
use crate::provider::{JsonRpcProvider, NetworkProvider};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WalletConfig>,
    pub keystore: Arc<Keystore>,
    pub provider: Arc<dyn NetworkProvider>,
}

impl AppState {
    pub fn new(config: WalletConfig, provider: Arc<dyn NetworkProvider>) -> Self {
        let keystore = Keystore::open(&config.keystore_dir, config.file_prefix.clone());
        Self { config: Arc::new(config), keystore: Arc::new(keystore), provider }
    }
}

/// Error body: `{"error": "...", "step": "keystore"}`. Never carries secrets.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub step: Option<Step>,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, step: None, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, step: None, message: message.into() }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Mnemonic(MnemonicError::EntropyUnavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Mnemonic(_) => StatusCode::BAD_REQUEST,
            Error::Derivation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Keystore(k) => match k {
                KeystoreError::DecryptionFailed => StatusCode::UNAUTHORIZED,
                KeystoreError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
                KeystoreError::Io(e) if e.kind() == io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                KeystoreError::CorruptedMnemonic | KeystoreError::MalformedRecord(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Send(SendError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Error::Send(SendError::SubmissionRejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Send(SendError::ProviderUnavailable { .. }) | Error::Provider(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, step: Some(err.step()), message: err.to_string() }
    }
}

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message, "step": self.step}))).into_response()
    }
}

/// Bind `addr` and serve until SIGINT/SIGTERM.
pub async fn serve(config: WalletConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let provider = JsonRpcProvider::new(config.rpc_url.clone(), config.request_timeout)?;
    info!(rpc = %provider.url(), chain_id = config.chain_id, keystore = %config.keystore_dir.display(), "starting server");
    let router = create_router(AppState::new(config, Arc::new(provider)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("seedwallet listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}
