//! Seedwallet: one secret seed, an unbounded family of accounts.
//!
//! # Architecture
//!
//! ```text
//! WalletSession (entry points: create / load / recover, balance / receive / send)
//!   │
//!   ├── Keystore ─────────────→ encrypted mnemonic on disk (Argon2id + AES-256-GCM)
//!   │     └── Mnemonic ───────→ 12-word BIP39 phrase → 64-byte seed
//!   │
//!   ├── AccountWindow ────────→ HdDeriver: m/44'/60'/0'/3/{index}, indices 0..N
//!   │     └── balances ───────→ NetworkProvider (fan-out, per-address errors)
//!   │
//!   └── Dispatcher ───────────→ Validated → Signed → Submitted → Confirmed | Failed
//!                                      │
//!                                      ▼
//!                               NetworkProvider (JSON-RPC over HTTP)
//! ```
//!
//! # Entry Points
//!
//! | Operation | Method | Network |
//! |-----------|--------|---------|
//! | create | `WalletSession::create` | no |
//! | load | `WalletSession::load` | no |
//! | recover | `WalletSession::recover` | no |
//! | receive | `session.receive()` | no |
//! | balance | `session.balance(&provider)` | yes |
//! | send | `session.send(&provider, &dispatcher, &request)` | yes |
//!
//! # Features
//!
//! - `server` - HTTP front end (axum) over the same entry points
//!
//! # Usage
//!
//! ```ignore
//! use seedwallet::{Keystore, WalletConfig, WalletSession, JsonRpcProvider};
//!
//! let config = WalletConfig::from_env()?;
//! let keystore = Keystore::open(&config.keystore_dir, config.file_prefix.clone());
//! let session = WalletSession::create(&keystore, "secret1", &config)?;
//!
//! let provider = JsonRpcProvider::new(config.rpc_url.clone(), config.request_timeout)?;
//! let report = session.balance(&provider).await;
//! println!("total: {} ETH", report.total());
//! ```

pub mod accounts;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hd;
pub mod keystore;
pub mod logging;
pub mod mnemonic;
pub mod provider;
pub mod session;
pub mod units;

#[cfg(feature = "server")]
pub mod server;

pub use accounts::{AccountWindow, BalanceEntry, BalanceReport};
pub use config::WalletConfig;
pub use dispatch::{Dispatcher, SendError, SendOutcome, SendRequest};
pub use error::{Error, Result, Step};
pub use hd::{Address, DerivationError, DerivationScheme, HdDeriver, Keypair, PrivateKey};
pub use keystore::{FsStorage, Keystore, KeystoreError, KeystoreRecord, KeystoreStorage};
pub use mnemonic::{Mnemonic, MnemonicError, Seed};
pub use provider::{JsonRpcProvider, NetworkProvider, ProviderError, Receipt, TxHash};
pub use session::WalletSession;
pub use units::{UnitError, Wei};
