//! Wallet configuration. Higher layers construct this, or read it from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SEEDWALLET_KEYSTORE_DIR` | `<data_local_dir>/seedwallet/wallets` |
//! | `SEEDWALLET_FILE_PREFIX` | `EthereumWallet` |
//! | `SEEDWALLET_WINDOW_SIZE` | `20` |
//! | `SEEDWALLET_CHANGE` | `3` |
//! | `SEEDWALLET_RPC_URL` | `http://127.0.0.1:8545` |
//! | `SEEDWALLET_CHAIN_ID` | `11155111` (Sepolia) |
//! | `SEEDWALLET_TIMEOUT_SECS` | `15` |
//! | `SEEDWALLET_CONFIRM_ATTEMPTS` | `0` (return right after submission) |
//! | `SEEDWALLET_CONFIRM_INTERVAL_SECS` | `3` |

use crate::accounts::{DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};
use crate::dispatch::{Dispatcher, DEFAULT_CONFIRM_ATTEMPTS, DEFAULT_CONFIRM_INTERVAL};
use crate::error::{Error, Result};
use crate::hd::DerivationScheme;
use crate::keystore::{validate_filename, DEFAULT_PREFIX};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Public Sepolia endpoint, matching `DEFAULT_CHAIN_ID`.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub keystore_dir: PathBuf,
    pub file_prefix: String,
    pub window_size: u32,
    pub scheme: DerivationScheme,
    pub rpc_url: String,
    pub chain_id: u64,
    pub request_timeout: Duration,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keystore_dir: default_keystore_dir(),
            file_prefix: DEFAULT_PREFIX.into(),
            window_size: DEFAULT_WINDOW_SIZE,
            scheme: DerivationScheme::default(),
            rpc_url: DEFAULT_RPC_URL.into(),
            chain_id: DEFAULT_CHAIN_ID,
            request_timeout: DEFAULT_TIMEOUT,
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            confirm_interval: DEFAULT_CONFIRM_INTERVAL,
        }
    }
}

impl WalletConfig {
    pub fn new(keystore_dir: impl Into<PathBuf>) -> Self {
        Self { keystore_dir: keystore_dir.into(), ..Default::default() }
    }
    pub fn with_file_prefix(mut self, p: impl Into<String>) -> Self { self.file_prefix = p.into(); self }
    pub fn with_window_size(mut self, n: u32) -> Self { self.window_size = n; self }
    pub fn with_scheme(mut self, s: DerivationScheme) -> Self { self.scheme = s; self }
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self { self.rpc_url = url.into(); self }
    pub fn with_chain_id(mut self, id: u64) -> Self { self.chain_id = id; self }
    pub fn with_request_timeout(mut self, t: Duration) -> Self { self.request_timeout = t; self }
    pub fn with_confirmation(mut self, attempts: u32, interval: Duration) -> Self {
        self.confirm_attempts = attempts;
        self.confirm_interval = interval;
        self
    }

    /// Load `.env` from the working directory (if any), then read `SEEDWALLET_*`.
    pub fn from_env() -> Result<Self> {
        load_dotenv(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("SEEDWALLET_KEYSTORE_DIR") {
            config.keystore_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = get("SEEDWALLET_FILE_PREFIX") {
            config.file_prefix = prefix;
        }
        if let Some(n) = get("SEEDWALLET_WINDOW_SIZE") {
            config.window_size = parse_var("SEEDWALLET_WINDOW_SIZE", &n)?;
        }
        if let Some(change) = get("SEEDWALLET_CHANGE") {
            config.scheme = config.scheme.with_change(parse_var("SEEDWALLET_CHANGE", &change)?);
        }
        if let Some(url) = get("SEEDWALLET_RPC_URL") {
            config.rpc_url = url;
        }
        if let Some(id) = get("SEEDWALLET_CHAIN_ID") {
            config.chain_id = parse_var("SEEDWALLET_CHAIN_ID", &id)?;
        }
        if let Some(secs) = get("SEEDWALLET_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("SEEDWALLET_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = get("SEEDWALLET_CONFIRM_ATTEMPTS") {
            config.confirm_attempts = parse_var("SEEDWALLET_CONFIRM_ATTEMPTS", &n)?;
        }
        if let Some(secs) = get("SEEDWALLET_CONFIRM_INTERVAL_SECS") {
            config.confirm_interval =
                Duration::from_secs(parse_var("SEEDWALLET_CONFIRM_INTERVAL_SECS", &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(Error::Config(format!(
                "window size must be 1..={MAX_WINDOW_SIZE}, got {}",
                self.window_size
            )));
        }
        if validate_filename(&self.file_prefix).is_err() {
            return Err(Error::Config(format!("file prefix {:?} is not a plain name", self.file_prefix)));
        }
        if self.chain_id == 0 {
            return Err(Error::Config("chain id must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.chain_id).with_confirmation(self.confirm_attempts, self.confirm_interval)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={value:?}: {e}")))
}

fn default_keystore_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seedwallet")
        .join("wallets")
}

/// Minimal `.env` loader: `KEY=value` lines, `#` comments, optional quotes.
/// Variables already present in the environment win.
pub fn load_dotenv(path: &Path) {
    let Ok(contents) = std::fs::read_to_string(path) else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key).is_err() {
                env::set_var(key, value);
            }
        }
    }
}
