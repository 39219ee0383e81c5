//! WalletSession - one unlocked wallet: its mnemonic and the derived account window.
//!
//! Sessions are explicit values; nothing here is global. A session is opened by
//! one of three entry points and then serves receive / balance / send until dropped.
//!
//! | Entry | Keystore effect |
//! |-------|-----------------|
//! | `create` | new mnemonic, new file |
//! | `load` | reads an existing file |
//! | `recover` | user-supplied mnemonic, new file |

use crate::accounts::{AccountWindow, BalanceReport};
use crate::config::WalletConfig;
use crate::dispatch::{Dispatcher, SendError, SendOutcome, SendRequest};
use crate::error::Result;
use crate::hd::{Address, Keypair};
use crate::keystore::{Keystore, KeystoreStorage};
use crate::mnemonic::Mnemonic;
use crate::provider::NetworkProvider;
use tracing::info;

#[derive(Debug)]
pub struct WalletSession {
    mnemonic: Mnemonic,
    window: AccountWindow,
    keystore_file: Option<String>,
}

impl WalletSession {
    /// Derive the account window for `mnemonic` without touching the keystore.
    pub fn open(mnemonic: Mnemonic, config: &WalletConfig) -> Result<Self> {
        let seed = mnemonic.to_seed("");
        let window = AccountWindow::derive(&seed, config.scheme, config.window_size)?;
        Ok(Self { mnemonic, window, keystore_file: None })
    }

    /// Generate a fresh mnemonic, store it encrypted, open the session.
    pub fn create<S: KeystoreStorage>(keystore: &Keystore<S>, password: &str, config: &WalletConfig) -> Result<Self> {
        let mnemonic = Mnemonic::generate()?;
        let file = keystore.encrypt_and_store(&mnemonic, password)?;
        info!(file = %file, "wallet created");
        Self::open(mnemonic, config).map(|s| s.with_keystore_file(file))
    }

    /// Decrypt an existing keystore file and open the session.
    pub fn load<S: KeystoreStorage>(
        keystore: &Keystore<S>,
        filename: &str,
        password: &str,
        config: &WalletConfig,
    ) -> Result<Self> {
        let mnemonic = keystore.load_and_decrypt(filename, password)?;
        Self::open(mnemonic, config).map(|s| s.with_keystore_file(filename.to_string()))
    }

    /// Validate a user-supplied phrase, store it under a new password, open the session.
    pub fn recover<S: KeystoreStorage>(
        keystore: &Keystore<S>,
        phrase: &str,
        password: &str,
        config: &WalletConfig,
    ) -> Result<Self> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let file = keystore.encrypt_and_store(&mnemonic, password)?;
        info!(file = %file, "wallet recovered");
        Self::open(mnemonic, config).map(|s| s.with_keystore_file(file))
    }

    fn with_keystore_file(mut self, file: String) -> Self {
        self.keystore_file = Some(file);
        self
    }

    pub fn mnemonic(&self) -> &Mnemonic {
        &self.mnemonic
    }

    pub fn keystore_file(&self) -> Option<&str> {
        self.keystore_file.as_deref()
    }

    pub fn window(&self) -> &AccountWindow {
        &self.window
    }

    /// Receiving addresses, in index order.
    pub fn receive(&self) -> Vec<Address> {
        self.window.addresses()
    }

    pub fn account(&self, index: u32) -> Option<&Keypair> {
        self.window.keypair(index)
    }

    pub async fn balance<P: NetworkProvider + ?Sized>(&self, provider: &P) -> BalanceReport {
        self.window.balances(provider).await
    }

    pub async fn send<P: NetworkProvider + ?Sized>(
        &self,
        provider: &P,
        dispatcher: &Dispatcher,
        request: &SendRequest,
    ) -> std::result::Result<SendOutcome, SendError> {
        dispatcher.send(&self.window, request, provider).await
    }
}
