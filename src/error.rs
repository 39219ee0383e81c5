//! Crate-level error: one variant per component, each naming the step that failed.

use crate::dispatch::SendError;
use crate::hd::DerivationError;
use crate::keystore::KeystoreError;
use crate::mnemonic::MnemonicError;
use crate::provider::ProviderError;
use serde::Serialize;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which stage of a wallet operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Mnemonic,
    Derivation,
    Keystore,
    Validation,
    Network,
    Submission,
    Config,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Mnemonic => "mnemonic",
            Step::Derivation => "derivation",
            Step::Keystore => "keystore",
            Step::Validation => "validation",
            Step::Network => "network",
            Step::Submission => "submission",
            Step::Config => "config",
        })
    }
}

impl Error {
    pub fn step(&self) -> Step {
        match self {
            Error::Mnemonic(_) => Step::Mnemonic,
            Error::Derivation(_) => Step::Derivation,
            Error::Keystore(_) => Step::Keystore,
            Error::Send(SendError::InvalidRequest(_)) => Step::Validation,
            Error::Send(SendError::ProviderUnavailable { .. }) => Step::Network,
            Error::Send(SendError::SubmissionRejected(_)) => Step::Submission,
            Error::Provider(_) => Step::Network,
            Error::Config(_) => Step::Config,
        }
    }
}
