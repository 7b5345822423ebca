//! Error types shared across the faucet.

use std::path::PathBuf;

use alloy::primitives::{Address, U256};

/// Invalid or incomplete setup. Fatal at startup: the process must not
/// begin serving with a chain it cannot fill from.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no chains given, at least one faucet is required")]
    NoChains,

    #[error("chain `{0}` is not configured")]
    UnknownChain(String),

    #[error("chain `{0}` is served twice")]
    DuplicateChain(String),

    #[error("chain `{chain}` is missing config key `{key}`")]
    MissingKey { chain: String, key: &'static str },

    #[error("chain `{chain}` has unknown faucet type `{kind}`")]
    UnknownFaucetType { chain: String, kind: String },

    #[error("account for chain `{0}` is locked")]
    Locked(String),

    #[error("keystore for chain `{chain}` at {path}: {reason}")]
    Keystore {
        chain: String,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to connect to node of chain `{chain}`: {reason}")]
    Connect { chain: String, reason: String },

    #[error(transparent)]
    Password(#[from] PasswordError),
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("no password available for chain `{0}`")]
    Missing(String),

    #[error("passwords for chain `{0}` do not match")]
    Mismatch(String),

    #[error("failed to read password file {path}: {reason}")]
    File { path: PathBuf, reason: String },

    #[error("failed to read password from terminal: {0}")]
    Prompt(#[source] std::io::Error),
}

/// A failed call to a chain's remote node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} failed: {message}")]
pub struct NodeError {
    pub method: &'static str,
    pub message: String,
}

impl NodeError {
    pub fn new(method: &'static str, message: impl std::fmt::Display) -> Self {
        Self {
            method,
            message: message.to_string(),
        }
    }
}

/// A fill that could not be carried out.
///
/// Node failures and outright rejections by the chain land in the same
/// taxonomy; the step that failed is kept in the variant and the node's
/// detail in the wrapped [`NodeError`]. Never retried by the faucet.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to read balance of {address}: {source}")]
    Balance {
        address: Address,
        #[source]
        source: NodeError,
    },

    #[error("faucet holds {available} tokens but {required} are needed")]
    InsufficientFunds { available: U256, required: U256 },

    #[error("failed to read chain id: {0}")]
    ChainId(#[source] NodeError),

    #[error("failed to read nonce: {0}")]
    Nonce(#[source] NodeError),

    #[error("gas estimation failed: {0}")]
    GasEstimation(#[source] NodeError),

    #[error("failed to read gas price: {0}")]
    GasPrice(#[source] NodeError),

    #[error("failed to sign transaction: {0}")]
    Signing(String),

    #[error("transaction rejected: {0}")]
    Submission(#[source] NodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DispatchError {
    /// Description safe to hand back to HTTP callers.
    ///
    /// Names the step that failed but not the raw node payload, which may
    /// contain endpoint details.
    pub fn redacted(&self) -> String {
        match self {
            Self::Balance { address, .. } => format!("could not read balance of {address}"),
            Self::InsufficientFunds { .. } => "faucet has insufficient funds".to_string(),
            Self::ChainId(_) => "could not determine chain id".to_string(),
            Self::Nonce(_) => "could not determine faucet nonce".to_string(),
            Self::GasEstimation(_) => "transaction would fail, gas estimation reverted".to_string(),
            Self::GasPrice(_) => "could not determine gas price".to_string(),
            Self::Signing(_) => "could not sign transaction".to_string(),
            Self::Submission(_) => "transaction rejected by node".to_string(),
            Self::Config(_) => "faucet is misconfigured".to_string(),
        }
    }
}
