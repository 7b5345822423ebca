//! Faucet configuration, read once at startup.
//!
//! ```toml
//! [chains.dev]
//! rpc_url = "ws://localhost:8546"
//! keystore = "keys/dev.json"
//!
//! [chains.dev.funds]
//! type = "coin"
//! amount = "1000000000000000000"
//! threshold = "500000000000000000"
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy::primitives::{Address, U256};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "faucet.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chains: BTreeMap<String, ChainConfig>,

    /// Directory relative keystore paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Node endpoint, `http(s)://` or `ws(s)://`.
    pub rpc_url: String,
    /// Path to the encrypted account of this chain.
    pub keystore: PathBuf,
    pub funds: FundsConfig,
}

/// What a chain's faucet hands out. Fields are validated when the faucet is
/// built so that a missing key names the chain it belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundsConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<U256>,
    /// Beneficiaries at or above this balance are not filled. Defaults to
    /// `amount`.
    pub threshold: Option<U256>,
    /// Token contract, EIP20 faucets only.
    pub address: Option<Address>,
}

impl Config {
    /// Reads and parses the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(config)
    }

    pub fn chain(&self, chain: &str) -> Result<&ChainConfig, ConfigError> {
        self.chains
            .get(chain)
            .ok_or_else(|| ConfigError::UnknownChain(chain.to_string()))
    }

    /// The keystore path of `chain`, resolved against the config file's
    /// directory when relative.
    pub fn keystore_path(&self, chain: &str) -> Result<PathBuf, ConfigError> {
        let keystore = &self.chain(chain)?.keystore;
        if keystore.is_absolute() {
            Ok(keystore.clone())
        } else {
            Ok(self.base_dir.join(keystore))
        }
    }
}
