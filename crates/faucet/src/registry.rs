//! The set of faucets a process serves, keyed by chain name.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use crate::{
    account::SigningAccount,
    config::{Config, FundsConfig},
    error::ConfigError,
    fill::{CoinFaucet, Faucet, FillPolicy, TokenFaucet},
    node::AlloyNode,
    password::PasswordSource,
};

/// What a chain's faucet sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaucetKind {
    Coin,
    Eip20,
}

impl FromStr for FaucetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coin" => Ok(Self::Coin),
            "eip20" | "erc20" => Ok(Self::Eip20),
            _ => Err(s.to_string()),
        }
    }
}

/// Builds the faucet `funds` describes, sending from `account`.
///
/// Missing keys and unknown types are reported with the account's chain.
pub fn build_faucet(
    account: SigningAccount,
    funds: &FundsConfig,
) -> Result<Arc<dyn Faucet>, ConfigError> {
    let chain = account.chain().to_string();
    let missing = |key| ConfigError::MissingKey {
        chain: chain.clone(),
        key,
    };

    let kind = funds.kind.as_deref().ok_or_else(|| missing("type"))?;
    let kind = kind
        .parse::<FaucetKind>()
        .map_err(|kind| ConfigError::UnknownFaucetType {
            chain: chain.clone(),
            kind,
        })?;
    let amount = funds.amount.ok_or_else(|| missing("amount"))?;
    let policy = FillPolicy::new(amount, funds.threshold.unwrap_or(amount));

    let faucet: Arc<dyn Faucet> = match kind {
        FaucetKind::Coin => Arc::new(CoinFaucet::new(account, policy)?),
        FaucetKind::Eip20 => {
            let token = funds.address.ok_or_else(|| missing("address"))?;
            Arc::new(TokenFaucet::new(account, token, policy)?)
        }
    };

    tracing::info!(
        %chain,
        ?kind,
        address = %faucet.address(),
        amount = %policy.amount,
        threshold = %policy.threshold,
        "faucet ready"
    );
    Ok(faucet)
}

/// Read-only after construction; shared between request handlers.
#[derive(Debug, Default)]
pub struct FaucetRegistry {
    faucets: HashMap<String, Arc<dyn Faucet>>,
}

impl FaucetRegistry {
    /// Registers each faucet under its chain name.
    pub fn new(faucets: impl IntoIterator<Item = Arc<dyn Faucet>>) -> Result<Self, ConfigError> {
        let mut registry = HashMap::new();
        for faucet in faucets {
            let chain = faucet.chain().to_string();
            if registry.contains_key(&chain) {
                return Err(ConfigError::DuplicateChain(chain));
            }
            registry.insert(chain, faucet);
        }
        Ok(Self { faucets: registry })
    }

    /// Connects, unlocks and builds a faucet for each of `chains`.
    ///
    /// Any failure aborts the whole startup.
    pub async fn connect(
        config: &Config,
        chains: &[String],
        passwords: &dyn PasswordSource,
    ) -> Result<Self, ConfigError> {
        if chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        let mut faucets = Vec::with_capacity(chains.len());
        for chain in chains {
            let chain_config = config.chain(chain)?;
            let keystore = config.keystore_path(chain)?;

            tracing::info!(%chain, rpc_url = %chain_config.rpc_url, "connecting to node");
            let node = AlloyNode::connect(&chain_config.rpc_url)
                .await
                .map_err(|e| ConfigError::Connect {
                    chain: chain.clone(),
                    reason: e.to_string(),
                })?;

            let password = passwords.password_for(chain)?;
            let mut account = SigningAccount::new(chain.clone(), Arc::new(node));
            account.unlock_keystore(&keystore, password).await?;

            faucets.push(build_faucet(account, &chain_config.funds)?);
        }

        Self::new(faucets)
    }

    pub fn get(&self, chain: &str) -> Option<&Arc<dyn Faucet>> {
        self.faucets.get(chain)
    }

    /// Served chain names, sorted.
    pub fn chains(&self) -> Vec<&str> {
        let mut chains: Vec<_> = self.faucets.keys().map(String::as_str).collect();
        chains.sort_unstable();
        chains
    }
}
