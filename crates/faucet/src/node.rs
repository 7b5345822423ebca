//! Connection to a chain's remote node.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::{contracts::IERC20, error::NodeError};

/// The remote node operations a faucet depends on.
///
/// Every call is a single round-trip; implementations must not retry.
#[async_trait]
pub trait NodeClient: Send + Sync + std::fmt::Debug {
    async fn chain_id(&self) -> Result<u64, NodeError>;

    /// Native coin balance of `address`.
    async fn balance_of(&self, address: Address) -> Result<U256, NodeError>;

    /// Balance of `owner` on the EIP20 contract at `token`.
    async fn token_balance_of(&self, token: Address, owner: Address) -> Result<U256, NodeError>;

    /// Number of transactions sent from `address`, including pending ones.
    async fn pending_transaction_count(&self, address: Address) -> Result<u64, NodeError>;

    async fn gas_price(&self) -> Result<u128, NodeError>;

    /// Estimates the gas `request` uses. A call that would revert fails here.
    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, NodeError>;

    /// Hands a signed, EIP-2718 encoded transaction to the node.
    ///
    /// Resolves as soon as the node accepts it into its pool, not when it is
    /// mined.
    async fn submit(&self, raw: Bytes) -> Result<TxHash, NodeError>;
}

/// [`NodeClient`] backed by an alloy provider.
#[derive(Clone)]
pub struct AlloyNode {
    provider: DynProvider,
}

impl std::fmt::Debug for AlloyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyNode").finish_non_exhaustive()
    }
}

impl AlloyNode {
    /// Connects to `rpc_url`, over websocket or http depending on its scheme.
    pub async fn connect(rpc_url: &str) -> Result<Self, NodeError> {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect(rpc_url)
            .await
            .map_err(|e| NodeError::new("connect", e))?;

        Ok(Self {
            provider: provider.erased(),
        })
    }
}

#[async_trait]
impl NodeClient for AlloyNode {
    async fn chain_id(&self) -> Result<u64, NodeError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| NodeError::new("eth_chainId", e))
    }

    async fn balance_of(&self, address: Address) -> Result<U256, NodeError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| NodeError::new("eth_getBalance", e))
    }

    async fn token_balance_of(&self, token: Address, owner: Address) -> Result<U256, NodeError> {
        let call = IERC20::balanceOfCall { owner };
        let request = TransactionRequest::default()
            .with_to(token)
            .with_input(call.abi_encode());

        let output = self
            .provider
            .call(request)
            .await
            .map_err(|e| NodeError::new("eth_call", e))?;

        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| NodeError::new("eth_call", format!("invalid balanceOf return data: {e}")))
    }

    async fn pending_transaction_count(&self, address: Address) -> Result<u64, NodeError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| NodeError::new("eth_getTransactionCount", e))
    }

    async fn gas_price(&self) -> Result<u128, NodeError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| NodeError::new("eth_gasPrice", e))
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, NodeError> {
        self.provider
            .estimate_gas(request)
            .await
            .map_err(|e| NodeError::new("eth_estimateGas", e))
    }

    async fn submit(&self, raw: Bytes) -> Result<TxHash, NodeError> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| NodeError::new("eth_sendRawTransaction", e))?;

        Ok(*pending.tx_hash())
    }
}
