//! In-memory node for exercising faucets without a chain.

use std::{collections::HashMap, sync::Arc};

use alloy::{
    consensus::TxEnvelope,
    eips::eip2718::Decodable2718,
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{error::NodeError, node::NodeClient};

/// First well-known development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_signer() -> PrivateKeySigner {
    TEST_PRIVATE_KEY.parse().expect("valid test key")
}

/// Number of calls a [`MockNode`] received, per method.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub chain_id: usize,
    pub balance_of: usize,
    pub token_balance_of: usize,
    pub pending_transaction_count: usize,
    pub gas_price: usize,
    pub estimate_gas: usize,
    pub submit: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.chain_id
            + self.balance_of
            + self.token_balance_of
            + self.pending_transaction_count
            + self.gas_price
            + self.estimate_gas
            + self.submit
    }
}

#[derive(Debug, Default)]
struct State {
    chain_id: u64,
    gas_price: u128,
    pending_count: u64,
    balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    fail_balance: Option<String>,
    fail_estimate_gas: Option<String>,
    fail_submit: Option<String>,
    /// Closed to let held estimations through.
    estimate_gate: Option<Arc<Semaphore>>,
    calls: Calls,
    submitted: Vec<TxEnvelope>,
}

/// [`NodeClient`] answering from scripted state.
///
/// Every call yields to the scheduler once before answering, so concurrent
/// callers interleave the way they would against a remote node. Accepted
/// transactions are decoded and kept, and bump the pending count the way a
/// real pool would. Unset balances read as zero.
#[derive(Debug)]
pub struct MockNode {
    state: Mutex<State>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                chain_id: Self::DEFAULT_CHAIN_ID,
                gas_price: Self::DEFAULT_GAS_PRICE,
                ..Default::default()
            }),
        }
    }
}

impl MockNode {
    pub const DEFAULT_CHAIN_ID: u64 = 31337;
    pub const DEFAULT_GAS_PRICE: u128 = 1_000_000_000;
    pub const DEFAULT_GAS: u64 = 21_000;

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.state.lock().chain_id = chain_id;
        self
    }

    pub fn with_gas_price(self, gas_price: u128) -> Self {
        self.state.lock().gas_price = gas_price;
        self
    }

    pub fn with_pending_count(self, count: u64) -> Self {
        self.set_pending_count(count);
        self
    }

    pub fn with_balance(self, address: Address, balance: U256) -> Self {
        self.state.lock().balances.insert(address, balance);
        self
    }

    pub fn with_token_balance(self, token: Address, owner: Address, balance: U256) -> Self {
        self.state
            .lock()
            .token_balances
            .insert((token, owner), balance);
        self
    }

    pub fn set_pending_count(&self, count: u64) {
        self.state.lock().pending_count = count;
    }

    /// Makes every balance read fail with `message`.
    pub fn fail_balance(&self, message: &str) {
        self.state.lock().fail_balance = Some(message.to_string());
    }

    pub fn fail_estimate_gas(&self, message: &str) {
        self.state.lock().fail_estimate_gas = Some(message.to_string());
    }

    pub fn fail_submit(&self, message: &str) {
        self.state.lock().fail_submit = Some(message.to_string());
    }

    /// Makes gas estimation wait until [`Self::release_estimate_gas`].
    pub fn hold_estimate_gas(&self) {
        self.state.lock().estimate_gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_estimate_gas(&self) {
        if let Some(gate) = self.state.lock().estimate_gate.take() {
            gate.close();
        }
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.fail_balance = None;
        state.fail_estimate_gas = None;
        state.fail_submit = None;
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().calls
    }

    /// Transactions accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<TxEnvelope> {
        self.state.lock().submitted.clone()
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn chain_id(&self) -> Result<u64, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.chain_id += 1;
        Ok(state.chain_id)
    }

    async fn balance_of(&self, address: Address) -> Result<U256, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.balance_of += 1;
        if let Some(message) = &state.fail_balance {
            return Err(NodeError::new("eth_getBalance", message));
        }
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn token_balance_of(&self, token: Address, owner: Address) -> Result<U256, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.token_balance_of += 1;
        if let Some(message) = &state.fail_balance {
            return Err(NodeError::new("eth_call", message));
        }
        Ok(state
            .token_balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn pending_transaction_count(&self, _address: Address) -> Result<u64, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.pending_transaction_count += 1;
        Ok(state.pending_count)
    }

    async fn gas_price(&self) -> Result<u128, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.gas_price += 1;
        Ok(state.gas_price)
    }

    async fn estimate_gas(&self, _request: TransactionRequest) -> Result<u64, NodeError> {
        tokio::task::yield_now().await;
        let gate = {
            let mut state = self.state.lock();
            state.calls.estimate_gas += 1;
            state.estimate_gate.clone()
        };
        if let Some(gate) = gate {
            // fails once the gate is closed
            let _ = gate.acquire().await;
        }

        let state = self.state.lock();
        if let Some(message) = &state.fail_estimate_gas {
            return Err(NodeError::new("eth_estimateGas", message));
        }
        Ok(Self::DEFAULT_GAS)
    }

    async fn submit(&self, raw: Bytes) -> Result<TxHash, NodeError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.submit += 1;
        if let Some(message) = &state.fail_submit {
            return Err(NodeError::new("eth_sendRawTransaction", message));
        }

        let tx = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| NodeError::new("eth_sendRawTransaction", e))?;
        let tx_hash = *tx.tx_hash();
        state.submitted.push(tx);
        state.pending_count += 1;
        Ok(tx_hash)
    }
}
