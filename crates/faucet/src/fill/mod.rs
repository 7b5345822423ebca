//! Strategies for topping up a beneficiary.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::error::DispatchError;

mod coin;
mod token;

pub use coin::CoinFaucet;
pub use token::TokenFaucet;

/// How much a faucet sends and when it refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillPolicy {
    /// Sent per successful fill.
    pub amount: U256,
    /// Beneficiaries holding at least this much are already funded.
    pub threshold: U256,
}

impl FillPolicy {
    pub fn new(amount: U256, threshold: U256) -> Self {
        Self { amount, threshold }
    }

    fn is_funded(&self, balance: U256) -> bool {
        balance >= self.threshold
    }
}

/// Successful result of [`Faucet::fill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// A transfer was accepted by the node.
    Sent(TxHash),
    /// Nothing was sent, the beneficiary's balance is at or above threshold.
    AlreadyFunded { balance: U256 },
}

/// A funding strategy bound to one chain's operator account.
#[async_trait]
pub trait Faucet: Send + Sync + std::fmt::Debug {
    /// Chain this faucet sends on.
    fn chain(&self) -> &str;

    /// Operator address funds are sent from.
    fn address(&self) -> Address;

    fn policy(&self) -> FillPolicy;

    /// Tops up `beneficiary` unless it is already funded.
    ///
    /// Never retries. The balance check and the transfer are not atomic, so
    /// two concurrent fills for the same beneficiary may both send.
    async fn fill(&self, beneficiary: Address) -> Result<FillOutcome, DispatchError>;
}
