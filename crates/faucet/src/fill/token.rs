use alloy::{primitives::Address, sol_types::SolCall};
use async_trait::async_trait;

use super::{Faucet, FillOutcome, FillPolicy};
use crate::{
    account::{SigningAccount, TransactionTemplate},
    contracts::IERC20,
    error::{ConfigError, DispatchError},
};

/// Transfers units of an EIP20 token contract.
#[derive(Debug)]
pub struct TokenFaucet {
    account: SigningAccount,
    address: Address,
    token: Address,
    policy: FillPolicy,
}

impl TokenFaucet {
    /// Fails if `account` is still locked.
    pub fn new(
        account: SigningAccount,
        token: Address,
        policy: FillPolicy,
    ) -> Result<Self, ConfigError> {
        let address = account.address()?;
        Ok(Self {
            account,
            address,
            token,
            policy,
        })
    }

    pub fn account(&self) -> &SigningAccount {
        &self.account
    }
}

#[async_trait]
impl Faucet for TokenFaucet {
    fn chain(&self) -> &str {
        self.account.chain()
    }

    fn address(&self) -> Address {
        self.address
    }

    fn policy(&self) -> FillPolicy {
        self.policy
    }

    async fn fill(&self, beneficiary: Address) -> Result<FillOutcome, DispatchError> {
        let node = self.account.node();

        let balance = node
            .token_balance_of(self.token, beneficiary)
            .await
            .map_err(|source| DispatchError::Balance {
                address: beneficiary,
                source,
            })?;
        if self.policy.is_funded(balance) {
            tracing::debug!(chain = %self.chain(), %beneficiary, %balance, "already funded");
            return Ok(FillOutcome::AlreadyFunded { balance });
        }

        let available = node
            .token_balance_of(self.token, self.address)
            .await
            .map_err(|source| DispatchError::Balance {
                address: self.address,
                source,
            })?;
        if available < self.policy.amount {
            tracing::warn!(
                chain = %self.chain(),
                token = %self.token,
                %available,
                required = %self.policy.amount,
                "faucet is out of tokens"
            );
            return Err(DispatchError::InsufficientFunds {
                available,
                required: self.policy.amount,
            });
        }

        let call = IERC20::transferCall {
            to: beneficiary,
            amount: self.policy.amount,
        };
        let tx_hash = self
            .account
            .send(TransactionTemplate::call(self.token, call.abi_encode()))
            .await?;

        tracing::info!(
            chain = %self.chain(),
            token = %self.token,
            %beneficiary,
            amount = %self.policy.amount,
            %tx_hash,
            "sent tokens"
        );
        Ok(FillOutcome::Sent(tx_hash))
    }
}
