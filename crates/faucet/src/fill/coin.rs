use alloy::primitives::Address;
use async_trait::async_trait;

use super::{Faucet, FillOutcome, FillPolicy};
use crate::{
    account::{SigningAccount, TransactionTemplate},
    error::{ConfigError, DispatchError},
};

/// Sends the chain's native coin.
#[derive(Debug)]
pub struct CoinFaucet {
    account: SigningAccount,
    address: Address,
    policy: FillPolicy,
}

impl CoinFaucet {
    /// Fails if `account` is still locked.
    pub fn new(account: SigningAccount, policy: FillPolicy) -> Result<Self, ConfigError> {
        let address = account.address()?;
        Ok(Self {
            account,
            address,
            policy,
        })
    }

    pub fn account(&self) -> &SigningAccount {
        &self.account
    }
}

#[async_trait]
impl Faucet for CoinFaucet {
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
        let balance = self
            .account
            .node()
            .balance_of(beneficiary)
            .await
            .map_err(|source| DispatchError::Balance {
                address: beneficiary,
                source,
            })?;

        if self.policy.is_funded(balance) {
            tracing::debug!(chain = %self.chain(), %beneficiary, %balance, "already funded");
            return Ok(FillOutcome::AlreadyFunded { balance });
        }

        let tx_hash = self
            .account
            .send(TransactionTemplate::transfer(beneficiary, self.policy.amount))
            .await?;

        tracing::info!(
            chain = %self.chain(),
            %beneficiary,
            amount = %self.policy.amount,
            %tx_hash,
            "sent coins"
        );
        Ok(FillOutcome::Sent(tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::{consensus::Transaction as _, primitives::U256};

    use super::*;
    use crate::test_utils::{MockNode, test_signer};

    fn faucet(node: &Arc<MockNode>, amount: u64, threshold: u64) -> CoinFaucet {
        let account = SigningAccount::with_signer("dev", node.clone(), test_signer());
        CoinFaucet::new(
            account,
            FillPolicy::new(U256::from(amount), U256::from(threshold)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_full_amount_below_threshold() {
        let beneficiary = Address::with_last_byte(0xb0);
        let node = Arc::new(MockNode::default().with_balance(beneficiary, U256::from(10)));
        let faucet = faucet(&node, 100, 50);

        let outcome = faucet.fill(beneficiary).await.unwrap();

        let sent = node.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(outcome, FillOutcome::Sent(*sent[0].tx_hash()));
        assert_eq!(sent[0].to(), Some(beneficiary));
        assert_eq!(sent[0].value(), U256::from(100));
        assert!(sent[0].input().is_empty());
    }

    #[tokio::test]
    async fn funded_beneficiary_is_left_alone() {
        let beneficiary = Address::with_last_byte(0xb0);
        let node = Arc::new(MockNode::default().with_balance(beneficiary, U256::from(50)));
        let faucet = faucet(&node, 100, 50);

        for _ in 0..3 {
            let outcome = faucet.fill(beneficiary).await.unwrap();
            assert_eq!(
                outcome,
                FillOutcome::AlreadyFunded {
                    balance: U256::from(50)
                }
            );
        }

        let calls = node.calls();
        assert_eq!(calls.submit, 0);
        assert_eq!(calls.estimate_gas, 0);
        assert_eq!(calls.pending_transaction_count, 0);
    }

    #[tokio::test]
    async fn balance_failure_is_reported() {
        let beneficiary = Address::with_last_byte(0xb0);
        let node = Arc::new(MockNode::default());
        node.fail_balance("connection refused");
        let faucet = faucet(&node, 100, 50);

        let err = faucet.fill(beneficiary).await.unwrap_err();

        assert!(matches!(err, DispatchError::Balance { address, .. } if address == beneficiary));
        assert_eq!(node.calls().submit, 0);
    }

    #[tokio::test]
    async fn reverting_transfer_consumes_no_nonce() {
        let node = Arc::new(MockNode::default().with_pending_count(6));
        let faucet = faucet(&node, 100, 50);
        faucet.fill(Address::with_last_byte(1)).await.unwrap();

        node.fail_estimate_gas("execution reverted");
        let err = faucet.fill(Address::with_last_byte(2)).await.unwrap_err();

        assert!(matches!(err, DispatchError::GasEstimation(_)));
        assert_eq!(faucet.account().cached_nonce().await, Some(7));
        assert_eq!(node.calls().submit, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fills_use_contiguous_nonces() {
        let node = Arc::new(MockNode::default().with_pending_count(20));
        let faucet = Arc::new(faucet(&node, 1, 1));

        let fills: Vec<_> = (0..32u8)
            .map(|i| {
                let faucet = faucet.clone();
                tokio::spawn(async move { faucet.fill(Address::with_last_byte(i)).await })
            })
            .collect();
        for fill in futures::future::join_all(fills).await {
            assert!(matches!(fill.unwrap(), Ok(FillOutcome::Sent(_))));
        }

        let mut nonces: Vec<_> = node.submitted().iter().map(|tx| tx.nonce()).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, (20..52).collect::<Vec<_>>());
        assert_eq!(node.calls().pending_transaction_count, 1);
        assert_eq!(faucet.account().cached_nonce().await, Some(52));
    }

    #[test]
    fn locked_account_cannot_back_a_faucet() {
        let node = Arc::new(MockNode::default());
        let account = SigningAccount::new("dev", node);

        let err = CoinFaucet::new(account, FillPolicy::new(U256::ONE, U256::ONE)).unwrap_err();
        assert!(matches!(err, ConfigError::Locked(_)));
    }
}
