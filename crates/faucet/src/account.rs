//! The operator account a faucet sends from.
//!
//! One [`SigningAccount`] exists per chain for the lifetime of the process.
//! It owns the decrypted key and the cached nonce counter, and is the only
//! place transactions are signed and handed to the node.

use std::{path::Path, sync::Arc};

use alloy::{
    consensus::TxEnvelope,
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use zeroize::Zeroizing;

use crate::{
    error::{ConfigError, DispatchError},
    keystore,
    node::NodeClient,
};

/// What a faucet wants sent, before nonce, gas and signature are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTemplate {
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

impl TransactionTemplate {
    /// A plain value transfer.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            input: Bytes::new(),
        }
    }

    /// A contract call carrying no value.
    pub fn call(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            input: input.into(),
        }
    }

    fn into_request(self, from: Address) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.input)
    }
}

pub struct SigningAccount {
    chain: String,
    node: Arc<dyn NodeClient>,
    signer: Option<PrivateKeySigner>,
    chain_id: OnceCell<u64>,
    /// Next nonce to hand out, `None` until read from the node.
    next_nonce: Mutex<Option<u64>>,
}

impl std::fmt::Debug for SigningAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningAccount")
            .field("chain", &self.chain)
            .field("address", &self.signer.as_ref().map(|s| s.address()))
            .finish_non_exhaustive()
    }
}

impl SigningAccount {
    /// Creates a locked account for `chain`.
    pub fn new(chain: impl Into<String>, node: Arc<dyn NodeClient>) -> Self {
        Self {
            chain: chain.into(),
            node,
            signer: None,
            chain_id: OnceCell::new(),
            next_nonce: Mutex::new(None),
        }
    }

    pub fn with_signer(
        chain: impl Into<String>,
        node: Arc<dyn NodeClient>,
        signer: PrivateKeySigner,
    ) -> Self {
        let mut account = Self::new(chain, node);
        account.unlock(signer);
        account
    }

    pub fn unlock(&mut self, signer: PrivateKeySigner) {
        tracing::info!(chain = %self.chain, address = %signer.address(), "unlocked account");
        self.signer = Some(signer);
    }

    /// Decrypts the keystore at `path` and keeps the key in memory.
    pub async fn unlock_keystore(
        &mut self,
        path: &Path,
        password: Zeroizing<String>,
    ) -> Result<(), ConfigError> {
        tracing::info!(chain = %self.chain, keystore = %path.display(), "unlocking account");
        let signer = keystore::decrypt(&self.chain, path, password).await?;
        self.unlock(signer);
        Ok(())
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn node(&self) -> &dyn NodeClient {
        self.node.as_ref()
    }

    pub fn is_unlocked(&self) -> bool {
        self.signer.is_some()
    }

    /// The public address of this account.
    pub fn address(&self) -> Result<Address, ConfigError> {
        self.signer().map(|signer| signer.address())
    }

    fn signer(&self) -> Result<&PrivateKeySigner, ConfigError> {
        self.signer
            .as_ref()
            .ok_or_else(|| ConfigError::Locked(self.chain.clone()))
    }

    /// The cached next nonce, `None` if it has not been read from the node
    /// yet. Waits for any in-flight reservation to finish.
    pub async fn cached_nonce(&self) -> Option<u64> {
        *self.next_nonce.lock().await
    }

    /// Reserves the next nonce of this account.
    ///
    /// The first reservation reads the pending transaction count from the
    /// node. The account stays reserved until the returned guard is consumed
    /// by [`Self::submit`] or dropped, so concurrent callers observe disjoint,
    /// increasing nonces.
    pub async fn next_nonce(&self) -> Result<NonceReservation<'_>, DispatchError> {
        let address = self.address()?;
        let mut next = self.next_nonce.lock().await;

        let nonce = match *next {
            Some(nonce) => nonce,
            None => {
                let nonce = self
                    .node
                    .pending_transaction_count(address)
                    .await
                    .map_err(DispatchError::Nonce)?;
                tracing::debug!(chain = %self.chain, nonce, "fetched nonce from node");
                *next = Some(nonce);
                nonce
            }
        };

        Ok(NonceReservation { next, nonce })
    }

    /// Fills in gas and `reservation`'s nonce and signs the result.
    ///
    /// Gas estimation doubles as a pre-flight check: a transaction that
    /// would revert fails here and never reaches the node's pool.
    pub async fn sign_and_estimate(
        &self,
        template: TransactionTemplate,
        reservation: &NonceReservation<'_>,
    ) -> Result<TxEnvelope, DispatchError> {
        let signer = self.signer()?;
        let request = template.into_request(signer.address());

        let gas_limit = self
            .node
            .estimate_gas(request.clone())
            .await
            .map_err(DispatchError::GasEstimation)?;
        let gas_price = self
            .node
            .gas_price()
            .await
            .map_err(DispatchError::GasPrice)?;
        let chain_id = self.chain_id().await?;

        let request = request
            .with_nonce(reservation.nonce())
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_chain_id(chain_id);

        let wallet = EthereumWallet::from(signer.clone());
        request
            .build(&wallet)
            .await
            .map_err(|e| DispatchError::Signing(e.to_string()))
    }

    /// Submits `tx` and releases `reservation`.
    ///
    /// The nonce counter only advances once the node accepted the
    /// transaction. A rejection clears it so the next reservation reads the
    /// count from the node again.
    pub async fn submit(
        &self,
        tx: TxEnvelope,
        reservation: NonceReservation<'_>,
    ) -> Result<TxHash, DispatchError> {
        let raw = tx.encoded_2718();
        match self.node.submit(raw.into()).await {
            Ok(tx_hash) => {
                tracing::debug!(
                    chain = %self.chain,
                    nonce = reservation.nonce(),
                    %tx_hash,
                    "transaction accepted by node"
                );
                reservation.commit();
                Ok(tx_hash)
            }
            Err(error) => {
                reservation.invalidate();
                Err(DispatchError::Submission(error))
            }
        }
    }

    /// Reserves a nonce, signs `template` with it and submits it.
    pub async fn send(&self, template: TransactionTemplate) -> Result<TxHash, DispatchError> {
        let reservation = self.next_nonce().await?;
        let tx = self.sign_and_estimate(template, &reservation).await?;
        self.submit(tx, reservation).await
    }

    async fn chain_id(&self) -> Result<u64, DispatchError> {
        self.chain_id
            .get_or_try_init(|| async {
                self.node
                    .chain_id()
                    .await
                    .map_err(DispatchError::ChainId)
            })
            .await
            .copied()
    }
}

/// Exclusive hold on an account's nonce counter.
///
/// Dropping it without [`Self::commit`] leaves the counter where it was, so
/// a failed estimation or signing step consumes no nonce.
#[must_use = "a reservation holds the account until it is dropped"]
pub struct NonceReservation<'a> {
    next: MutexGuard<'a, Option<u64>>,
    nonce: u64,
}

impl NonceReservation<'_> {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    fn commit(mut self) {
        *self.next = Some(self.nonce + 1);
    }

    fn invalidate(mut self) {
        *self.next = None;
    }
}

impl std::fmt::Debug for NonceReservation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceReservation")
            .field("nonce", &self.nonce)
            .finish()
    }
}
