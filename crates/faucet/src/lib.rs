//! Multi-chain faucet.
//!
//! Hands out a fixed amount of a chain's native coin or of an EIP20 token to
//! beneficiaries whose balance is below a threshold. Each served chain has
//! one operator account, unlocked at startup, and one [`fill::Faucet`]
//! strategy; [`server`] exposes them over HTTP.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod account;
pub mod config;
pub mod contracts;
pub mod error;
pub mod fill;
pub mod keystore;
pub mod node;
pub mod password;
pub mod registry;
pub mod server;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use account::{SigningAccount, TransactionTemplate};
pub use config::Config;
pub use error::{ConfigError, DispatchError, NodeError, PasswordError};
pub use fill::{CoinFaucet, Faucet, FillOutcome, FillPolicy, TokenFaucet};
pub use node::{AlloyNode, NodeClient};
pub use registry::FaucetRegistry;
