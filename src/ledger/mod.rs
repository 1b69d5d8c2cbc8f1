//! The ledger client adapter: the capability interface that lets the escrow state
//! machine target different external chains without knowing their wire formats.

pub mod cardano;
pub mod memory;
pub mod xrpl;

use async_trait::async_trait;
use ethers::types::U256;
use thiserror::Error;

use crate::model::{Token, WalletSecret};

#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("transaction not yet validated: {0}")]
    NotValidated(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// A fresh custodial wallet: the address recorded on the escrow and the secret kept
/// only in the wallet-secret store.
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    pub address: String,
    pub secret: WalletSecret,
}

/// The ledger-native transfer type a resolved transaction reports. Only `Payment`
/// (a plain value transfer) is acceptable as a funding deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Payment,
    Other(String),
}

/// What `resolve_tx` reports about a transaction id.
#[derive(Debug, Clone)]
pub struct ResolvedTransfer {
    pub kind: TransferKind,
    pub destination: String,
    pub delivered_amount: U256,
    pub asset: Token,
    pub validated: bool,
}

/// The capability set the escrow state machine depends on. Implemented at least twice:
/// an XRPL adapter (the reference target) and an in-memory adapter used by tests.
/// A Cardano adapter demonstrates the same seam without being wired to a real node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Generates a fresh keypair with cryptographically secure entropy.
    async fn generate_wallet(&self) -> Result<GeneratedWallet, LedgerError>;

    /// Testnet-only faucet top-up; production adapters should treat this as a no-op
    /// when `faucet_enabled` is false in configuration (see `Config`).
    async fn ensure_funded(&self, address: &str, min_native: U256) -> Result<(), LedgerError>;

    /// Resolves a ledger transaction id to its settled effect.
    async fn resolve_tx(&self, tx_id: &str) -> Result<ResolvedTransfer, LedgerError>;

    /// Reads the confirmed balance of `address` in `asset`.
    async fn read_balance(&self, address: &str, asset: &Token) -> Result<U256, LedgerError>;

    /// Builds, signs, and submits a value transfer, waiting for validated inclusion.
    /// Returns the transaction id only for a validated, successful transfer.
    async fn submit_transfer(
        &self,
        secret: &WalletSecret,
        from: &str,
        to: &str,
        asset: &Token,
        amount: U256,
    ) -> Result<String, LedgerError>;
}
