//! A Cardano adapter stub. It demonstrates that `LedgerClient` is a real seam — a
//! second UTXO-model chain can implement the same trait the XRPL adapter does — without
//! being wired to a running `cardano-node` or wallet backend. Every method returns
//! `LedgerError::Network`, the same error a real adapter would surface if its backend
//! were unreachable.

use async_trait::async_trait;
use ethers::types::U256;

use crate::model::{Token, WalletSecret};

use super::{GeneratedWallet, LedgerClient, LedgerError, ResolvedTransfer};

#[derive(Debug, Clone)]
pub struct CardanoConfig {
    pub node_socket: String,
}

pub struct CardanoLedgerClient {
    config: CardanoConfig,
}

impl CardanoLedgerClient {
    pub fn new(config: CardanoConfig) -> Self {
        Self { config }
    }

    fn unimplemented(&self, operation: &str) -> LedgerError {
        LedgerError::Network(format!("cardano adapter ({}) has no backend wired for {operation}", self.config.node_socket))
    }
}

#[async_trait]
impl LedgerClient for CardanoLedgerClient {
    async fn generate_wallet(&self) -> Result<GeneratedWallet, LedgerError> {
        Err(self.unimplemented("generate_wallet"))
    }

    async fn ensure_funded(&self, _address: &str, _min_native: U256) -> Result<(), LedgerError> {
        Err(self.unimplemented("ensure_funded"))
    }

    async fn resolve_tx(&self, _tx_id: &str) -> Result<ResolvedTransfer, LedgerError> {
        Err(self.unimplemented("resolve_tx"))
    }

    async fn read_balance(&self, _address: &str, _asset: &Token) -> Result<U256, LedgerError> {
        Err(self.unimplemented("read_balance"))
    }

    async fn submit_transfer(
        &self,
        _secret: &WalletSecret,
        _from: &str,
        _to: &str,
        _asset: &Token,
        _amount: U256,
    ) -> Result<String, LedgerError> {
        Err(self.unimplemented("submit_transfer"))
    }
}
