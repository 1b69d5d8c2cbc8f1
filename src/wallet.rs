//! Custodial wallet manager: one keypair per escrow, secret material held only here.
//!
//! The public escrow record only ever learns the funding address; the signing material
//! lives exclusively in this store and is looked up by escrow id to sign a settlement.

use dashmap::DashMap;
use ethers::types::U256;

use crate::ledger::{GeneratedWallet, LedgerClient, LedgerError};
use crate::model::{EscrowId, Token, WalletSecret};

/// Keyed by escrow id, read-only after insertion. Nothing ever removes an entry except
/// process exit — there is no durability requirement and no query path returns a secret.
#[derive(Default)]
pub struct WalletManager {
    secrets: DashMap<EscrowId, WalletSecret>,
}

impl WalletManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh custodial wallet for `escrow_id` and retains its secret.
    /// Returns only the public address; the caller has no way to retrieve the secret.
    pub async fn provision(
        &self,
        escrow_id: EscrowId,
        ledger: &dyn LedgerClient,
    ) -> Result<String, LedgerError> {
        let GeneratedWallet { address, secret } = ledger.generate_wallet().await?;
        self.secrets.insert(escrow_id, secret);
        Ok(address)
    }

    /// Signs and submits a transfer on behalf of `escrow_id`'s custodial wallet.
    pub async fn sign_and_submit(
        &self,
        escrow_id: EscrowId,
        ledger: &dyn LedgerClient,
        from: &str,
        to: &str,
        asset: &Token,
        amount: U256,
    ) -> Result<String, LedgerError> {
        let secret = self
            .secrets
            .get(&escrow_id)
            .ok_or_else(|| LedgerError::Signing(format!("no wallet secret for escrow {escrow_id}")))?;
        ledger.submit_transfer(&secret, from, to, asset, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::InMemoryLedgerClient;
    use uuid::Uuid;

    #[tokio::test]
    async fn provision_then_sign_and_submit_moves_funds() {
        let ledger = InMemoryLedgerClient::new();
        let manager = WalletManager::new();
        let escrow_id = Uuid::new_v4();

        let address = manager.provision(escrow_id, &ledger).await.unwrap();
        ledger.deposit(&address, Token::Native, U256::from(500));

        let tx_id = manager
            .sign_and_submit(escrow_id, &ledger, &address, "bob", &Token::Native, U256::from(500))
            .await
            .unwrap();
        assert!(!tx_id.is_empty());
    }

    #[tokio::test]
    async fn sign_and_submit_fails_for_unknown_escrow() {
        let ledger = InMemoryLedgerClient::new();
        let manager = WalletManager::new();
        let result = manager
            .sign_and_submit(Uuid::new_v4(), &ledger, "a", "b", &Token::Native, U256::from(1))
            .await;
        assert!(matches!(result, Err(LedgerError::Signing(_))));
    }
}
