//! An in-memory `LedgerClient` double used by the integration tests. It has no notion
//! of a real chain: transactions are just entries a test deposits or this adapter
//! records when `submit_transfer` runs, and everything is "validated" immediately.

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::U256;
use uuid::Uuid;

use crate::model::{Token, WalletSecret};

use super::{GeneratedWallet, LedgerClient, LedgerError, ResolvedTransfer, TransferKind};

#[derive(Debug, Clone)]
struct RecordedTx {
    destination: String,
    asset: Token,
    amount: U256,
}

/// Test-only ledger double. `deposit` lets a test simulate an incoming funding
/// transaction without going through `submit_transfer`.
#[derive(Default)]
pub struct InMemoryLedgerClient {
    balances: DashMap<(String, Token), U256>,
    transactions: DashMap<String, RecordedTx>,
    unfundable: DashMap<String, ()>,
    unreachable_destinations: DashMap<String, ()>,
    failed: DashMap<String, ()>,
}

impl InMemoryLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transaction as if it had settled on the ledger, crediting the
    /// destination's balance, and returns the synthetic transaction id.
    pub fn deposit(&self, destination: &str, asset: Token, amount: U256) -> String {
        let tx_id = Uuid::new_v4().to_string();
        self.transactions.insert(
            tx_id.clone(),
            RecordedTx {
                destination: destination.to_string(),
                asset: asset.clone(),
                amount,
            },
        );
        *self.balances.entry((destination.to_string(), asset)).or_insert(U256::zero()) += amount;
        tx_id
    }

    /// Marks an address as permanently unreachable, so `submit_transfer` from it fails
    /// the way a network partition or a frozen account would.
    pub fn mark_unfundable(&self, address: &str) {
        self.unfundable.insert(address.to_string(), ());
    }

    /// Marks a destination address as rejecting incoming transfers, so `submit_transfer`
    /// *to* it fails while transfers from the same wallet to any other destination still
    /// succeed — simulates a safety-deposit payout to the caller failing after the
    /// principal transfer to the maker has already settled.
    pub fn mark_destination_unreachable(&self, address: &str) {
        self.unreachable_destinations.insert(address.to_string(), ());
    }

    /// Marks a recorded transaction as validated-but-failed, the way an XRPL `tx_id` that
    /// landed with a `tec`-class engine result would — `resolve_tx` reports it as rejected
    /// rather than delivering the amount it was recorded with.
    pub fn mark_tx_failed(&self, tx_id: &str) {
        self.failed.insert(tx_id.to_string(), ());
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedgerClient {
    async fn generate_wallet(&self) -> Result<GeneratedWallet, LedgerError> {
        let address = format!("test{}", Uuid::new_v4().simple());
        Ok(GeneratedWallet {
            address,
            secret: WalletSecret(Uuid::new_v4().as_bytes().to_vec()),
        })
    }

    async fn ensure_funded(&self, _address: &str, _min_native: U256) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn resolve_tx(&self, tx_id: &str) -> Result<ResolvedTransfer, LedgerError> {
        let tx = self.transactions.get(tx_id).ok_or_else(|| LedgerError::NotFound(tx_id.to_string()))?;
        if self.failed.contains_key(tx_id) {
            return Err(LedgerError::Rejected(format!("{tx_id} validated with non-success result")));
        }
        Ok(ResolvedTransfer {
            kind: TransferKind::Payment,
            destination: tx.destination.clone(),
            delivered_amount: tx.amount,
            asset: tx.asset.clone(),
            validated: true,
        })
    }

    async fn read_balance(&self, address: &str, asset: &Token) -> Result<U256, LedgerError> {
        Ok(self.balances.get(&(address.to_string(), asset.clone())).map(|b| *b).unwrap_or_default())
    }

    async fn submit_transfer(
        &self,
        _secret: &WalletSecret,
        from: &str,
        to: &str,
        asset: &Token,
        amount: U256,
    ) -> Result<String, LedgerError> {
        if self.unfundable.contains_key(from) {
            return Err(LedgerError::Network(format!("{from} is unreachable")));
        }
        if self.unreachable_destinations.contains_key(to) {
            return Err(LedgerError::Rejected(format!("{to} refused the transfer")));
        }

        let mut from_balance = self.balances.entry((from.to_string(), asset.clone())).or_insert(U256::zero());
        if *from_balance < amount {
            return Err(LedgerError::Rejected(format!("insufficient balance on {from}")));
        }
        *from_balance -= amount;
        drop(from_balance);

        *self.balances.entry((to.to_string(), asset.clone())).or_insert(U256::zero()) += amount;

        Ok(self.deposit(to, asset.clone(), amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deposit_then_submit_transfer_moves_balance() {
        let ledger = InMemoryLedgerClient::new();
        let tx_id = ledger.deposit("alice", Token::Native, U256::from(1000));
        let resolved = ledger.resolve_tx(&tx_id).await.unwrap();
        assert_eq!(resolved.delivered_amount, U256::from(1000));

        let secret = WalletSecret(vec![0u8; 32]);
        ledger.submit_transfer(&secret, "alice", "bob", &Token::Native, U256::from(400)).await.unwrap();

        assert_eq!(ledger.read_balance("alice", &Token::Native).await.unwrap(), U256::from(600));
        assert_eq!(ledger.read_balance("bob", &Token::Native).await.unwrap(), U256::from(400));
    }

    #[tokio::test]
    async fn submit_transfer_rejects_insufficient_balance() {
        let ledger = InMemoryLedgerClient::new();
        let secret = WalletSecret(vec![0u8; 32]);
        let result = ledger.submit_transfer(&secret, "alice", "bob", &Token::Native, U256::from(1)).await;
        assert!(matches!(result, Err(LedgerError::Rejected(_))));
    }

    #[tokio::test]
    async fn mark_unfundable_fails_future_transfers() {
        let ledger = InMemoryLedgerClient::new();
        ledger.deposit("alice", Token::Native, U256::from(1000));
        ledger.mark_unfundable("alice");
        let secret = WalletSecret(vec![0u8; 32]);
        let result = ledger.submit_transfer(&secret, "alice", "bob", &Token::Native, U256::from(1)).await;
        assert!(matches!(result, Err(LedgerError::Network(_))));
    }

    #[tokio::test]
    async fn mark_destination_unreachable_fails_only_transfers_to_that_address() {
        let ledger = InMemoryLedgerClient::new();
        ledger.deposit("alice", Token::Native, U256::from(1000));
        ledger.mark_destination_unreachable("bob");
        let secret = WalletSecret(vec![0u8; 32]);

        let to_bob = ledger.submit_transfer(&secret, "alice", "bob", &Token::Native, U256::from(1)).await;
        assert!(matches!(to_bob, Err(LedgerError::Rejected(_))));

        let to_carol = ledger.submit_transfer(&secret, "alice", "carol", &Token::Native, U256::from(1)).await;
        assert!(to_carol.is_ok());
    }

    #[tokio::test]
    async fn mark_tx_failed_makes_resolve_tx_report_rejected() {
        let ledger = InMemoryLedgerClient::new();
        let tx_id = ledger.deposit("alice", Token::Native, U256::from(1000));
        ledger.mark_tx_failed(&tx_id);
        let result = ledger.resolve_tx(&tx_id).await;
        assert!(matches!(result, Err(LedgerError::Rejected(_))));
    }
}
