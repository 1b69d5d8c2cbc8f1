//! Escrow and wallet-secret records, and the value types that fill them.

use std::collections::BTreeSet;

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::Timelocks;

pub type EscrowId = Uuid;

/// Asset selector: the chain's native coin, or an asset identifier native to that chain
/// (an XRPL issued-currency `currency/issuer` pair, a Cardano policy/asset id, etc).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Native,
    Asset(String),
}

impl Token {
    pub fn is_native(&self) -> bool {
        matches!(self, Token::Native)
    }
}

/// Which leg of the swap this escrow represents; determines the refund split on cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowSide {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Created,
    Funded,
    Withdrawn,
    Cancelled,
    Rescued,
}

/// The native-asset and token amounts a caller must deliver to the funding address
/// before the escrow can move from `Created` to `Funded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredDeposit {
    pub native: U256,
    pub token: U256,
}

impl RequiredDeposit {
    pub fn compute(token: &Token, amount: U256, safety_deposit: U256) -> Self {
        if token.is_native() {
            RequiredDeposit {
                native: amount + safety_deposit,
                token: U256::zero(),
            }
        } else {
            RequiredDeposit {
                native: safety_deposit,
                token: amount,
            }
        }
    }
}

/// A single custodial-wallet transfer produced while settling an escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementTransfer {
    pub tx_id: String,
    pub to: String,
    pub asset: Token,
    pub amount: U256,
}

/// The escrow record: created once, mutated only through `EscrowStore`'s typed transitions.
#[derive(Debug, Clone)]
pub struct EscrowRecord {
    pub id: EscrowId,
    pub order_hash: [u8; 32],
    pub hashlock: [u8; 32],
    pub maker: String,
    pub taker: String,
    pub token: Token,
    pub amount: U256,
    pub safety_deposit: U256,
    pub timelocks: Timelocks,
    pub wallet_address: String,
    pub status: EscrowStatus,
    pub funding_tx_ids: BTreeSet<String>,
    pub secret: Option<[u8; 32]>,
    pub settlement_tx_ids: Vec<SettlementTransfer>,
    pub escrow_side: EscrowSide,
}

impl EscrowRecord {
    pub fn required_deposit(&self) -> RequiredDeposit {
        RequiredDeposit::compute(&self.token, self.amount, self.safety_deposit)
    }
}

/// Private signing material for one escrow's custodial wallet, stored only in the
/// wallet-secret store and never surfaced by any query path.
#[derive(Clone)]
pub struct WalletSecret(pub Vec<u8>);

impl std::fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WalletSecret").field(&"<redacted>").finish()
    }
}
