//! Trust-minimized escrow coordinator: the custodial-wallet half of a cross-chain
//! atomic swap, standing in for an on-chain HTLC on ledgers that can't express its
//! multi-phase timelock semantics natively.

pub mod codec;
pub mod config;
pub mod error;
pub mod escrow;
pub mod ledger;
pub mod model;
pub mod phase;
pub mod retry;
pub mod routes;
pub mod store;
pub mod wallet;
