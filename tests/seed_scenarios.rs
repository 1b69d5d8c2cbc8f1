//! End-to-end run of the escrow lifecycle against the in-memory ledger adapter,
//! exercising the full create -> fund -> withdraw/cancel/rescue path the way a real
//! caller would drive it through the public `escrow` API rather than one function
//! at a time.

use std::sync::Arc;

use escrow_coordinator::codec::{self, PhaseOffsets, Timelocks};
use escrow_coordinator::config::Config;
use escrow_coordinator::error::AppError;
use escrow_coordinator::escrow::{self, Context, CreateParams};
use escrow_coordinator::ledger::memory::InMemoryLedgerClient;
use escrow_coordinator::model::{EscrowSide, EscrowStatus, Token};

use ethers::types::U256;

fn config(rescue_delay_seconds: i64) -> Config {
    Config {
        network_endpoint: "memory".to_string(),
        listen_port: 0,
        rescue_delay_seconds,
        slack_seconds: 0,
        faucet_enabled: false,
        faucet_endpoint: None,
    }
}

// dst_withdrawal=10s, dst_public_withdrawal=100s, dst_cancellation=101s after deployed_at.
fn offsets() -> PhaseOffsets {
    PhaseOffsets([10, 120, 121, 122, 10, 100, 101])
}

async fn seed_escrow(ctx: &Context, escrow_side: EscrowSide, deployed_at: i64) -> ([u8; 32], uuid::Uuid) {
    let secret = [9u8; 32];
    let hashlock = codec::keccak256(&secret);
    let packed = codec::pack(offsets(), 0);
    let outcome = escrow::create(
        ctx,
        CreateParams {
            order_hash: [2u8; 32],
            hashlock,
            maker: "maker".to_string(),
            taker: "taker".to_string(),
            token: Token::Native,
            amount: U256::from(5_000_000u64),
            safety_deposit: U256::from(250_000u64),
            packed_timelocks: packed,
            escrow_side,
        },
    )
    .await
    .unwrap();

    // Re-anchor to a known `deployed_at` so the test controls the phase windows
    // precisely instead of racing the real wall clock.
    let handle = ctx.store.get(outcome.escrow_id).unwrap();
    {
        let mut guard = handle.lock().await;
        guard.timelocks = Timelocks::from_offsets(offsets(), deployed_at);
    }

    (secret, outcome.escrow_id)
}

#[tokio::test]
async fn destination_escrow_private_withdrawal_after_creation_and_funding() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Context::new(ledger.clone(), config(1800));
    let now = chrono::Utc::now().timestamp();
    let (secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Destination, now - 11).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let tx_id = ledger.deposit(&wallet_address, Token::Native, U256::from(5_250_000u64));
    let funded = escrow::fund(&ctx, escrow_id, vec![tx_id]).await.unwrap();
    assert_eq!(funded.total_received, U256::from(5_250_000u64));

    let withdrawn = escrow::withdraw(&ctx, escrow_id, secret, "taker", false).await.unwrap();
    assert_eq!(withdrawn.amount, U256::from(5_000_000u64));
    assert!(withdrawn.safety_deposit_tx_id.is_some());
    assert!(withdrawn.safety_deposit_error.is_none());

    let record = escrow::get_escrow(&ctx, escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Withdrawn);
    assert_eq!(record.secret, Some(secret));
}

#[tokio::test]
async fn public_withdrawal_by_a_third_party_after_the_private_window_closes() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Context::new(ledger.clone(), config(1800));
    let now = chrono::Utc::now().timestamp();
    // deployed_at far enough back that dst_public_withdrawal (100s) has opened.
    let (secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Destination, now - 105).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let tx_id = ledger.deposit(&wallet_address, Token::Native, U256::from(5_250_000u64));
    escrow::fund(&ctx, escrow_id, vec![tx_id]).await.unwrap();

    // A stranger, not the taker, can still trigger public withdrawal.
    let withdrawn = escrow::withdraw(&ctx, escrow_id, secret, "any-relayer", true).await.unwrap();
    assert_eq!(withdrawn.amount, U256::from(5_000_000u64));
}

#[tokio::test]
async fn source_side_cancellation_splits_principal_and_safety_deposit() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Context::new(ledger.clone(), config(1800));
    let now = chrono::Utc::now().timestamp();
    let (_secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Source, now - 125).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let tx_id = ledger.deposit(&wallet_address, Token::Native, U256::from(5_250_000u64));
    escrow::fund(&ctx, escrow_id, vec![tx_id]).await.unwrap();

    let cancelled = escrow::cancel(&ctx, escrow_id, "taker").await.unwrap();
    assert_eq!(cancelled.cancel_tx_ids.len(), 2);
    assert_eq!(cancelled.total_refunded, U256::from(5_250_000u64));

    let record = escrow::get_escrow(&ctx, escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Cancelled);
}

#[tokio::test]
async fn funding_accumulates_across_multiple_partial_deposits() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Context::new(ledger.clone(), config(1800));
    let now = chrono::Utc::now().timestamp();
    let (_secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Destination, now - 11).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let first = ledger.deposit(&wallet_address, Token::Native, U256::from(2_000_000u64));
    let short_fall = escrow::fund(&ctx, escrow_id, vec![first.clone()]).await;
    assert!(matches!(short_fall, Err(AppError::InsufficientFunding { .. })));

    let second = ledger.deposit(&wallet_address, Token::Native, U256::from(3_250_000u64));
    let funded = escrow::fund(&ctx, escrow_id, vec![first, second]).await.unwrap();
    assert_eq!(funded.total_received, U256::from(5_250_000u64));

    let record = escrow::get_escrow(&ctx, escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Funded);
}

#[tokio::test]
async fn rescue_is_refused_before_the_delay_and_succeeds_after() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Context::new(ledger.clone(), config(600));
    let now = chrono::Utc::now().timestamp();
    let (_secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Destination, now - 100).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let tx_id = ledger.deposit(&wallet_address, Token::Native, U256::from(5_250_000u64));
    escrow::fund(&ctx, escrow_id, vec![tx_id]).await.unwrap();

    let too_early = escrow::rescue(&ctx, escrow_id, "taker", U256::from(5_250_000u64)).await;
    assert!(matches!(too_early, Err(AppError::NotYetOpen { .. })));
    assert!(too_early.unwrap_err().to_string().contains("not available until"));

    {
        let handle = ctx.store.get(escrow_id).unwrap();
        let mut guard = handle.lock().await;
        guard.timelocks = Timelocks::from_offsets(offsets(), now - 700);
    }

    let rescued = escrow::rescue(&ctx, escrow_id, "taker", U256::from(5_250_000u64)).await.unwrap();
    assert_eq!(rescued.amount, U256::from(5_250_000u64));

    let record = escrow::get_escrow(&ctx, escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Rescued);
}

#[tokio::test]
async fn concurrent_commands_on_one_escrow_serialize_instead_of_racing() {
    let ledger = Arc::new(InMemoryLedgerClient::new());
    let ctx = Arc::new(Context::new(ledger.clone(), config(1800)));
    let now = chrono::Utc::now().timestamp();
    let (secret, escrow_id) = seed_escrow(&ctx, EscrowSide::Destination, now - 11).await;

    let wallet_address = escrow::get_escrow(&ctx, escrow_id).await.unwrap().wallet_address;
    let tx_id = ledger.deposit(&wallet_address, Token::Native, U256::from(5_250_000u64));
    escrow::fund(&ctx, escrow_id, vec![tx_id]).await.unwrap();

    // Two `withdraw` calls racing for the same funded escrow: the per-escrow mutex
    // serializes them, so exactly one observes `Funded` and transitions it to
    // `Withdrawn`, and the other finds `Withdrawn` already and is rejected.
    let ctx_a = ctx.clone();
    let ctx_b = ctx.clone();
    let (result_a, result_b) = tokio::join!(
        escrow::withdraw(&ctx_a, escrow_id, secret, "taker", false),
        escrow::withdraw(&ctx_b, escrow_id, secret, "taker", false)
    );

    let results = [result_a, result_b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(AppError::InvalidState(_)))).count(),
        1
    );

    let record = escrow::get_escrow(&ctx, escrow_id).await.unwrap();
    assert_eq!(record.status, EscrowStatus::Withdrawn);
}
