//! The escrow state machine: create, fund, withdraw, cancel, rescue. This module owns
//! every status transition; nothing outside it is allowed to mutate an `EscrowRecord`.

use std::sync::Arc;

use ethers::types::U256;
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::{self, Phase, PhaseOffsets, Timelocks};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ledger::{LedgerClient, TransferKind};
use crate::model::{EscrowId, EscrowRecord, EscrowSide, EscrowStatus, RequiredDeposit, Token};
use crate::phase;
use crate::retry::with_retry;
use crate::store::EscrowStore;
use crate::wallet::WalletManager;

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Shared, read-only-by-reference context threaded through every operation: the escrow
/// store, the wallet manager, the ledger adapter, and process configuration. Built once
/// at startup and handed to the dispatcher by reference.
pub struct Context {
    pub store: EscrowStore,
    pub wallet: WalletManager,
    pub ledger: Arc<dyn LedgerClient>,
    pub config: Config,
}

impl Context {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: Config) -> Self {
        Self {
            store: EscrowStore::new(),
            wallet: WalletManager::new(),
            ledger,
            config,
        }
    }
}

#[derive(Debug)]
pub struct CreateParams {
    pub order_hash: [u8; 32],
    pub hashlock: [u8; 32],
    pub maker: String,
    pub taker: String,
    pub token: Token,
    pub amount: U256,
    pub safety_deposit: U256,
    pub packed_timelocks: U256,
    pub escrow_side: EscrowSide,
}

#[derive(Debug)]
pub struct CreateOutcome {
    pub escrow_id: EscrowId,
    pub wallet_address: String,
    pub required_deposit: RequiredDeposit,
    pub timelocks: Timelocks,
}

/// §4.5: generates the custodial wallet, derives absolute timelocks from the packed
/// word and a freshly captured `deployed_at`, and inserts the escrow in `Created`.
pub async fn create(ctx: &Context, params: CreateParams) -> AppResult<CreateOutcome> {
    let escrow_id = Uuid::new_v4();
    let wallet_address = ctx.wallet.provision(escrow_id, ctx.ledger.as_ref()).await?;

    if ctx.config.faucet_enabled {
        ctx.ledger.ensure_funded(&wallet_address, U256::zero()).await.ok();
    }

    let deployed_at = wall_clock();
    let offsets = codec::unpack(params.packed_timelocks);
    if !offsets.is_non_decreasing() {
        return Err(AppError::InvalidParameters(
            "timelock offsets must be non-decreasing across phases".to_string(),
        ));
    }
    let timelocks = Timelocks::from_offsets(offsets, deployed_at);
    let required_deposit = RequiredDeposit::compute(&params.token, params.amount, params.safety_deposit);

    let record = EscrowRecord {
        id: escrow_id,
        order_hash: params.order_hash,
        hashlock: params.hashlock,
        maker: params.maker,
        taker: params.taker,
        token: params.token,
        amount: params.amount,
        safety_deposit: params.safety_deposit,
        timelocks,
        wallet_address: wallet_address.clone(),
        status: EscrowStatus::Created,
        funding_tx_ids: Default::default(),
        secret: None,
        settlement_tx_ids: Vec::new(),
        escrow_side: params.escrow_side,
    };
    ctx.store.insert(record);

    info!(%escrow_id, order_hash = %hex::encode(params.order_hash), %wallet_address, "escrow created");

    Ok(CreateOutcome { escrow_id, wallet_address, required_deposit, timelocks })
}

#[derive(Debug)]
pub struct FundOutcome {
    pub total_received: U256,
    pub verified_txs: Vec<String>,
}

/// Resolves a funding candidate, translating a ledger-level rejection (e.g. an XRPL
/// transaction that validated but landed with a `tec`-class, non-`tesSUCCESS` result)
/// into `InvalidTransaction` rather than the generic `SettlementFailed` the blanket
/// `LedgerError` conversion would otherwise produce — a deposit that never delivered
/// funds is an invalid funding transaction, not a failed outgoing settlement.
async fn resolve_funding_tx(ctx: &Context, tx_id: &str) -> AppResult<crate::ledger::ResolvedTransfer> {
    match with_retry(|| ctx.ledger.resolve_tx(tx_id)).await {
        Err(crate::ledger::LedgerError::Rejected(reason)) => {
            Err(AppError::InvalidTransaction { tx_id: tx_id.to_string(), reason })
        }
        other => Ok(other?),
    }
}

/// §4.6: verifies each named transaction against the ledger, rejects under-funding, and
/// is idempotent — replaying a subset of already-accepted tx ids never regresses status.
pub async fn fund(ctx: &Context, escrow_id: EscrowId, tx_ids: Vec<String>) -> AppResult<FundOutcome> {
    let handle = ctx.store.get(escrow_id)?;
    let mut escrow = handle.lock().await;

    if escrow.status != EscrowStatus::Created {
        return Err(AppError::InvalidState(format!("expected Created, found {:?}", escrow.status)));
    }

    let principal_asset = escrow.token.clone();
    let required = escrow.required_deposit();
    let required_amount = if principal_asset.is_native() { required.native } else { required.token };

    // A `BTreeSet`, not a `Vec`: the caller's `tx_ids` may repeat the same not-yet-recorded
    // id (e.g. a comma-joined wire value like "txA,txA"), and counting it twice here would
    // let a half-sized deposit masquerade as a full one in the summing loop below.
    let mut new_tx_ids = std::collections::BTreeSet::new();
    let mut total = U256::zero();

    for tx_id in &tx_ids {
        if escrow.funding_tx_ids.contains(tx_id) || new_tx_ids.contains(tx_id) {
            continue;
        }
        let resolved = resolve_funding_tx(ctx, tx_id).await?;
        if !resolved.validated {
            return Err(AppError::InvalidTransaction { tx_id: tx_id.clone(), reason: "not validated".to_string() });
        }
        if resolved.kind != TransferKind::Payment {
            return Err(AppError::InvalidTransaction { tx_id: tx_id.clone(), reason: "not a native value transfer".to_string() });
        }
        if resolved.destination != escrow.wallet_address {
            return Err(AppError::InvalidTransaction {
                tx_id: tx_id.clone(),
                reason: format!("destination {} does not match escrow wallet {}", resolved.destination, escrow.wallet_address),
            });
        }
        if resolved.asset != principal_asset {
            return Err(AppError::InvalidTransaction { tx_id: tx_id.clone(), reason: "wrong asset".to_string() });
        }
        new_tx_ids.insert(tx_id.clone());
    }

    // Sum over every accepted tx (previously recorded plus newly verified this call) so
    // a second partial `fund` call can still close an earlier shortfall.
    for tx_id in escrow.funding_tx_ids.iter().chain(new_tx_ids.iter()) {
        let resolved = resolve_funding_tx(ctx, tx_id).await?;
        total += resolved.delivered_amount;
    }

    if total < required_amount {
        return Err(AppError::InsufficientFunding {
            required: required_amount.to_string(),
            received: total.to_string(),
        });
    }

    for tx_id in new_tx_ids {
        escrow.funding_tx_ids.insert(tx_id);
    }
    escrow.status = EscrowStatus::Funded;

    info!(%escrow_id, total_received = %total, "escrow funded");

    Ok(FundOutcome { total_received: total, verified_txs: escrow.funding_tx_ids.iter().cloned().collect() })
}

#[derive(Debug)]
pub struct WithdrawOutcome {
    pub principal_tx_id: String,
    pub safety_deposit_tx_id: Option<String>,
    pub safety_deposit_error: Option<String>,
    pub secret: [u8; 32],
    pub amount: U256,
}

/// §4.7: reveals the secret, checks authorization and timing for the requested
/// (private or public) window, then settles principal and safety deposit in order.
pub async fn withdraw(
    ctx: &Context,
    escrow_id: EscrowId,
    secret: [u8; 32],
    caller_address: &str,
    is_public: bool,
) -> AppResult<WithdrawOutcome> {
    let handle = ctx.store.get(escrow_id)?;
    let mut escrow = handle.lock().await;

    if escrow.status != EscrowStatus::Funded {
        return Err(AppError::InvalidState(format!("expected Funded, found {:?}", escrow.status)));
    }
    if !codec::hashlock_matches(&secret, &escrow.hashlock) {
        return Err(AppError::InvalidSecret);
    }

    let now = wall_clock();
    if is_public {
        phase::validate_window(&escrow, now, Phase::DstPublicWithdrawal, Some(Phase::DstCancellation), ctx.config.slack_seconds)?;
    } else {
        if caller_address != escrow.taker {
            return Err(AppError::Unauthorized);
        }
        phase::validate_window(&escrow, now, Phase::DstWithdrawal, Some(Phase::DstCancellation), ctx.config.slack_seconds)?;
    }

    let principal_tx_id = ctx
        .wallet
        .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, &escrow.maker, &escrow.token, escrow.amount)
        .await
        .map_err(|e| AppError::SettlementFailed(format!("principal transfer to maker failed: {e}")))?;

    escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
        tx_id: principal_tx_id.clone(),
        to: escrow.maker.clone(),
        asset: escrow.token.clone(),
        amount: escrow.amount,
    });
    escrow.status = EscrowStatus::Withdrawn;
    escrow.secret = Some(secret);

    info!(%escrow_id, tx_id = %principal_tx_id, "principal settled to maker");

    let mut safety_deposit_tx_id = None;
    let mut safety_deposit_error = None;
    if !escrow.safety_deposit.is_zero() {
        match ctx
            .wallet
            .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, caller_address, &Token::Native, escrow.safety_deposit)
            .await
        {
            Ok(tx_id) => {
                escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
                    tx_id: tx_id.clone(),
                    to: caller_address.to_string(),
                    asset: Token::Native,
                    amount: escrow.safety_deposit,
                });
                safety_deposit_tx_id = Some(tx_id);
            }
            Err(e) => {
                warn!(%escrow_id, error = %e, "safety deposit payout failed after principal settled; recoverable via rescue");
                safety_deposit_error = Some(e.to_string());
            }
        }
    }

    Ok(WithdrawOutcome {
        principal_tx_id,
        safety_deposit_tx_id,
        safety_deposit_error,
        secret,
        amount: escrow.amount,
    })
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub cancel_tx_ids: Vec<String>,
    pub total_refunded: U256,
}

/// §4.8: taker-only refund after `DstCancellation`, split by `escrow_side`.
pub async fn cancel(ctx: &Context, escrow_id: EscrowId, caller_address: &str) -> AppResult<CancelOutcome> {
    let handle = ctx.store.get(escrow_id)?;
    let mut escrow = handle.lock().await;

    if escrow.status != EscrowStatus::Funded {
        return Err(AppError::InvalidState(format!("expected Funded, found {:?}", escrow.status)));
    }
    if caller_address != escrow.taker {
        return Err(AppError::Unauthorized);
    }

    let now = wall_clock();
    phase::validate_window(&escrow, now, Phase::DstCancellation, None, ctx.config.slack_seconds)?;

    let mut cancel_tx_ids = Vec::new();
    let mut total_refunded = U256::zero();

    match escrow.escrow_side {
        EscrowSide::Destination => {
            let refund_amount = escrow.amount + escrow.safety_deposit;
            let tx_id = ctx
                .wallet
                .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, &escrow.taker, &escrow.token, refund_amount)
                .await
                .map_err(|e| AppError::SettlementFailed(format!("refund to taker failed: {e}")))?;
            escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
                tx_id: tx_id.clone(),
                to: escrow.taker.clone(),
                asset: escrow.token.clone(),
                amount: refund_amount,
            });
            cancel_tx_ids.push(tx_id);
            total_refunded += refund_amount;
        }
        EscrowSide::Source => {
            let to_maker = ctx
                .wallet
                .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, &escrow.maker, &escrow.token, escrow.amount)
                .await
                .map_err(|e| AppError::SettlementFailed(format!("refund to maker failed: {e}")))?;
            escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
                tx_id: to_maker.clone(),
                to: escrow.maker.clone(),
                asset: escrow.token.clone(),
                amount: escrow.amount,
            });
            cancel_tx_ids.push(to_maker);
            total_refunded += escrow.amount;

            if !escrow.safety_deposit.is_zero() {
                let to_taker = ctx
                    .wallet
                    .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, &escrow.taker, &Token::Native, escrow.safety_deposit)
                    .await
                    .map_err(|e| AppError::SettlementFailed(format!("safety deposit refund to taker failed: {e}")))?;
                escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
                    tx_id: to_taker.clone(),
                    to: escrow.taker.clone(),
                    asset: Token::Native,
                    amount: escrow.safety_deposit,
                });
                cancel_tx_ids.push(to_taker);
                total_refunded += escrow.safety_deposit;
            }
        }
    }

    escrow.status = EscrowStatus::Cancelled;
    info!(%escrow_id, %total_refunded, "escrow cancelled");

    Ok(CancelOutcome { cancel_tx_ids, total_refunded })
}

#[derive(Debug)]
pub struct RescueOutcome {
    pub tx_id: String,
    pub amount: U256,
}

/// §4.9: taker-only emergency sweep after `rescue_delay_seconds` has elapsed since
/// `deployed_at`. Transfers funds regardless of status, but only flips status to
/// `Rescued` when the prior status was `Created` or `Funded` — a rescue against an
/// already-settled escrow shouldn't overwrite a terminal status that already recorded
/// how the escrow ended.
pub async fn rescue(ctx: &Context, escrow_id: EscrowId, caller_address: &str, amount: U256) -> AppResult<RescueOutcome> {
    let handle = ctx.store.get(escrow_id)?;
    let mut escrow = handle.lock().await;

    if caller_address != escrow.taker {
        return Err(AppError::Unauthorized);
    }

    let rescue_start = escrow.timelocks.deployed_at + ctx.config.rescue_delay_seconds;
    let now = wall_clock();
    if now < rescue_start {
        return Err(AppError::NotYetOpen { opens_at: rescue_start });
    }

    let tx_id = ctx
        .wallet
        .sign_and_submit(escrow_id, ctx.ledger.as_ref(), &escrow.wallet_address, caller_address, &Token::Native, amount)
        .await
        .map_err(|e| AppError::SettlementFailed(format!("rescue transfer failed: {e}")))?;

    escrow.settlement_tx_ids.push(crate::model::SettlementTransfer {
        tx_id: tx_id.clone(),
        to: caller_address.to_string(),
        asset: Token::Native,
        amount,
    });

    if matches!(escrow.status, EscrowStatus::Created | EscrowStatus::Funded) {
        escrow.status = EscrowStatus::Rescued;
    }

    info!(%escrow_id, %amount, "escrow wallet rescued");

    Ok(RescueOutcome { tx_id, amount })
}

pub async fn get_escrow(ctx: &Context, escrow_id: EscrowId) -> AppResult<EscrowRecord> {
    ctx.store.snapshot(escrow_id).await
}
