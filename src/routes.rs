//! Command dispatcher: the HTTP/JSON transport for the typed commands in the external
//! interface. Each handler deserializes one request, performs the one validation pass
//! at the boundary, calls the matching state-machine operation, and serializes the
//! typed result or typed error. The dispatcher holds no state of its own.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::codec::Timelocks;
use crate::error::{AppError, AppResult};
use crate::escrow::{self, Context};
use crate::ledger::LedgerError;
use crate::model::{EscrowId, EscrowRecord, EscrowSide, EscrowStatus, RequiredDeposit, Token};

pub fn router(ctx: Arc<Context>) -> Router {
    Router::new()
        .route("/escrows", post(create_dst))
        .route("/escrows/{id}/fund", post(fund))
        .route("/escrows/{id}/withdraw", post(withdraw))
        .route("/escrows/{id}/cancel", post(cancel))
        .route("/escrows/{id}/rescue", post(rescue))
        .route("/escrows/{id}", get(get_escrow))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(ctx)
}

fn strip_0x(value: &str) -> &str {
    value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value)
}

fn parse_hex32(field: &'static str, value: &str) -> AppResult<[u8; 32]> {
    let bytes = hex::decode(strip_0x(value))
        .map_err(|e| AppError::InvalidParameters(format!("{field}: invalid hex ({e})")))?;
    bytes
        .try_into()
        .map_err(|_| AppError::InvalidParameters(format!("{field}: expected 32 bytes")))
}

fn format_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn parse_u256(field: &'static str, value: &str) -> AppResult<U256> {
    U256::from_dec_str(value).map_err(|e| AppError::InvalidParameters(format!("{field}: invalid integer ({e})")))
}

fn parse_token(value: &str) -> Token {
    if value.eq_ignore_ascii_case("native") {
        Token::Native
    } else {
        Token::Asset(value.to_string())
    }
}

fn format_token(token: &Token) -> String {
    match token {
        Token::Native => "native".to_string(),
        Token::Asset(id) => id.clone(),
    }
}

fn parse_escrow_side(value: Option<&str>) -> AppResult<EscrowSide> {
    match value.map(|v| v.to_ascii_lowercase()) {
        None => Ok(EscrowSide::Destination),
        Some(ref v) if v == "destination" || v == "dst" => Ok(EscrowSide::Destination),
        Some(ref v) if v == "source" || v == "src" => Ok(EscrowSide::Source),
        Some(other) => Err(AppError::InvalidParameters(format!("unknown escrow type {other}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TxIdsWire {
    List(Vec<String>),
    Csv(String),
}

impl TxIdsWire {
    fn into_vec(self) -> Vec<String> {
        match self {
            TxIdsWire::List(v) => v,
            TxIdsWire::Csv(s) => s.split(',').map(|part| part.trim().to_string()).filter(|p| !p.is_empty()).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct RequiredDepositWire {
    pub native: String,
    pub token: String,
}

impl From<RequiredDeposit> for RequiredDepositWire {
    fn from(value: RequiredDeposit) -> Self {
        Self { native: value.native.to_string(), token: value.token.to_string() }
    }
}

#[derive(Serialize)]
pub struct TimelocksWire {
    pub deployed_at: i64,
    pub src_withdrawal: i64,
    pub src_public_withdrawal: i64,
    pub src_cancellation: i64,
    pub src_public_cancellation: i64,
    pub dst_withdrawal: i64,
    pub dst_public_withdrawal: i64,
    pub dst_cancellation: i64,
}

impl From<Timelocks> for TimelocksWire {
    fn from(t: Timelocks) -> Self {
        use crate::codec::Phase::*;
        Self {
            deployed_at: t.deployed_at,
            src_withdrawal: t.at(SrcWithdrawal),
            src_public_withdrawal: t.at(SrcPublicWithdrawal),
            src_cancellation: t.at(SrcCancellation),
            src_public_cancellation: t.at(SrcPublicCancellation),
            dst_withdrawal: t.at(DstWithdrawal),
            dst_public_withdrawal: t.at(DstPublicWithdrawal),
            dst_cancellation: t.at(DstCancellation),
        }
    }
}

// --- CreateDst ---

#[derive(Deserialize)]
pub struct CreateDstRequest {
    pub order_hash: String,
    pub hashlock: String,
    pub maker: String,
    pub taker: String,
    pub token: String,
    pub amount: String,
    pub safety_deposit: String,
    pub timelocks: String,
    #[serde(rename = "type")]
    pub escrow_type: Option<String>,
}

#[derive(Serialize)]
pub struct CreateDstResponse {
    pub escrow_id: EscrowId,
    pub wallet_address: String,
    pub required_deposit: RequiredDepositWire,
    pub timelocks: TimelocksWire,
}

async fn create_dst(State(ctx): State<Arc<Context>>, Json(req): Json<CreateDstRequest>) -> AppResult<Json<CreateDstResponse>> {
    let params = escrow::CreateParams {
        order_hash: parse_hex32("order_hash", &req.order_hash)?,
        hashlock: parse_hex32("hashlock", &req.hashlock)?,
        maker: req.maker,
        taker: req.taker,
        token: parse_token(&req.token),
        amount: parse_u256("amount", &req.amount)?,
        safety_deposit: parse_u256("safety_deposit", &req.safety_deposit)?,
        packed_timelocks: U256::from_str_radix(strip_0x(&req.timelocks), 16)
            .map_err(|e| AppError::InvalidParameters(format!("timelocks: invalid hex ({e})")))?,
        escrow_side: parse_escrow_side(req.escrow_type.as_deref())?,
    };

    let outcome = escrow::create(&ctx, params).await?;
    Ok(Json(CreateDstResponse {
        escrow_id: outcome.escrow_id,
        wallet_address: outcome.wallet_address,
        required_deposit: outcome.required_deposit.into(),
        timelocks: outcome.timelocks.into(),
    }))
}

// --- Fund ---

#[derive(Deserialize)]
pub struct FundRequest {
    #[serde(default)]
    pub from_address: Option<String>,
    pub tx_ids: TxIdsWire,
}

#[derive(Serialize)]
pub struct FundResponse {
    pub total_received: String,
    pub verified_txs: Vec<String>,
}

async fn fund(State(ctx): State<Arc<Context>>, Path(id): Path<Uuid>, Json(req): Json<FundRequest>) -> AppResult<Json<FundResponse>> {
    let _ = req.from_address; // advisory only, per §4.6
    let outcome = escrow::fund(&ctx, id, req.tx_ids.into_vec()).await?;
    Ok(Json(FundResponse { total_received: outcome.total_received.to_string(), verified_txs: outcome.verified_txs }))
}

// --- Withdraw ---

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub secret: String,
    pub caller_address: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Serialize)]
pub struct WithdrawResponse {
    pub tx_hash: String,
    pub secret: String,
    pub amount: String,
    pub safety_deposit_tx_hash: Option<String>,
    pub safety_deposit_error: Option<String>,
}

async fn withdraw(State(ctx): State<Arc<Context>>, Path(id): Path<Uuid>, Json(req): Json<WithdrawRequest>) -> AppResult<Json<WithdrawResponse>> {
    let secret = parse_hex32("secret", &req.secret)?;
    let outcome = escrow::withdraw(&ctx, id, secret, &req.caller_address, req.is_public).await?;
    Ok(Json(WithdrawResponse {
        tx_hash: outcome.principal_tx_id,
        secret: format_hex32(&outcome.secret),
        amount: outcome.amount.to_string(),
        safety_deposit_tx_hash: outcome.safety_deposit_tx_id,
        safety_deposit_error: outcome.safety_deposit_error,
    }))
}

// --- Cancel ---

#[derive(Deserialize)]
pub struct CancelRequest {
    pub caller_address: String,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancel_tx_ids: Vec<String>,
    pub total_refunded: String,
}

async fn cancel(State(ctx): State<Arc<Context>>, Path(id): Path<Uuid>, Json(req): Json<CancelRequest>) -> AppResult<Json<CancelResponse>> {
    let outcome = escrow::cancel(&ctx, id, &req.caller_address).await?;
    Ok(Json(CancelResponse { cancel_tx_ids: outcome.cancel_tx_ids, total_refunded: outcome.total_refunded.to_string() }))
}

// --- Rescue ---

#[derive(Deserialize)]
pub struct RescueRequest {
    pub caller_address: String,
    pub amount: String,
}

#[derive(Serialize)]
pub struct RescueResponse {
    pub tx_hash: String,
    pub amount: String,
}

async fn rescue(State(ctx): State<Arc<Context>>, Path(id): Path<Uuid>, Json(req): Json<RescueRequest>) -> AppResult<Json<RescueResponse>> {
    let amount = parse_u256("amount", &req.amount)?;
    let outcome = escrow::rescue(&ctx, id, &req.caller_address, amount).await?;
    Ok(Json(RescueResponse { tx_hash: outcome.tx_id, amount: outcome.amount.to_string() }))
}

// --- GetEscrow ---

#[derive(Serialize)]
pub struct SettlementTransferWire {
    pub tx_id: String,
    pub to: String,
    pub asset: String,
    pub amount: String,
}

#[derive(Serialize)]
pub struct EscrowView {
    pub id: EscrowId,
    pub order_hash: String,
    pub hashlock: String,
    pub maker: String,
    pub taker: String,
    pub token: String,
    pub amount: String,
    pub safety_deposit: String,
    pub timelocks: TimelocksWire,
    pub wallet_address: String,
    pub status: EscrowStatus,
    pub funding_tx_ids: Vec<String>,
    pub secret: Option<String>,
    pub settlement_tx_ids: Vec<SettlementTransferWire>,
    pub escrow_side: EscrowSide,
}

impl From<EscrowRecord> for EscrowView {
    fn from(r: EscrowRecord) -> Self {
        Self {
            id: r.id,
            order_hash: format_hex32(&r.order_hash),
            hashlock: format_hex32(&r.hashlock),
            maker: r.maker,
            taker: r.taker,
            token: format_token(&r.token),
            amount: r.amount.to_string(),
            safety_deposit: r.safety_deposit.to_string(),
            timelocks: r.timelocks.into(),
            wallet_address: r.wallet_address,
            status: r.status,
            funding_tx_ids: r.funding_tx_ids.into_iter().collect(),
            secret: r.secret.map(|s| format_hex32(&s)),
            settlement_tx_ids: r
                .settlement_tx_ids
                .into_iter()
                .map(|t| SettlementTransferWire { tx_id: t.tx_id, to: t.to, asset: format_token(&t.asset), amount: t.amount.to_string() })
                .collect(),
            escrow_side: r.escrow_side,
        }
    }
}

async fn get_escrow(State(ctx): State<Arc<Context>>, Path(id): Path<Uuid>) -> AppResult<Json<EscrowView>> {
    let record = escrow::get_escrow(&ctx, id).await?;
    Ok(Json(record.into()))
}

// --- Health ---

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub connected: bool,
    pub active_escrows: usize,
}

async fn health(State(ctx): State<Arc<Context>>) -> Json<HealthResponse> {
    // A bogus id still reaches the adapter's RPC surface; anything but a network/timeout
    // failure means the endpoint is reachable.
    let connected = !matches!(
        ctx.ledger.resolve_tx("00000000000000000000000000000000000000000000000000000000000000").await,
        Err(LedgerError::Network(_)) | Err(LedgerError::Timeout(_))
    );
    Json(HealthResponse { healthy: true, connected, active_escrows: ctx.store.active_count() })
}
