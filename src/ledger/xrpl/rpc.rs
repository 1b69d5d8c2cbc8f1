//! Thin `rippled` JSON-RPC client: just the methods the coordinator needs
//! (`tx`, `account_info`, `fee`, `submit`) plus the testnet faucet.

use std::time::Duration;

use ethers::types::U256;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::model::Token;

use super::super::LedgerError;

const VALIDATION_POLL_INTERVAL: Duration = Duration::from_millis(900);
const VALIDATION_MAX_ATTEMPTS: u32 = 20;

async fn call(http: &reqwest::Client, endpoint: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value, LedgerError> {
    let body = json!({
        "method": method,
        "params": [params],
    });

    let response = http
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(|e| LedgerError::Network(format!("{method} request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(LedgerError::Network(format!("{method} returned HTTP {}", response.status())));
    }

    let envelope: serde_json::Value = response
        .json()
        .await
        .map_err(|e| LedgerError::Network(format!("{method} returned malformed JSON: {e}")))?;

    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| LedgerError::Network(format!("{method} response missing \"result\"")))
}

pub struct FetchedTx {
    pub transaction_type: String,
    pub destination: String,
    pub delivered_amount: U256,
    pub asset: Token,
    pub validated: bool,
    /// `meta.TransactionResult`, e.g. `"tesSUCCESS"` or a `tec`-class code. `validated`
    /// only means the transaction's ledger version is final, not that it moved funds —
    /// a `tecUNFUNDED_PAYMENT`/`tecPATH_DRY` result is validated and still failed.
    pub transaction_result: String,
}

impl FetchedTx {
    /// True only for a validated inclusion with a `tes`-class (success) engine result.
    pub fn succeeded(&self) -> bool {
        self.validated && self.transaction_result.starts_with("tes")
    }
}

pub async fn fetch_tx(http: &reqwest::Client, endpoint: &str, tx_id: &str) -> Result<FetchedTx, LedgerError> {
    let result = call(http, endpoint, "tx", json!({ "transaction": tx_id, "binary": false })).await?;

    if result.get("error").is_some() {
        return Err(LedgerError::NotFound(tx_id.to_string()));
    }

    let transaction_type = result["TransactionType"].as_str().unwrap_or_default().to_string();
    let destination = result["Destination"].as_str().unwrap_or_default().to_string();
    let validated = result["validated"].as_bool().unwrap_or(false);

    let meta = result.get("meta");
    let transaction_result = meta
        .and_then(|m| m.get("TransactionResult"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let delivered = meta.and_then(|m| m.get("delivered_amount")).cloned().unwrap_or(serde_json::Value::Null);

    let (delivered_amount, asset) = parse_amount(&delivered);

    Ok(FetchedTx {
        transaction_type,
        destination,
        delivered_amount,
        asset,
        validated,
        transaction_result,
    })
}

/// XRPL amounts are either a plain drops string (native XRP) or an object
/// `{currency, issuer, value}` (an issued currency). This adapter reports issued
/// currencies but does not move them; see the scope note on `submit_transfer`.
fn parse_amount(value: &serde_json::Value) -> (U256, Token) {
    if let Some(drops) = value.as_str() {
        let amount = drops.parse::<u64>().unwrap_or(0);
        return (U256::from(amount), Token::Native);
    }
    if let Some(obj) = value.as_object() {
        let currency = obj.get("currency").and_then(|v| v.as_str()).unwrap_or_default();
        let issuer = obj.get("issuer").and_then(|v| v.as_str()).unwrap_or_default();
        let decimal = obj.get("value").and_then(|v| v.as_str()).unwrap_or("0");
        let scaled = decimal.replace('.', "").parse::<u64>().unwrap_or(0);
        return (U256::from(scaled), Token::Asset(format!("{currency}/{issuer}")));
    }
    (U256::zero(), Token::Native)
}

#[derive(Debug, Deserialize)]
struct AccountInfoData {
    #[serde(rename = "Sequence")]
    sequence: u32,
    #[serde(rename = "Balance")]
    balance: String,
}

async fn fetch_account_info(http: &reqwest::Client, endpoint: &str, address: &str) -> Result<AccountInfoData, LedgerError> {
    let result = call(http, endpoint, "account_info", json!({ "account": address, "ledger_index": "validated" })).await?;
    if result.get("error").is_some() {
        return Err(LedgerError::Network(format!("account_info failed for {address}")));
    }
    let data: AccountInfoData = serde_json::from_value(result["account_data"].clone())
        .map_err(|e| LedgerError::Network(format!("malformed account_info response: {e}")))?;
    Ok(data)
}

pub async fn fetch_sequence(http: &reqwest::Client, endpoint: &str, address: &str) -> Result<u32, LedgerError> {
    fetch_account_info(http, endpoint, address).await.map(|d| d.sequence)
}

pub async fn fetch_balance(http: &reqwest::Client, endpoint: &str, address: &str, asset: &Token) -> Result<U256, LedgerError> {
    if !asset.is_native() {
        return Err(LedgerError::Rejected(
            "issued-currency balance queries are out of this reference adapter's scope".to_string(),
        ));
    }
    let data = fetch_account_info(http, endpoint, address).await?;
    let drops = data.balance.parse::<u64>().map_err(|e| LedgerError::Network(format!("malformed balance: {e}")))?;
    Ok(U256::from(drops))
}

pub async fn fetch_base_fee(http: &reqwest::Client, endpoint: &str) -> Result<u64, LedgerError> {
    let result = call(http, endpoint, "fee", json!({})).await?;
    let base_fee = result["drops"]["base_fee"]
        .as_str()
        .ok_or_else(|| LedgerError::Network("fee response missing drops.base_fee".to_string()))?;
    base_fee.parse::<u64>().map_err(|e| LedgerError::Network(format!("malformed base fee: {e}")))
}

pub async fn submit_blob(http: &reqwest::Client, endpoint: &str, tx_blob: &[u8]) -> Result<String, LedgerError> {
    let result = call(http, endpoint, "submit", json!({ "tx_blob": hex::encode_upper(tx_blob) })).await?;

    let engine_result = result["engine_result"].as_str().unwrap_or_default();
    if !engine_result.starts_with("tes") && !engine_result.starts_with("ter") {
        return Err(LedgerError::Rejected(format!(
            "submit returned {engine_result}: {}",
            result["engine_result_message"].as_str().unwrap_or_default()
        )));
    }

    result["tx_json"]["hash"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LedgerError::Network("submit response missing tx_json.hash".to_string()))
}

/// Polls `tx` until the transaction reaches a validated ledger, then requires its
/// `meta.TransactionResult` to be the `tes`-class success code — a validated-but-`tec`
/// transaction (e.g. `tecUNFUNDED_PAYMENT`) consumed its fee but moved no funds and must
/// not be reported as a successful transfer.
pub async fn wait_for_validation(http: &reqwest::Client, endpoint: &str, tx_id: &str) -> Result<(), LedgerError> {
    for attempt in 0..VALIDATION_MAX_ATTEMPTS {
        match fetch_tx(http, endpoint, tx_id).await {
            Ok(tx) if tx.succeeded() => return Ok(()),
            Ok(tx) if tx.validated => {
                return Err(LedgerError::Rejected(format!(
                    "{tx_id} validated with non-success result {}",
                    tx.transaction_result
                )));
            }
            Ok(_) => debug!(%tx_id, attempt, "transaction not yet validated"),
            Err(LedgerError::NotFound(_)) => debug!(%tx_id, attempt, "transaction not yet visible"),
            Err(err) => return Err(err),
        }
        tokio::time::sleep(VALIDATION_POLL_INTERVAL).await;
    }
    Err(LedgerError::Timeout(format!("{tx_id} did not validate within {VALIDATION_MAX_ATTEMPTS} polls")))
}

pub async fn faucet_top_up(http: &reqwest::Client, faucet_endpoint: &str, address: &str, min_native: U256) -> Result<(), LedgerError> {
    let response = http
        .post(faucet_endpoint)
        .json(&json!({ "destination": address }))
        .send()
        .await
        .map_err(|e| LedgerError::Network(format!("faucet request failed: {e}")))?;

    if !response.status().is_success() {
        warn!(%address, status = %response.status(), "faucet top-up request was not accepted");
        return Err(LedgerError::Network(format!("faucet returned HTTP {}", response.status())));
    }
    debug!(%address, %min_native, "requested faucet top-up");
    Ok(())
}
