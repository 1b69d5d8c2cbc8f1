//! A deliberately minimal subset of the XRPL canonical binary format: just enough to
//! serialize and sign a native-XRP `Payment` transaction. It does not attempt to cover
//! issued currencies, memos, or any other transaction type — a production adapter would
//! reach for a dedicated XRPL codec crate instead of hand-rolling this.

use super::address::account_id_from_classic_address;

/// HashPrefix::transactionSig ("STX\0"), prepended before hashing a transaction for
/// single-signing.
const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];

pub struct UnsignedPayment {
    pub account: String,
    pub destination: String,
    pub amount: u64,
    pub fee: u64,
    pub sequence: u32,
    pub signing_pub_key: Vec<u8>,
}

fn push_field_id(out: &mut Vec<u8>, type_code: u8, field_code: u8) {
    debug_assert!(type_code < 16 && field_code < 16, "field outside the single-byte id range");
    out.push((type_code << 4) | field_code);
}

fn push_vl_length(out: &mut Vec<u8>, len: usize) {
    // XRPL's variable-length prefix; our blobs (pubkeys, DER signatures) always fall
    // in the single-byte range (<= 192 bytes).
    assert!(len <= 192, "blob too long for the single-byte VL prefix");
    out.push(len as u8);
}

fn push_blob(out: &mut Vec<u8>, type_code: u8, field_code: u8, blob: &[u8]) {
    push_field_id(out, type_code, field_code);
    push_vl_length(out, blob.len());
    out.extend_from_slice(blob);
}

fn push_account_id(out: &mut Vec<u8>, type_code: u8, field_code: u8, classic_address: &str) {
    let account_id = account_id_from_classic_address(classic_address);
    push_blob(out, type_code, field_code, &account_id);
}

fn push_uint16(out: &mut Vec<u8>, type_code: u8, field_code: u8, value: u16) {
    push_field_id(out, type_code, field_code);
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_uint32(out: &mut Vec<u8>, type_code: u8, field_code: u8, value: u32) {
    push_field_id(out, type_code, field_code);
    out.extend_from_slice(&value.to_be_bytes());
}

/// Native-XRP amount: 8 bytes, bit 63 clear (not IOU), bit 62 set (non-negative), low
/// 62 bits the drops value.
fn push_native_amount(out: &mut Vec<u8>, type_code: u8, field_code: u8, drops: u64) {
    push_field_id(out, type_code, field_code);
    let encoded = 0x4000_0000_0000_0000u64 | drops;
    out.extend_from_slice(&encoded.to_be_bytes());
}

/// Serializes the fields that are covered by the signature, in canonical (type, field)
/// order, with the single-signing hash prefix prepended.
fn serialize_common(tx: &UnsignedPayment, out: &mut Vec<u8>) {
    push_uint16(out, 1, 2, 0); // TransactionType = Payment (0)
    push_uint32(out, 2, 2, 0); // Flags = 0
    push_uint32(out, 2, 4, tx.sequence); // Sequence
    push_native_amount(out, 6, 1, tx.amount); // Amount
    push_native_amount(out, 6, 8, tx.fee); // Fee
    push_blob(out, 7, 3, &tx.signing_pub_key); // SigningPubKey
}

pub fn signing_preimage(tx: &UnsignedPayment) -> Vec<u8> {
    let mut out = Vec::from(SIGNING_PREFIX);
    serialize_common(tx, &mut out);
    push_account_id(&mut out, 8, 1, &tx.account); // Account
    push_account_id(&mut out, 8, 3, &tx.destination); // Destination
    out
}

/// Serializes the fully signed transaction blob for submission (no hash prefix).
pub fn serialize_signed(tx: &UnsignedPayment, signature_der: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    serialize_common(tx, &mut out);
    push_blob(&mut out, 7, 4, signature_der); // TxnSignature
    push_account_id(&mut out, 8, 1, &tx.account); // Account
    push_account_id(&mut out, 8, 3, &tx.destination); // Destination
    out
}
