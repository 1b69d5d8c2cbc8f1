//! XRPL key generation, classic-address derivation, and transaction signing.
//!
//! XRPL's default account key type is secp256k1, so the custodial wallet manager can
//! reuse the same curve the EVM leg already uses for order signatures.

use std::sync::LazyLock;

use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use sha2::{Digest as Sha2Digest, Sha256, Sha512};

use crate::ledger::LedgerError;
use crate::model::WalletSecret;

/// `rippled`'s base58 alphabet; distinct from Bitcoin's.
static XRPL_ALPHABET: LazyLock<bs58::Alphabet> = LazyLock::new(|| {
    bs58::Alphabet::new(b"rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz")
        .expect("XRPL alphabet constant is exactly 58 distinct bytes")
});

const ACCOUNT_ID_VERSION: u8 = 0x00;

pub fn generate_keypair() -> (SigningKey, String) {
    let signing_key = SigningKey::random(&mut OsRng);
    let address = classic_address_from_public_key(&public_key_bytes(&signing_key));
    (signing_key, address)
}

pub fn public_key_bytes(signing_key: &SigningKey) -> Vec<u8> {
    signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec()
}

pub fn signing_key_from_secret(secret: &WalletSecret) -> Result<SigningKey, LedgerError> {
    SigningKey::from_slice(&secret.0)
        .map_err(|e| LedgerError::Signing(format!("invalid wallet secret: {e}")))
}

/// Derives the classic `r...` address from a compressed secp256k1 public key:
/// base58check(version=0x00 || RIPEMD160(SHA256(pubkey))).
pub fn classic_address_from_public_key(pubkey: &[u8]) -> String {
    let sha = Sha256::digest(pubkey);
    let account_id = Ripemd160::digest(sha);

    let mut payload = Vec::with_capacity(21);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(&account_id);

    let checksum = double_sha256(&payload);
    payload.extend_from_slice(&checksum[..4]);

    bs58::encode(payload).with_alphabet(&XRPL_ALPHABET).into_string()
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Recovers the raw 20-byte account id backing a classic `r...` address, undoing
/// [`classic_address_from_public_key`]'s base58check encoding. Panics on malformed
/// input, since both call sites pass addresses this adapter generated itself.
pub fn account_id_from_classic_address(classic_address: &str) -> [u8; 20] {
    let payload = bs58::decode(classic_address)
        .with_alphabet(&XRPL_ALPHABET)
        .into_vec()
        .expect("classic address is valid base58check");
    assert_eq!(payload.len(), 25, "classic address payload must be version + account id + checksum");

    let (body, checksum) = payload.split_at(21);
    let expected_checksum = double_sha256(body);
    assert_eq!(checksum, &expected_checksum[..4], "classic address checksum mismatch");
    assert_eq!(body[0], ACCOUNT_ID_VERSION, "unexpected address version byte");

    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&body[1..]);
    account_id
}

/// XRPL signs the SHA512Half (first 256 bits of SHA512) of the serialized transaction
/// preimage, using a deterministic low-S ECDSA signature over secp256k1.
pub fn sign(signing_key: &SigningKey, preimage: &[u8]) -> Vec<u8> {
    let hash = sha512_half(preimage);
    let (signature, _recovery_id): (Signature, _) = signing_key
        .sign_prehash_recoverable(&hash)
        .expect("secp256k1 signing over a 32-byte prehash cannot fail");
    signature.to_der().as_bytes().to_vec()
}

fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}
