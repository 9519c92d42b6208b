//! Hashing and signature primitives
//!
//! Identities (transaction and block hashes) are double SHA-256 of the
//! canonical encoding. Input signatures are secp256k1 ECDSA (DER) over the
//! SHA-256 digest of the signing payload, checked against a SEC1-encoded
//! public key.

use std::sync::OnceLock;

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey, VerifyOnly};
use sha2::{Digest, Sha256};

use crate::types::{ByteString, Hash};

fn verification_context() -> &'static Secp256k1<VerifyOnly> {
    static CONTEXT: OnceLock<Secp256k1<VerifyOnly>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::verification_only)
}

/// Double SHA-256 of `data`
pub fn sha256d_hash(data: &[u8]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(data);
    sha256d::Hash::from_engine(engine).into_inner()
}

/// Single SHA-256 of a signing payload; this is the message the ECDSA signature commits to
pub fn signature_digest(message: &[u8]) -> Hash {
    let digest = Sha256::digest(message);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Verify: (pubkey, message, signature) → {true, false}
///
/// Keys or signatures that fail to parse verify as `false`.
pub fn verify_signature(pubkey_bytes: &[u8], message: &[u8], signature_bytes: &[u8]) -> bool {
    let pubkey = match PublicKey::from_slice(pubkey_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    let signature = match Signature::from_der(signature_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    let message = Message::from_digest(signature_digest(message));
    verification_context()
        .verify_ecdsa(&message, &signature, &pubkey)
        .is_ok()
}

/// Sign `message` with `secret_key`, returning a DER-encoded signature
pub fn sign_message(secret_key: &SecretKey, message: &[u8]) -> ByteString {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(signature_digest(message));
    secp.sign_ecdsa(&message, secret_key).serialize_der().to_vec()
}

/// Compressed SEC1 encoding of the public key belonging to `secret_key`
pub fn public_key_bytes(secret_key: &SecretKey) -> ByteString {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, secret_key)
        .serialize()
        .to_vec()
}
