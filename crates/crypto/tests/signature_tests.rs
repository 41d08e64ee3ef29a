//! Tests for generator keys and signatures

use tidal_crypto::ecdsa::{KeyPair, PrivateKey, PublicKey, Signature};
use tidal_crypto::{generation_signature, hit, keccak256};

#[test]
fn test_private_key_generation() {
    let key1 = PrivateKey::random();
    let key2 = PrivateKey::random();
    assert_ne!(key1.to_bytes(), key2.to_bytes());
}

#[test]
fn test_private_key_from_hex() {
    let hex = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    let key = PrivateKey::from_hex(hex).unwrap();
    assert_eq!(hex::encode(key.to_bytes()), &hex[2..]);
}

#[test]
fn test_private_key_wrong_length() {
    assert!(PrivateKey::from_hex("abcd").is_err());
}

#[test]
fn test_sign_verify() {
    let keys = KeyPair::random();
    let sig = keys.sign(b"key block").unwrap();
    assert!(sig.verify(b"key block", &keys.public_key()).unwrap());

    let other = KeyPair::random();
    assert!(!sig.verify(b"key block", &other.public_key()).unwrap());
}

#[test]
fn test_signature_hex_roundtrip() {
    let keys = KeyPair::random();
    let sig = keys.sign(b"micro block").unwrap();
    let restored = Signature::from_hex(&sig.to_hex()).unwrap();
    assert_eq!(sig, restored);
    assert!(Signature::from_slice(&[0u8; 10]).is_err());
}

#[test]
fn test_public_key_serde_json() {
    let keys = KeyPair::random();
    let json = serde_json::to_string(&keys.public_key()).unwrap();
    let restored: PublicKey = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, keys.public_key());
}

#[test]
fn test_signature_serde_json() {
    let keys = KeyPair::random();
    let sig = keys.sign(b"payload").unwrap();
    let json = serde_json::to_string(&sig).unwrap();
    let restored: Signature = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, sig);
}

#[test]
fn test_generation_chain_is_deterministic() {
    let keys = KeyPair::random();
    let genesis = keccak256(b"genesis");
    let first = generation_signature(&genesis, &keys.public_key());
    let second = generation_signature(&first, &keys.public_key());
    assert_ne!(first, second);
    assert_eq!(hit(&first), hit(&generation_signature(&genesis, &keys.public_key())));
}
