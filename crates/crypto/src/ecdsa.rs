//! # secp256k1 Signatures
//!
//! Block generators sign key blocks, micro-blocks and micro-block
//! announcements with secp256k1 ECDSA keys. Data is hashed with Keccak256
//! before signing.
//!
//! ## Key Types
//!
//! - [`PrivateKey`] - 32-byte secret key
//! - [`PublicKey`] - generator identity, serialized in compressed form (33 bytes)
//! - [`Signature`] - 64-byte `r || s` signature
//! - [`KeyPair`] - a private key together with its public key, owned by the miner
//! - [`Address`] - 20-byte account address derived from a public key
//!
//! ## Example
//!
//! ```rust
//! use tidal_crypto::ecdsa::KeyPair;
//!
//! let keys = KeyPair::random();
//! let signature = keys.sign(b"Hello, Tidal!").unwrap();
//! assert!(signature.verify(b"Hello, Tidal!", &keys.public_key()).unwrap());
//! ```

use std::fmt;
use std::hash::{Hash as StdHash, Hasher as StdHasher};

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature as K256Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{keccak256, CryptoError, Result};

/// Length of a compressed public key.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Length of a serialized signature.
pub const SIGNATURE_LENGTH: usize = 64;

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let input = input.strip_prefix("0x").unwrap_or(input);
    Ok(hex::decode(input)?)
}

/// secp256k1 private key
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a random private key using the OS RNG.
    pub fn random() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Create a private key from a hex string (with or without `0x`).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = decode_hex(hex)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Self::from_bytes(&arr)
    }

    /// Raw secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }

    /// Hash `data` with Keccak256 and sign the digest.
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        self.sign_prehash(&keccak256(data))
    }

    /// Sign a 32-byte digest.
    pub fn sign_prehash(&self, hash: &[u8; 32]) -> Result<Signature> {
        let sig: K256Signature = self
            .inner
            .sign_prehash(hash)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes.copy_from_slice(&sig.to_bytes());
        Ok(Signature(bytes))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}

/// secp256k1 public key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Parse a SEC1-encoded key (compressed or uncompressed).
    fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse a hex-encoded SEC1 key.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Self::from_sec1_bytes(&decode_hex(hex)?)
    }

    /// Compressed SEC1 encoding.
    pub fn to_compressed(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; PUBLIC_KEY_LENGTH];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Hex of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    /// Account address: the last 20 bytes of Keccak256 over the compressed key.
    pub fn to_address(&self) -> Address {
        let hash = keccak256(&self.to_compressed());
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Address(address)
    }

    /// Verify a signature over a 32-byte digest.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not match.
    fn verify_prehash(&self, hash: &[u8; 32], signature: &Signature) -> Result<bool> {
        let sig = signature.to_k256()?;
        Ok(self.inner.verify_prehash(hash, &sig).is_ok())
    }

    /// Verify a signature over raw data (hashed with Keccak256 first).
    pub fn verify(&self, data: &[u8], signature: &Signature) -> Result<bool> {
        self.verify_prehash(&keccak256(data), signature)
    }
}

impl StdHash for PublicKey {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        self.to_compressed().hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.to_compressed())
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            PublicKey::from_sec1_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

/// ECDSA signature (`r || s`)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Parse a signature from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::InvalidLength {
                expected: SIGNATURE_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Parse a hex-encoded signature.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Self::from_slice(&decode_hex(hex)?)
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify this signature against raw data and a public key.
    pub fn verify(&self, data: &[u8], public_key: &PublicKey) -> Result<bool> {
        public_key.verify(data, self)
    }

    fn to_k256(&self) -> Result<K256Signature> {
        K256Signature::from_slice(&self.0).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_LENGTH])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Signature::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Signature::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

/// A generator's signing identity.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Build a key pair from a private key.
    pub fn new(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Generate a fresh random key pair.
    pub fn random() -> Self {
        Self::new(PrivateKey::random())
    }

    /// Parse a hex-encoded secret key.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Ok(Self::new(PrivateKey::from_hex(hex)?))
    }

    /// The public half.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// The account address of this key pair.
    pub fn address(&self) -> Address {
        self.public.to_address()
    }

    /// Sign raw data.
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        self.private.sign(data)
    }
}

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
