//! 32-byte block identifier.
//!
//! A [`BlockId`] is the Keccak256 digest of a block's signed content. IDs are
//! compared for equality and hashed into maps, but carry no meaningful order:
//! the position of a block in a chain comes from the order its ID was
//! announced, never from the ID value.

use crate::{Error, Result};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of a block identifier in bytes
pub const ID_SIZE: usize = 32;

/// Block identifier
///
/// ```rust
/// use tidal_types::BlockId;
///
/// let id = BlockId::digest(b"block bytes");
/// let parsed: BlockId = id.to_hex().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockId([u8; ID_SIZE]);

impl BlockId {
    /// The all-zero ID, used as the parent of a genesis block.
    pub const ZERO: Self = Self([0u8; ID_SIZE]);

    /// Wrap raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Keccak256 digest of `data` as an ID.
    pub fn digest(data: &[u8]) -> Self {
        Self(tidal_crypto::keccak256(data))
    }

    /// Build an ID from a slice of exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; ID_SIZE] = slice.try_into().map_err(|_| Error::InvalidLength {
            expected: ID_SIZE,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Parse a hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Self::from_slice(&hex::decode(s)?)
    }

    /// Full hex encoding without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Whether this is [`BlockId::ZERO`].
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ID_SIZE]
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl FromStr for BlockId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; ID_SIZE]> for BlockId {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for BlockId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Encodable for BlockId {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for BlockId {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        let bytes: Vec<u8> = rlp.as_val()?;
        Self::from_slice(&bytes).map_err(|_| DecoderError::RlpInvalidLength)
    }
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            BlockId::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            BlockId::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
