//! Cumulative chain score.
//!
//! The score of a block is `2^64 / base_target`; the score of a chain is the
//! sum over its blocks. Peers announce their chain score and the node syncs
//! with whichever peer carries more weight.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Arbitrary-precision non-negative chain weight.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Score(BigUint);

impl Score {
    /// Zero score.
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    /// Score contributed by a single block with the given base target.
    ///
    /// A zero base target contributes nothing.
    pub fn from_base_target(base_target: u64) -> Self {
        if base_target == 0 {
            return Self::zero();
        }
        Self((BigUint::from(1u8) << 64u32) / BigUint::from(base_target))
    }

    /// Parse a big-endian byte encoding.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Big-endian byte encoding.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// Underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for Score {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Score {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        Score(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Score> for &'a Score {
    type Output = Score;

    fn add(self, rhs: &'a Score) -> Score {
        Score(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Score> for Score {
    fn add_assign(&mut self, rhs: &Score) {
        self.0 += &rhs.0;
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({})", self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
