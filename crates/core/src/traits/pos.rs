//! Proof-of-stake calculator contract.
//!
//! Leader election is a pure function of the generator's hit, the parent
//! block and the generator's effective balance. It yields how long after the
//! parent the generator may forge and the base target its block must carry.

use thiserror::Error;
use tidal_crypto::Hit;

/// Errors from proof-of-stake arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PosError {
    /// Generators with no balance never forge.
    #[error("effective balance is zero")]
    ZeroBalance,

    /// The parent carries a zero base target.
    #[error("base target is zero")]
    ZeroBaseTarget,

    /// Intermediate arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,
}

/// Result type for proof-of-stake operations.
pub type PosResult<T> = Result<T, PosError>;

/// The parent fields leader election depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentInfo {
    /// Parent height
    pub height: u64,
    /// Parent timestamp in milliseconds
    pub timestamp: u64,
    /// Parent base target
    pub base_target: u64,
}

/// Result of leader election for one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosOutcome {
    /// Milliseconds after the parent timestamp at which the generator may forge
    pub delay_ms: u64,
    /// Base target of the generator's block
    pub base_target: u64,
}

/// Pluggable leader-election arithmetic.
pub trait PosCalculator: Send + Sync + 'static {
    /// Compute when a generator with `hit` and `effective_balance` may forge
    /// on top of `parent`.
    fn calculate(
        &self,
        hit: Hit,
        parent: &ParentInfo,
        effective_balance: u64,
    ) -> PosResult<PosOutcome>;
}
