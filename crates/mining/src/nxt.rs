//! Reference proof-of-stake calculator.

use tidal_core::{ParentInfo, PosCalculator, PosError, PosOutcome, PosResult};
use tidal_crypto::Hit;

/// Nxt-style leader election.
///
/// A generator may forge once `base_target * balance * elapsed_seconds`
/// reaches its hit, so the delay is `ceil(hit / (base_target * balance))`
/// seconds. The base target is carried over unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NxtPosCalculator;

impl PosCalculator for NxtPosCalculator {
    fn calculate(
        &self,
        hit: Hit,
        parent: &ParentInfo,
        effective_balance: u64,
    ) -> PosResult<PosOutcome> {
        if effective_balance == 0 {
            return Err(PosError::ZeroBalance);
        }
        if parent.base_target == 0 {
            return Err(PosError::ZeroBaseTarget);
        }

        let target = u128::from(parent.base_target) * u128::from(effective_balance);
        let seconds = u128::from(hit).div_ceil(target);
        let delay_ms = seconds
            .checked_mul(1000)
            .and_then(|ms| u64::try_from(ms).ok())
            .ok_or(PosError::Overflow)?;

        Ok(PosOutcome {
            delay_ms,
            base_target: parent.base_target,
        })
    }
}
