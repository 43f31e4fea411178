//! Smoothed macro signals.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::token::bigint_string;

/// Position + velocity summary of a network-wide signal (block reward or
/// total quality-adjusted power). Both components are Q.128 fixed point
/// on chain. Projection derives new instances; existing ones never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothedEstimate {
    #[serde(with = "bigint_string")]
    pub position: BigInt,
    #[serde(with = "bigint_string")]
    pub velocity: BigInt,
}

impl SmoothedEstimate {
    pub fn new(position: impl Into<BigInt>, velocity: impl Into<BigInt>) -> Self {
        Self {
            position: position.into(),
            velocity: velocity.into(),
        }
    }

    /// Scale both components by `factor_milli / 1000`, truncating.
    ///
    /// Multiplication happens before division so results are
    /// reproducible bit-for-bit.
    pub fn scale_milli(&self, factor_milli: i64) -> Self {
        let factor = BigInt::from(factor_milli);
        let thousand = BigInt::from(1000);
        Self {
            position: (&self.position * &factor) / &thousand,
            velocity: (&self.velocity * &factor) / &thousand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_milli_truncates() {
        let e = SmoothedEstimate::new(1999, -7);
        let scaled = e.scale_milli(500);
        assert_eq!(scaled.position, BigInt::from(999));
        // BigInt division truncates toward zero
        assert_eq!(scaled.velocity, BigInt::from(-3));
        assert_eq!(e.scale_milli(1000), e);
    }
}
