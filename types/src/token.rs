//! Token amounts in atto units.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;

/// 10^18 atto per whole token
const ATTO_DIGITS: usize = 18;

/// Arbitrary-precision signed token amount, stored in atto units.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(BigInt);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn from_atto(atto: impl Into<BigInt>) -> Self {
        Self(atto.into())
    }

    /// Whole tokens, mostly useful in tests
    pub fn from_whole(tokens: i64) -> Self {
        Self(BigInt::from(tokens) * BigInt::from(10u64).pow(ATTO_DIGITS as u32))
    }

    pub fn atto(&self) -> &BigInt {
        &self.0
    }

    pub fn into_atto(self) -> BigInt {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// `self * 100 / whole` as a float, `0.0` when `whole` is zero.
    pub fn percent_of(&self, whole: &TokenAmount) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        // Scale before dividing so large amounts keep four decimals
        let scaled = (&self.0 * BigInt::from(1_000_000u64)) / &whole.0;
        scaled.to_f64().unwrap_or(0.0) / 10_000.0
    }

    /// Render as whole tokens with trailing zeros trimmed, without unit
    pub fn to_decimal_string(&self) -> String {
        let negative = self.0.is_negative();
        let digits = self.0.abs().to_string();
        let (int_part, frac_part) = if digits.len() > ATTO_DIGITS {
            let split = digits.len() - ATTO_DIGITS;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = ATTO_DIGITS))
        };
        let frac = frac_part.trim_end_matches('0');
        let sign = if negative { "-" } else { "" };
        if frac.is_empty() {
            format!("{}{}", sign, int_part)
        } else {
            format!("{}{}.{}", sign, int_part, frac)
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} FIL", self.to_decimal_string())
    }
}

impl FromStr for TokenAmount {
    type Err = num_bigint::ParseBigIntError;

    /// Parses an atto-denominated decimal integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s.trim()).map(Self)
    }
}

impl From<BigInt> for TokenAmount {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<i64> for TokenAmount {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl Add for TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&TokenAmount> for TokenAmount {
    fn add_assign(&mut self, rhs: &TokenAmount) {
        self.0 += &rhs.0;
    }
}

impl Sub for TokenAmount {
    type Output = TokenAmount;
    fn sub(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;
    fn sub(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 - &rhs.0)
    }
}

impl Mul<i64> for &TokenAmount {
    type Output = TokenAmount;
    fn mul(self, rhs: i64) -> TokenAmount {
        TokenAmount(&self.0 * BigInt::from(rhs))
    }
}

impl<'a> Sum<&'a TokenAmount> for TokenAmount {
    fn sum<I: Iterator<Item = &'a TokenAmount>>(iter: I) -> Self {
        iter.fold(TokenAmount::zero(), |mut acc, x| {
            acc += x;
            acc
        })
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bigint_string::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bigint_string::deserialize(deserializer).map(Self)
    }
}

/// Serde adapter: big integers travel as decimal strings
pub mod bigint_string {
    use num_bigint::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => BigInt::from_str(s.trim()).map_err(de::Error::custom),
            Raw::Int(i) => Ok(BigInt::from(i)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_trims_fraction() {
        assert_eq!(TokenAmount::zero().to_string(), "0 FIL");
        assert_eq!(TokenAmount::from_whole(3).to_string(), "3 FIL");
        let amount = TokenAmount::from_atto(1_500_000_000_000_000_000i64);
        assert_eq!(amount.to_string(), "1.5 FIL");
        assert_eq!(TokenAmount::from_atto(1i64).to_decimal_string(), "0.000000000000000001");
        assert_eq!(TokenAmount::from_atto(-250_000_000_000_000_000i64).to_decimal_string(), "-0.25");
    }

    #[test]
    fn test_arithmetic() {
        let a = TokenAmount::from_whole(2);
        let b = TokenAmount::from_whole(5);
        assert_eq!(&a + &b, TokenAmount::from_whole(7));
        assert_eq!(&b - &a, TokenAmount::from_whole(3));
        assert_eq!(&a * 4, TokenAmount::from_whole(8));
        let total: TokenAmount = [a, b].iter().sum();
        assert_eq!(total, TokenAmount::from_whole(7));
    }

    #[test]
    fn test_percent_of() {
        let part = TokenAmount::from_whole(1);
        let whole = TokenAmount::from_whole(8);
        assert_eq!(part.percent_of(&whole), 12.5);
        assert_eq!(part.percent_of(&TokenAmount::zero()), 0.0);
    }

    #[test]
    fn test_serde_as_string() {
        let amount = TokenAmount::from_atto(123_456i64);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"123456\"");
        let back: TokenAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
        let from_int: TokenAmount = serde_json::from_str("42").unwrap();
        assert_eq!(from_int, TokenAmount::from_atto(42i64));
    }
}
