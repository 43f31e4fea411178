//! Reference implementation of the protocol penalty formulas.
//!
//! Covers network version 25 and later (miner actor v16). Signals are
//! Q.128 fixed point as stored in the reward and power actors.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use terminator_types::{
    ChainEpoch, NetworkVersion, SmoothedEstimate, TerminatorError, TerminatorResult, TokenAmount,
    EPOCHS_IN_DAY,
};

use crate::traits::PenaltyModel;

const PRECISION: usize = 128;

/// Squared power velocity (Q.128) above `2^-64` selects the logarithmic
/// extrapolation
const CUM_SUM_EPSILON_SHIFT: usize = PRECISION - 64;

/// Lowest network version these formulas are valid for
pub const MIN_NETWORK_VERSION: NetworkVersion = 25;

/// Days of expected reward charged per continued-fault day, as 351/100
const CONTINUED_FAULT_FACTOR_NUM: i64 = 351;
const CONTINUED_FAULT_FACTOR_DENOM: i64 = 100;
const CONTINUED_FAULT_PROJECTION_PERIOD: ChainEpoch =
    EPOCHS_IN_DAY * CONTINUED_FAULT_FACTOR_NUM / CONTINUED_FAULT_FACTOR_DENOM;

/// Termination fee cap as a fraction of initial pledge, 85/1000
const TERMINATION_PLEDGE_NUM: i64 = 85;
const TERMINATION_PLEDGE_DENOM: i64 = 1000;
/// Age at which the pledge-based fee reaches its cap
const TERMINATION_LIFETIME_CAP: ChainEpoch = 180 * EPOCHS_IN_DAY;
/// Minimum termination fee as a fraction of initial pledge, 2/100
const TERMINATION_MIN_PLEDGE_NUM: i64 = 2;
const TERMINATION_MIN_PLEDGE_DENOM: i64 = 100;
/// Fault fee multiplier for the termination floor, 105/100
const TERMINATION_FAULT_FACTOR_NUM: i64 = 105;
const TERMINATION_FAULT_FACTOR_DENOM: i64 = 100;

/// Continued-fault and termination fees for miner actor v16.
///
/// Logarithms in the reward extrapolation are evaluated with an exact
/// series rather than the actors' polynomial approximation, so fees can
/// differ from on-chain values in the last few atto.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolPenalties;

impl ProtocolPenalties {
    pub fn new() -> Self {
        Self
    }

    fn check_version(version: NetworkVersion) -> TerminatorResult<()> {
        if version < MIN_NETWORK_VERSION {
            return Err(TerminatorError::UnsupportedVersion {
                version,
                minimum: MIN_NETWORK_VERSION,
            });
        }
        Ok(())
    }
}

fn estimate(signal: &SmoothedEstimate) -> BigInt {
    &signal.position >> PRECISION
}

fn q128_one() -> BigInt {
    BigInt::one() << PRECISION
}

/// `2·atanh(num/den)` as Q.128; converges for `0 <= num/den <= 1/3`
fn atanh2(num: &BigInt, den: &BigInt) -> BigInt {
    let z = (num << PRECISION) / den;
    let z2 = (&z * &z) >> PRECISION;
    let mut term = z;
    let mut sum = BigInt::zero();
    let mut n = 1u32;
    while !term.is_zero() {
        sum += &term / BigInt::from(n);
        term = (&term * &z2) >> PRECISION;
        n += 2;
    }
    sum << 1usize
}

/// Natural logarithm of a positive Q.128 value, as Q.128.
///
/// `x = m·2^k` with `m` in `[1, 2)`, `ln x = k·ln 2 + 2·atanh((m-1)/(m+1))`.
fn ln_q128(x: &BigInt) -> Option<BigInt> {
    if !x.is_positive() {
        return None;
    }
    let k = x.bits() as i64 - 1 - PRECISION as i64;
    let m = if k >= 0 {
        x >> (k as usize)
    } else {
        x << ((-k) as usize)
    };
    let one = q128_one();
    let ln_m = atanh2(&(&m - &one), &(&m + &one));
    let ln_2 = atanh2(&BigInt::one(), &BigInt::from(3));
    Some(BigInt::from(k) * ln_2 + ln_m)
}

/// Integral of `reward(t) / power(t)` over `delta` epochs from now, Q.128.
///
/// With a moving power estimate the ratio of two lines integrates to a
/// logarithm; a (near) constant power denominator uses the midpoint rule.
fn extrapolated_cum_sum_of_ratio(
    delta: ChainEpoch,
    reward: &SmoothedEstimate,
    power: &SmoothedEstimate,
) -> BigInt {
    let delta_t = BigInt::from(delta) << PRECISION;
    let (pos_1, velo_1) = (&reward.position, &reward.velocity);
    let (pos_2, velo_2) = (&power.position, &power.velocity);

    let squared_velo_2 = (velo_2 * velo_2) >> PRECISION;
    if squared_velo_2 > BigInt::one() << CUM_SUM_EPSILON_SHIFT {
        let x2a = pos_2.clone();
        let x2b = ((&delta_t * velo_2) >> PRECISION) + &x2a;
        if let (Some(ln_a), Some(ln_b)) = (ln_q128(&x2a), ln_q128(&x2b)) {
            let m1 = ((&ln_b - &ln_a) * pos_1 * velo_2) >> PRECISION;
            let m2 = (((&ln_a - &ln_b) * pos_2 + velo_2 * &delta_t) * velo_1) >> PRECISION;
            return (m2 + m1) / squared_velo_2;
        }
    }

    let half_delta = &delta_t >> 1usize;
    let reward_mid = pos_1 + ((velo_1 * half_delta) >> PRECISION);
    (reward_mid * delta_t) / pos_2
}

/// Reward a sector of `qa_power` is expected to earn over `projection`
/// epochs
fn expected_reward_for_power(
    reward: &SmoothedEstimate,
    power: &SmoothedEstimate,
    qa_power: &BigInt,
    projection: ChainEpoch,
) -> BigInt {
    if estimate(power).is_zero() {
        return estimate(reward);
    }

    let cum_ratio = extrapolated_cum_sum_of_ratio(projection, reward, power);
    let expected = (qa_power * cum_ratio) >> PRECISION;
    if expected.is_negative() {
        BigInt::zero()
    } else {
        expected
    }
}

fn ratio(value: &BigInt, num: i64, denom: i64) -> BigInt {
    value * BigInt::from(num) / BigInt::from(denom)
}

impl PenaltyModel for ProtocolPenalties {
    fn continued_fault_fee(
        &self,
        version: NetworkVersion,
        reward: &SmoothedEstimate,
        power: &SmoothedEstimate,
        qa_power: &BigInt,
    ) -> TerminatorResult<TokenAmount> {
        Self::check_version(version)?;
        Ok(TokenAmount::from_atto(expected_reward_for_power(
            reward,
            power,
            qa_power,
            CONTINUED_FAULT_PROJECTION_PERIOD,
        )))
    }

    fn termination_fee(
        &self,
        version: NetworkVersion,
        initial_pledge: &TokenAmount,
        age: ChainEpoch,
        fault_fee: &TokenAmount,
    ) -> TerminatorResult<TokenAmount> {
        Self::check_version(version)?;
        let pledge = initial_pledge.atto();

        let capped = ratio(pledge, TERMINATION_PLEDGE_NUM, TERMINATION_PLEDGE_DENOM);
        let ramped = pledge * BigInt::from(age.max(0)) * BigInt::from(TERMINATION_PLEDGE_NUM)
            / BigInt::from(TERMINATION_PLEDGE_DENOM * TERMINATION_LIFETIME_CAP);
        let pledge_based = capped.min(ramped);

        let minimum = ratio(pledge, TERMINATION_MIN_PLEDGE_NUM, TERMINATION_MIN_PLEDGE_DENOM);
        let fault_based = ratio(
            fault_fee.atto(),
            TERMINATION_FAULT_FACTOR_NUM,
            TERMINATION_FAULT_FACTOR_DENOM,
        );

        Ok(TokenAmount::from_atto(pledge_based.max(minimum.max(fault_based))))
    }
}
