//! Overflow-safe integer arithmetic for the pool engine.
//!
//! # Rules (enforced in code)
//!
//! - No floats - all arithmetic is integer
//! - Every product of two amounts goes through u128 before narrowing
//! - Narrowing back to u64 is explicit and fallible
//! - Deterministic across all platforms

use lib_types::{Amount, Bps, MAX_BPS};

/// Compute `a * b / denom` with a u128 intermediate product.
///
/// Returns `None` when `denom` is zero or the result does not fit u64.
pub fn mul_div(a: Amount, b: Amount, denom: Amount) -> Option<Amount> {
    if denom == 0 {
        return None;
    }
    let wide = (a as u128) * (b as u128) / (denom as u128);
    u64::try_from(wide).ok()
}

/// floor(sqrt(value)) over the full 128-bit range.
///
/// Binary search for the largest `m` with `m * m <= value`. Used for
/// geometric-mean claim sizing on first deposits, where the exact
/// 128-bit product of the two amounts must not lose precision.
pub fn sqrt_u128(value: u128) -> Amount {
    let mut low: u64 = 0;
    let mut high: u64 = u64::MAX;
    let mut ans: u64 = 0;
    while low <= high {
        let mid = low + (high - low) / 2;
        if (mid as u128) * (mid as u128) <= value {
            ans = mid;
            low = match mid.checked_add(1) {
                Some(v) => v,
                None => break,
            };
        } else {
            high = match mid.checked_sub(1) {
                Some(v) => v,
                None => break,
            };
        }
    }
    ans
}

/// `amount * (10000 - bps) / 10000`, the amount remaining after a
/// bps-denominated deduction. Infallible: the result never exceeds `amount`.
pub fn deduct_bps(amount: Amount, bps: Bps) -> Amount {
    debug_assert!(bps <= MAX_BPS);
    let remaining = (MAX_BPS - bps) as u128;
    ((amount as u128) * remaining / MAX_BPS as u128) as Amount
}

/// `amount * bps / 10000`, the bps-denominated share of an amount.
/// Infallible for `bps <= 10000`: the result never exceeds `amount`.
pub fn take_bps(amount: Amount, bps: Bps) -> Amount {
    debug_assert!(bps <= MAX_BPS);
    ((amount as u128) * (bps as u128) / MAX_BPS as u128) as Amount
}
