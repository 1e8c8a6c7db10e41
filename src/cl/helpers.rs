use super::constants::MAX_PRIME_CANDIDATES;
use super::ClParams;

use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;
use crate::utils::random::RandomSource;

use std::collections::HashSet;

/// `2^bits`.
pub fn two_pow(bits: usize) -> ClCryptoResult<BigNumber> {
    let mut res = BigNumber::new()?;
    res.set_bit(bits as i32)?;
    Ok(res)
}

/// Square of a random element of `Z_n`.
pub fn random_qr(n: &BigNumber, rng: &dyn RandomSource, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    trace!("Helpers::random_qr: >>> n: {:?}", n);

    let qr = rng.rand_range(n)?
        .mod_exp(&BigNumber::from_u32(2)?, n, Some(&mut *ctx))?;

    trace!("Helpers::random_qr: <<< qr: {:?}", qr);

    Ok(qr)
}

/// Random exponent in `[2, p'q' - 1)`.
pub fn gen_x(p_prime: &BigNumber, q_prime: &BigNumber, rng: &dyn RandomSource,
             ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    let mut bound = p_prime.mul(q_prime, Some(&mut *ctx))?;
    bound.sub_word(3)?;

    let mut x = rng.rand_range(&bound)?;
    x.add_word(2)?;

    Ok(x)
}

/// Interval `[2^(e_bit_len - 1), 2^(e_bit_len - 1) + 2^(e1_bit_len - 1)]` the prime `e` lives in.
pub fn e_range(params: &ClParams) -> ClCryptoResult<(BigNumber, BigNumber)> {
    let start = two_pow(params.e_bit_len - 1)?;
    let end = start.add(&two_pow(params.e1_bit_len - 1)?)?;
    Ok((start, end))
}

pub fn generate_prime_in_range(start: &BigNumber, end: &BigNumber, rng: &dyn RandomSource,
                               ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    trace!("Helpers::generate_prime_in_range: >>> start: {:?}, end: {:?}", start, end);

    let mut width = end.sub(start)?;
    width.add_word(1)?;

    for _ in 0..MAX_PRIME_CANDIDATES {
        let mut candidate = rng.rand_range(&width)?.add(start)?;
        candidate.set_bit(0)?;

        if candidate <= *end && candidate.is_prime(Some(&mut *ctx))? {
            trace!("Helpers::generate_prime_in_range: <<< prime: {:?}", candidate);
            return Ok(candidate);
        }
    }

    Err(err_msg(ClCryptoErrorKind::InvalidState,
                format!("No prime found in [{}, {}]", start.to_dec()?, end.to_dec()?)))
}

/// `v''` of exactly `v_bit_len` bits.
pub fn generate_v_prime_prime(params: &ClParams, rng: &dyn RandomSource) -> ClCryptoResult<BigNumber> {
    let mut v = rng.rand_bits(params.v_bit_len - 1)?;
    v.set_bit(params.v_bit_len as i32 - 1)?;
    Ok(v)
}

pub fn check_capacity(count: usize, capacity: usize, what: &str) -> ClCryptoResult<()> {
    if count > capacity {
        return Err(err_msg(ClCryptoErrorKind::CapacityExceeded,
                           format!("{} {} attributes exceed the capacity of {}", count, what, capacity)));
    }
    Ok(())
}

/// Every index must be below `count` and appear once.
pub fn check_reveal_indices(indices: &[usize], count: usize, what: &str) -> ClCryptoResult<()> {
    let mut seen: HashSet<usize> = HashSet::new();

    for &idx in indices {
        if idx >= count {
            return Err(err_msg(ClCryptoErrorKind::IndexOutOfRange,
                               format!("Revealed {} index {} is out of range 0..{}", what, idx, count)));
        }
        if !seen.insert(idx) {
            return Err(err_msg(ClCryptoErrorKind::IndexOutOfRange,
                               format!("Revealed {} index {} is repeated", what, idx)));
        }
    }
    Ok(())
}

/// Positions in `0..count` not listed in `revealed`, in ascending order.
pub fn unrevealed_indices(count: usize, revealed: &[usize]) -> Vec<usize> {
    (0..count).filter(|idx| !revealed.contains(idx)).collect()
}
