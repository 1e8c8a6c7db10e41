use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;

/// Generate a pedersen commitment to a given number
///
/// # Arguments
/// * `gen_1` - first generator
/// * `m` - exponent of the first generator
/// * `gen_2` - second generator
/// * `r` - exponent of the second generator
/// * `modulus` - all computations are done this modulo
/// * `ctx` - big number context
///
/// # Result
/// Return the pedersen commitment, i.e `(gen_1^m)*(gen_2^r)`
pub fn get_pedersen_commitment(gen_1: &BigNumber, m: &BigNumber,
                               gen_2: &BigNumber, r: &BigNumber,
                               modulus: &BigNumber, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    let commitment = gen_1.mod_exp(m, modulus, Some(&mut *ctx))?
        .mod_mul(&gen_2.mod_exp(r, modulus, Some(&mut *ctx))?, modulus, Some(&mut *ctx))?;
    Ok(commitment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pedersen_commitment_works() {
        let mut ctx = BigNumber::new_context().unwrap();
        let p = BigNumber::from_dec("23").unwrap();
        let g = BigNumber::from_dec("4").unwrap();
        let h = BigNumber::from_dec("9").unwrap();

        // 4^3 * 9^5 mod 23 = 18 * 8 mod 23 = 6
        let c = get_pedersen_commitment(&g, &BigNumber::from_dec("3").unwrap(),
                                        &h, &BigNumber::from_dec("5").unwrap(),
                                        &p, &mut ctx).unwrap();
        assert_eq!(BigNumber::from_dec("6").unwrap(), c);
    }
}
