use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;

/// Special RSA modulus `n = p * q` with safe primes `p = 2p' + 1` and `q = 2q' + 1`.
///
/// Returns `(n, p', q')`.
pub fn generate_special_rsa_modulus(size_in_bits: usize,
                                    ctx: &mut BigNumberContext) -> ClCryptoResult<(BigNumber, BigNumber, BigNumber)> {
    trace!("generate_special_rsa_modulus: >>> size_in_bits: {}", size_in_bits);

    if size_in_bits % 2 != 0 || size_in_bits == 0 {
        return Err(err_msg(ClCryptoErrorKind::InvalidParam(1),
                           format!("Need a positive even number of bits, found {}", size_in_bits)));
    }

    let factor_size = size_in_bits / 2;
    let (p, q) = loop {
        let p = BigNumber::generate_safe_prime(factor_size)?;
        let q = BigNumber::generate_safe_prime(factor_size)?;
        if p != q {
            break (p, q);
        }
    };

    let n = p.mul(&q, Some(&mut *ctx))?;
    let p_prime = _sophie_germain_part(&p)?;
    let q_prime = _sophie_germain_part(&q)?;

    trace!("generate_special_rsa_modulus: <<< n: {:?}", n);

    Ok((n, p_prime, q_prime))
}

fn _sophie_germain_part(safe_prime: &BigNumber) -> ClCryptoResult<BigNumber> {
    let mut res = safe_prime.clone()?;
    res.sub_word(1)?.div_word(2)?;
    Ok(res)
}
