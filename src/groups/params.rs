use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;
use crate::utils::random::{OpenSslRandom, RandomSource};

use std::sync::Arc;

const MAX_Q_ATTEMPTS: usize = 16;

/// Supported (modulus, subgroup order) bit length pairs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DomainParamSizes {
    L1024N160,
    L2048N224,
    L2048N256,
}

impl DomainParamSizes {
    pub fn from_q_bit_length(q_bit_length: usize) -> ClCryptoResult<DomainParamSizes> {
        match q_bit_length {
            160 => Ok(DomainParamSizes::L1024N160),
            224 => Ok(DomainParamSizes::L2048N224),
            256 => Ok(DomainParamSizes::L2048N256),
            _ => Err(err_msg(ClCryptoErrorKind::UnsupportedParameterSize,
                             format!("Subgroup order of {} bits is not supported", q_bit_length)))
        }
    }

    /// Bit length of the modulus P.
    pub fn l(&self) -> usize {
        match *self {
            DomainParamSizes::L1024N160 => 1024,
            DomainParamSizes::L2048N224 | DomainParamSizes::L2048N256 => 2048,
        }
    }

    /// Bit length of the subgroup order Q.
    pub fn n(&self) -> usize {
        match *self {
            DomainParamSizes::L1024N160 => 160,
            DomainParamSizes::L2048N224 => 224,
            DomainParamSizes::L2048N256 => 256,
        }
    }
}

/// Produces `(p, g, q)` with `q | p - 1` and `g` of order `q`.
pub trait GroupParamsGenerator {
    fn generate(&self, sizes: DomainParamSizes) -> ClCryptoResult<(BigNumber, BigNumber, BigNumber)>;
}

/// DSA style generation (FIPS 186 without the seed based validation data).
pub struct DsaParamsGenerator {
    rng: Arc<dyn RandomSource>
}

impl DsaParamsGenerator {
    pub fn new(rng: Arc<dyn RandomSource>) -> DsaParamsGenerator {
        DsaParamsGenerator { rng }
    }

    fn _random_with_top_bit(&self, bits: usize) -> ClCryptoResult<BigNumber> {
        let mut x = self.rng.rand_bits(bits)?;
        x.set_bit(bits as i32 - 1)?;
        Ok(x)
    }

    fn _gen_q(&self, bits: usize, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
        for _ in 0..(100 * bits) {
            let mut q = self._random_with_top_bit(bits)?;
            q.set_bit(0)?;
            if q.is_prime(Some(&mut *ctx))? {
                return Ok(q);
            }
        }
        Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, format!("No {} bit prime found", bits)))
    }

    fn _gen_p(&self, q: &BigNumber, bits: usize, ctx: &mut BigNumberContext) -> ClCryptoResult<Option<BigNumber>> {
        let two_q = q.add(q)?;

        for _ in 0..(4 * bits) {
            let x = self._random_with_top_bit(bits)?;
            let mut c = x.modulus(&two_q, Some(&mut *ctx))?;
            c.sub_word(1)?;
            let p = x.sub(&c)?;

            if p.num_bits()? as usize == bits && p.is_prime(Some(&mut *ctx))? {
                return Ok(Some(p));
            }
        }
        Ok(None)
    }

    fn _gen_g(&self, p: &BigNumber, q: &BigNumber, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
        let one = BigNumber::from_u32(1)?;
        let mut p_minus_one = p.clone()?;
        p_minus_one.sub_word(1)?;
        let exp = p_minus_one.div(q, Some(&mut *ctx))?;

        let mut h = BigNumber::from_u32(2)?;
        while h < p_minus_one {
            let g = h.mod_exp(&exp, p, Some(&mut *ctx))?;
            if g != one {
                return Ok(g);
            }
            h.add_word(1)?;
        }
        Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, "No generator found"))
    }
}

impl Default for DsaParamsGenerator {
    fn default() -> DsaParamsGenerator {
        DsaParamsGenerator::new(Arc::new(OpenSslRandom))
    }
}

impl GroupParamsGenerator for DsaParamsGenerator {
    fn generate(&self, sizes: DomainParamSizes) -> ClCryptoResult<(BigNumber, BigNumber, BigNumber)> {
        trace!("DsaParamsGenerator::generate: >>> sizes: {:?}", sizes);

        let mut ctx = BigNumber::new_context()?;

        for _ in 0..MAX_Q_ATTEMPTS {
            let q = self._gen_q(sizes.n(), &mut ctx)?;

            match self._gen_p(&q, sizes.l(), &mut ctx)? {
                Some(p) => {
                    let g = self._gen_g(&p, &q, &mut ctx)?;

                    trace!("DsaParamsGenerator::generate: <<< p: {:?}, g: {:?}, q: {:?}", p, g, q);

                    return Ok((p, g, q));
                }
                None => debug!("DsaParamsGenerator::generate: no prime p for current q, drawing a new q")
            }
        }

        Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, "No (p, q) pair found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_q_bit_length_works() {
        assert_eq!(DomainParamSizes::L1024N160, DomainParamSizes::from_q_bit_length(160).unwrap());
        assert_eq!(DomainParamSizes::L2048N224, DomainParamSizes::from_q_bit_length(224).unwrap());
        assert_eq!(DomainParamSizes::L2048N256, DomainParamSizes::from_q_bit_length(256).unwrap());
        assert_eq!(2048, DomainParamSizes::L2048N256.l());
    }

    #[test]
    fn from_q_bit_length_rejects_other_sizes() {
        let err = DomainParamSizes::from_q_bit_length(100).unwrap_err();
        assert_eq!(ClCryptoErrorKind::UnsupportedParameterSize, err.kind());
    }

    #[test]
    fn dsa_generator_works() {
        let mut ctx = BigNumber::new_context().unwrap();
        let (p, g, q) = DsaParamsGenerator::default().generate(DomainParamSizes::L1024N160).unwrap();

        assert_eq!(1024, p.num_bits().unwrap());
        assert_eq!(160, q.num_bits().unwrap());
        assert!(p.is_prime(Some(&mut ctx)).unwrap());
        assert!(q.is_prime(Some(&mut ctx)).unwrap());

        let mut p_minus_one = p.clone().unwrap();
        p_minus_one.sub_word(1).unwrap();
        assert_eq!(BigNumber::new().unwrap(), p_minus_one.modulus(&q, Some(&mut ctx)).unwrap());
        assert_eq!(BigNumber::from_u32(1).unwrap(), g.mod_exp(&q, &p, Some(&mut ctx)).unwrap());
    }
}
