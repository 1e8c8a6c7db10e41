use super::params::{DomainParamSizes, DsaParamsGenerator, GroupParamsGenerator};
use super::{exp_signed, ProofGroup};

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::utils::json::{JsonDecodable, JsonEncodable};
use crate::utils::random::RandomSource;

/// Subgroup of prime order `q` of `Z_p^*`, generated by `g`.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchnorrGroup {
    pub p: BigNumber,
    pub g: BigNumber,
    pub q: BigNumber
}

impl SchnorrGroup {
    /// Generates a fresh group with a `q_bit_length` bit order using the default DSA style generator.
    ///
    /// # Example
    /// ```no_run
    /// use cl_crypto::groups::schnorr::SchnorrGroup;
    ///
    /// let group = SchnorrGroup::new(160).unwrap();
    /// let x = group.random_element(&cl_crypto::utils::random::OpenSslRandom).unwrap();
    /// assert!(group.is_element_in_group(&x).unwrap());
    /// ```
    pub fn new(q_bit_length: usize) -> ClCryptoResult<SchnorrGroup> {
        SchnorrGroup::new_with_generator(q_bit_length, &DsaParamsGenerator::default())
    }

    pub fn new_with_generator(q_bit_length: usize, generator: &dyn GroupParamsGenerator) -> ClCryptoResult<SchnorrGroup> {
        trace!("SchnorrGroup::new_with_generator: >>> q_bit_length: {}", q_bit_length);

        let sizes = DomainParamSizes::from_q_bit_length(q_bit_length)?;

        let (p, g, q) = generator.generate(sizes)
            .map_err(|err| err_msg(ClCryptoErrorKind::GroupGenerationFailure,
                                   format!("Group parameter generator failed: {}", err)))?;

        let group = SchnorrGroup { p, g, q };
        group._check_params()?;

        trace!("SchnorrGroup::new_with_generator: <<< group: {:?}", group);

        Ok(group)
    }

    /// Builds a group from already agreed values. Nothing is validated.
    pub fn from_params(p: BigNumber, g: BigNumber, q: BigNumber) -> SchnorrGroup {
        SchnorrGroup { p, g, q }
    }

    pub fn add(&self, x: &BigNumber, y: &BigNumber) -> ClCryptoResult<BigNumber> {
        x.mod_add(y, &self.p, None)
    }

    pub fn mul(&self, x: &BigNumber, y: &BigNumber) -> ClCryptoResult<BigNumber> {
        x.mod_mul(y, &self.p, None)
    }

    /// `base^exponent mod p`; negative exponents are allowed.
    pub fn exp(&self, base: &BigNumber, exponent: &BigNumber) -> ClCryptoResult<BigNumber> {
        let mut ctx = BigNumber::new_context()?;
        exp_signed(base, exponent, &self.p, &mut ctx)
    }

    pub fn inv(&self, x: &BigNumber) -> ClCryptoResult<BigNumber> {
        let mut ctx = BigNumber::new_context()?;
        ProofGroup::inv(self, x, &mut ctx)
    }

    /// `g^r` for `r` uniform in `[0, q)`.
    pub fn random_element(&self, rng: &dyn RandomSource) -> ClCryptoResult<BigNumber> {
        let r = rng.rand_range(&self.q)?;
        self.g.mod_exp(&r, &self.p, None)
    }

    /// `0 < x < p` and `x^q = 1 (mod p)`.
    pub fn is_element_in_group(&self, x: &BigNumber) -> ClCryptoResult<bool> {
        if x.is_negative() || *x == BigNumber::new()? || *x >= self.p {
            return Ok(false);
        }
        Ok(x.mod_exp(&self.q, &self.p, None)? == BigNumber::from_u32(1)?)
    }

    /// Random exponent in `[0, q)`.
    pub fn random_exponent(&self, rng: &dyn RandomSource) -> ClCryptoResult<BigNumber> {
        rng.rand_range(&self.q)
    }

    pub fn clone(&self) -> ClCryptoResult<SchnorrGroup> {
        Ok(SchnorrGroup {
            p: self.p.clone()?,
            g: self.g.clone()?,
            q: self.q.clone()?
        })
    }

    fn _check_params(&self) -> ClCryptoResult<()> {
        let mut ctx = BigNumber::new_context()?;

        let mut p_minus_one = self.p.clone()?;
        p_minus_one.sub_word(1)?;

        if p_minus_one.modulus(&self.q, Some(&mut ctx))? != BigNumber::new()? {
            return Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, "q does not divide p - 1"));
        }

        let one = BigNumber::from_u32(1)?;
        if self.g == one || self.g.mod_exp(&self.q, &self.p, Some(&mut ctx))? != one {
            return Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, "g is not of order q"));
        }

        Ok(())
    }
}

impl ProofGroup for SchnorrGroup {
    fn modulus(&self) -> &BigNumber {
        &self.p
    }
}

impl JsonEncodable for SchnorrGroup {}

impl<'a> JsonDecodable<'a> for SchnorrGroup {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::random::OpenSslRandom;

    struct FixedGenerator {
        p: u32,
        g: u32,
        q: u32
    }

    impl GroupParamsGenerator for FixedGenerator {
        fn generate(&self, _sizes: DomainParamSizes) -> ClCryptoResult<(BigNumber, BigNumber, BigNumber)> {
            Ok((BigNumber::from_u32(self.p as usize)?,
                BigNumber::from_u32(self.g as usize)?,
                BigNumber::from_u32(self.q as usize)?))
        }
    }

    struct FailingGenerator;

    impl GroupParamsGenerator for FailingGenerator {
        fn generate(&self, _sizes: DomainParamSizes) -> ClCryptoResult<(BigNumber, BigNumber, BigNumber)> {
            Err(err_msg(ClCryptoErrorKind::InvalidState, "entropy exhausted"))
        }
    }

    #[test]
    fn new_works() {
        let group = SchnorrGroup::new(160).unwrap();
        let mut ctx = BigNumber::new_context().unwrap();

        let mut p_minus_one = group.p.clone().unwrap();
        p_minus_one.sub_word(1).unwrap();
        assert_eq!(BigNumber::new().unwrap(), p_minus_one.modulus(&group.q, Some(&mut ctx)).unwrap());
        assert_eq!(BigNumber::from_u32(1).unwrap(), group.exp(&group.g, &group.q).unwrap());

        for _ in 0..1000 {
            let x = group.random_element(&OpenSslRandom).unwrap();
            assert!(group.is_element_in_group(&x).unwrap());
        }
    }

    #[test]
    fn new_rejects_unsupported_size() {
        let err = SchnorrGroup::new(100).unwrap_err();
        assert_eq!(ClCryptoErrorKind::UnsupportedParameterSize, err.kind());
    }

    #[test]
    fn new_with_generator_reports_generator_failure() {
        let err = SchnorrGroup::new_with_generator(160, &FailingGenerator).unwrap_err();
        assert_eq!(ClCryptoErrorKind::GroupGenerationFailure, err.kind());
    }

    #[test]
    fn new_with_generator_rejects_inconsistent_triple() {
        // 5 does not divide 22
        let err = SchnorrGroup::new_with_generator(160, &FixedGenerator { p: 23, g: 2, q: 5 }).unwrap_err();
        assert_eq!(ClCryptoErrorKind::GroupGenerationFailure, err.kind());

        // 5 has order 22 mod 23
        let err = SchnorrGroup::new_with_generator(160, &FixedGenerator { p: 23, g: 5, q: 11 }).unwrap_err();
        assert_eq!(ClCryptoErrorKind::GroupGenerationFailure, err.kind());

        let group = SchnorrGroup::new_with_generator(160, &FixedGenerator { p: 23, g: 2, q: 11 }).unwrap();
        assert_eq!(BigNumber::from_u32(11).unwrap(), group.q);
    }

    #[test]
    fn mul_inv_works() {
        let group = SchnorrGroup::new(160).unwrap();
        let one = BigNumber::from_u32(1).unwrap();

        for _ in 0..20 {
            let x = group.random_element(&OpenSslRandom).unwrap();
            let x_inv = group.inv(&x).unwrap();
            assert_eq!(one, group.mul(&x, &x_inv).unwrap());
        }
    }

    #[test]
    fn exp_with_negative_exponent_works() {
        let group = SchnorrGroup::new(160).unwrap();
        let one = BigNumber::from_u32(1).unwrap();

        for _ in 0..20 {
            let b = group.random_element(&OpenSslRandom).unwrap();
            let e = BigNumber::rand(200).unwrap();
            let mut e_neg = e.clone().unwrap();
            e_neg.set_negative(true).unwrap();

            let res = group.mul(&group.exp(&b, &e).unwrap(), &group.exp(&b, &e_neg).unwrap()).unwrap();
            assert_eq!(one, res);
        }
    }

    #[test]
    fn is_element_in_group_works() {
        let group = SchnorrGroup::from_params(BigNumber::from_u32(23).unwrap(),
                                              BigNumber::from_u32(2).unwrap(),
                                              BigNumber::from_u32(11).unwrap());

        // quadratic residues mod 23 form the subgroup of order 11
        assert!(group.is_element_in_group(&BigNumber::from_u32(4).unwrap()).unwrap());
        assert!(group.is_element_in_group(&BigNumber::from_u32(1).unwrap()).unwrap());
        assert!(!group.is_element_in_group(&BigNumber::from_u32(5).unwrap()).unwrap());
        assert!(!group.is_element_in_group(&BigNumber::from_u32(0).unwrap()).unwrap());
        assert!(!group.is_element_in_group(&BigNumber::from_u32(27).unwrap()).unwrap());
    }

    #[test]
    fn add_works() {
        let group = SchnorrGroup::from_params(BigNumber::from_u32(23).unwrap(),
                                              BigNumber::from_u32(2).unwrap(),
                                              BigNumber::from_u32(11).unwrap());
        let res = group.add(&BigNumber::from_u32(20).unwrap(), &BigNumber::from_u32(5).unwrap()).unwrap();
        assert_eq!(BigNumber::from_u32(2).unwrap(), res);
    }

    #[test]
    fn json_round_trip_works() {
        let group = SchnorrGroup::from_params(BigNumber::from_u32(23).unwrap(),
                                              BigNumber::from_u32(2).unwrap(),
                                              BigNumber::from_u32(11).unwrap());
        let json = group.to_json().unwrap();
        assert_eq!("{\"p\":\"23\",\"g\":\"2\",\"q\":\"11\"}", json);
        assert_eq!(group, SchnorrGroup::from_json(&json).unwrap());
    }
}
