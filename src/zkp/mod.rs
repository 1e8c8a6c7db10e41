//! Non-interactive proofs of knowledge of exponents satisfying public multi-base relations.
//!
//! A `Relation` is a list of statements `y_k = Π base_kj^{x_ij}` over shared secrets `x_i`.
//! Statements may live in different groups; a secret used in several statements is proven
//! equal across them. The challenge is SHA-256 over every base, value and commitment plus the
//! session nonce.

use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;
use crate::groups::ProofGroup;
use crate::utils::get_hash_as_int;
use crate::utils::json::{JsonDecodable, JsonEncodable};
use crate::utils::random::RandomSource;

/// Where responses for a secret are computed.
#[derive(Debug)]
pub enum ResponseSpace<'a> {
    /// Over the integers, masked by randomness `hash_bit_len + sec_param` bits wider than the secret.
    Integers,
    /// Modulo a group order. Only the prover knows the order; verifiers pass `None`.
    Modular(Option<&'a BigNumber>),
}

#[derive(Debug)]
pub struct SecretSpec<'a> {
    pub bit_len: usize,
    pub space: ResponseSpace<'a>
}

impl<'a> SecretSpec<'a> {
    pub fn integer(bit_len: usize) -> SecretSpec<'a> {
        SecretSpec { bit_len, space: ResponseSpace::Integers }
    }

    pub fn modular(bit_len: usize, order: Option<&'a BigNumber>) -> SecretSpec<'a> {
        SecretSpec { bit_len, space: ResponseSpace::Modular(order) }
    }
}

#[derive(Debug)]
pub struct Statement<'a> {
    pub group: &'a dyn ProofGroup,
    pub value: BigNumber,
    /// `(base, secret index)` pairs.
    pub terms: Vec<(&'a BigNumber, usize)>
}

#[derive(Debug)]
pub struct Relation<'a> {
    pub secrets: Vec<SecretSpec<'a>>,
    pub statements: Vec<Statement<'a>>
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SigmaProof {
    pub c: BigNumber,
    pub responses: Vec<BigNumber>
}

impl SigmaProof {
    pub fn clone(&self) -> ClCryptoResult<SigmaProof> {
        Ok(SigmaProof {
            c: self.c.clone()?,
            responses: crate::utils::clone_bignum_vec(&self.responses)?
        })
    }
}

impl JsonEncodable for SigmaProof {}

impl<'a> JsonDecodable<'a> for SigmaProof {}

/// Lengths shaping the challenge and the masking randomness.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProofParams {
    pub hash_bit_len: usize,
    pub sec_param: usize
}

impl ProofParams {
    fn tilde_bit_len(&self, secret: &SecretSpec) -> usize {
        secret.bit_len + self.hash_bit_len + self.sec_param
    }
}

pub fn prove(relation: &Relation,
             witnesses: &[&BigNumber],
             nonce: &BigNumber,
             params: &ProofParams,
             rng: &dyn RandomSource) -> ClCryptoResult<SigmaProof> {
    trace!("zkp::prove: >>> relation: {:?}, nonce: {:?}", relation, nonce);

    _check_shape(relation)?;

    if witnesses.len() != relation.secrets.len() {
        return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                           format!("Expected {} witnesses, found {}", relation.secrets.len(), witnesses.len())));
    }

    let mut ctx = BigNumber::new_context()?;

    let mut tildes: Vec<BigNumber> = Vec::with_capacity(witnesses.len());
    for secret in relation.secrets.iter() {
        let tilde = match secret.space {
            ResponseSpace::Integers => rng.rand_bits(params.tilde_bit_len(secret))?,
            ResponseSpace::Modular(Some(order)) => rng.rand_range(order)?,
            ResponseSpace::Modular(None) =>
                return Err(err_msg(ClCryptoErrorKind::InvalidState, "Prover needs the order of a modular secret"))
        };
        tildes.push(tilde);
    }

    let mut t_values: Vec<BigNumber> = Vec::with_capacity(relation.statements.len());
    for statement in relation.statements.iter() {
        t_values.push(_multi_exp(statement, &tildes, &mut ctx)?);
    }

    let c = _challenge(relation, &t_values, nonce)?;

    let mut responses: Vec<BigNumber> = Vec::with_capacity(witnesses.len());
    for ((secret, tilde), witness) in relation.secrets.iter().zip(tildes.iter()).zip(witnesses.iter()) {
        let cx = c.mul(witness, Some(&mut ctx))?;
        let s = match secret.space {
            ResponseSpace::Modular(Some(order)) => tilde.mod_add(&cx, order, Some(&mut ctx))?,
            _ => tilde.add(&cx)?
        };
        responses.push(s);
    }

    let proof = SigmaProof { c, responses };

    trace!("zkp::prove: <<< proof: {:?}", proof);

    Ok(proof)
}

/// `Ok(false)` when a response is out of range or the recomputed challenge differs.
pub fn verify(relation: &Relation,
              proof: &SigmaProof,
              nonce: &BigNumber,
              params: &ProofParams) -> ClCryptoResult<bool> {
    trace!("zkp::verify: >>> relation: {:?}, proof: {:?}, nonce: {:?}", relation, proof, nonce);

    _check_shape(relation)?;

    if proof.responses.len() != relation.secrets.len() {
        return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                           format!("Expected {} responses, found {}", relation.secrets.len(), proof.responses.len())));
    }

    for (i, (secret, s)) in relation.secrets.iter().zip(proof.responses.iter()).enumerate() {
        let in_range = match secret.space {
            ResponseSpace::Integers =>
                s.num_bits()? as usize <= params.tilde_bit_len(secret) + 1,
            ResponseSpace::Modular(order) =>
                !s.is_negative()
                    && s.num_bits()? as usize <= secret.bit_len
                    && order.map(|order| s < order).unwrap_or(true)
        };
        if !in_range {
            debug!("zkp::verify: response {} is out of range", i);
            return Ok(false);
        }
    }

    let mut ctx = BigNumber::new_context()?;

    let mut minus_c = proof.c.clone()?;
    minus_c.set_negative(!proof.c.is_negative())?;

    let mut t_values: Vec<BigNumber> = Vec::with_capacity(relation.statements.len());
    for statement in relation.statements.iter() {
        let t = statement.group.exp(&statement.value, &minus_c, &mut ctx)?;
        let t = statement.group.mul(&t, &_multi_exp(statement, &proof.responses, &mut ctx)?, &mut ctx)?;
        t_values.push(t);
    }

    let c = _challenge(relation, &t_values, nonce)?;
    let valid = c == proof.c;

    if !valid {
        debug!("zkp::verify: challenge mismatch");
    }

    trace!("zkp::verify: <<< valid: {:?}", valid);

    Ok(valid)
}

fn _check_shape(relation: &Relation) -> ClCryptoResult<()> {
    for statement in relation.statements.iter() {
        if let Some(&(_, idx)) = statement.terms.iter().find(|&&(_, idx)| idx >= relation.secrets.len()) {
            return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                               format!("Statement references unknown secret {}", idx)));
        }
    }
    Ok(())
}

fn _multi_exp(statement: &Statement, exponents: &[BigNumber], ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    let mut res = BigNumber::from_u32(1)?;
    for &(base, idx) in statement.terms.iter() {
        let pow = statement.group.exp(base, &exponents[idx], ctx)?;
        res = statement.group.mul(&res, &pow, ctx)?;
    }
    Ok(res)
}

fn _challenge(relation: &Relation, t_values: &[BigNumber], nonce: &BigNumber) -> ClCryptoResult<BigNumber> {
    let mut values: Vec<Vec<u8>> = Vec::new();

    for (statement, t) in relation.statements.iter().zip(t_values.iter()) {
        for &(base, _) in statement.terms.iter() {
            values.push(base.to_bytes()?);
        }
        values.push(statement.value.to_bytes()?);
        values.push(t.to_bytes()?);
    }
    values.push(nonce.to_bytes()?);

    get_hash_as_int(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::qr::QrSpecialRsa;
    use crate::groups::schnorr::SchnorrGroup;
    use crate::utils::random::OpenSslRandom;

    const PARAMS: ProofParams = ProofParams { hash_bit_len: 256, sec_param: 80 };

    fn _group() -> SchnorrGroup {
        SchnorrGroup::new(160).unwrap()
    }

    #[test]
    fn representation_proof_works() {
        let group = _group();
        let h = group.random_element(&OpenSslRandom).unwrap();
        let x = group.random_exponent(&OpenSslRandom).unwrap();
        let r = group.random_exponent(&OpenSslRandom).unwrap();
        let y = group.mul(&group.exp(&group.g, &x).unwrap(), &group.exp(&h, &r).unwrap()).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let relation = Relation {
            secrets: vec![SecretSpec::integer(160), SecretSpec::integer(160)],
            statements: vec![Statement { group: &group, value: y, terms: vec![(&group.g, 0), (&h, 1)] }]
        };

        let proof = prove(&relation, &[&x, &r], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        assert!(verify(&relation, &proof, &nonce, &PARAMS).unwrap());

        let other_nonce = BigNumber::rand(80).unwrap();
        assert!(!verify(&relation, &proof, &other_nonce, &PARAMS).unwrap());
    }

    #[test]
    fn equality_across_groups_works() {
        let group = _group();
        let mut ctx = BigNumber::new_context().unwrap();
        let (n, _, _) = crate::utils::rsa::generate_special_rsa_modulus(256, &mut ctx).unwrap();
        let qr = QrSpecialRsa::new(n);
        let base = BigNumber::from_u32(4).unwrap();

        let x = group.random_exponent(&OpenSslRandom).unwrap();
        let y1 = group.exp(&group.g, &x).unwrap();
        let y2 = qr.exp(&base, &x, &mut ctx).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let relation = Relation {
            secrets: vec![SecretSpec::integer(160)],
            statements: vec![
                Statement { group: &group, value: y1, terms: vec![(&group.g, 0)] },
                Statement { group: &qr, value: y2, terms: vec![(&base, 0)] }
            ]
        };

        let proof = prove(&relation, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        assert!(verify(&relation, &proof, &nonce, &PARAMS).unwrap());

        // a different secret in the second group breaks equality
        let x2 = group.random_exponent(&OpenSslRandom).unwrap();
        let broken = Relation {
            secrets: vec![SecretSpec::integer(160)],
            statements: vec![
                Statement { group: &group, value: group.exp(&group.g, &x).unwrap(), terms: vec![(&group.g, 0)] },
                Statement { group: &qr, value: qr.exp(&base, &x2, &mut ctx).unwrap(), terms: vec![(&base, 0)] }
            ]
        };
        let proof = prove(&broken, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        assert!(!verify(&broken, &proof, &nonce, &PARAMS).unwrap());
    }

    #[test]
    fn modular_proof_works() {
        let group = _group();
        let x = group.random_exponent(&OpenSslRandom).unwrap();
        let y = group.exp(&group.g, &x).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let prover_relation = Relation {
            secrets: vec![SecretSpec::modular(160, Some(&group.q))],
            statements: vec![Statement { group: &group, value: y.clone().unwrap(), terms: vec![(&group.g, 0)] }]
        };
        let verifier_relation = Relation {
            secrets: vec![SecretSpec::modular(160, None)],
            statements: vec![Statement { group: &group, value: y, terms: vec![(&group.g, 0)] }]
        };

        let proof = prove(&prover_relation, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        assert!(proof.responses[0] < group.q);
        assert!(verify(&verifier_relation, &proof, &nonce, &PARAMS).unwrap());
    }

    #[test]
    fn negative_witness_works() {
        let group = _group();
        let mut x = BigNumber::rand(100).unwrap();
        x.set_negative(true).unwrap();
        let y = group.exp(&group.g, &x).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let relation = Relation {
            secrets: vec![SecretSpec::integer(100)],
            statements: vec![Statement { group: &group, value: y, terms: vec![(&group.g, 0)] }]
        };

        let proof = prove(&relation, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        assert!(verify(&relation, &proof, &nonce, &PARAMS).unwrap());
    }

    #[test]
    fn tampered_response_is_rejected() {
        let group = _group();
        let x = group.random_exponent(&OpenSslRandom).unwrap();
        let y = group.exp(&group.g, &x).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let relation = Relation {
            secrets: vec![SecretSpec::integer(160)],
            statements: vec![Statement { group: &group, value: y, terms: vec![(&group.g, 0)] }]
        };

        let mut proof = prove(&relation, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        proof.responses[0].add_word(1).unwrap();
        assert!(!verify(&relation, &proof, &nonce, &PARAMS).unwrap());

        // oversized responses are rejected before any exponentiation
        let mut oversized = BigNumber::rand(1000).unwrap();
        oversized.set_bit(999).unwrap();
        proof.responses[0] = oversized;
        assert!(!verify(&relation, &proof, &nonce, &PARAMS).unwrap());
    }

    #[test]
    fn response_count_mismatch_is_malformed() {
        let group = _group();
        let x = group.random_exponent(&OpenSslRandom).unwrap();
        let y = group.exp(&group.g, &x).unwrap();
        let nonce = BigNumber::rand(80).unwrap();

        let relation = Relation {
            secrets: vec![SecretSpec::integer(160)],
            statements: vec![Statement { group: &group, value: y, terms: vec![(&group.g, 0)] }]
        };

        let mut proof = prove(&relation, &[&x], &nonce, &PARAMS, &OpenSslRandom).unwrap();
        proof.responses.push(BigNumber::from_u32(1).unwrap());

        let err = verify(&relation, &proof, &nonce, &PARAMS).unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidStructure, err.kind());
    }

    #[test]
    fn unknown_secret_index_is_malformed() {
        let group = _group();
        let relation = Relation {
            secrets: vec![SecretSpec::integer(160)],
            statements: vec![Statement { group: &group, value: BigNumber::from_u32(1).unwrap(), terms: vec![(&group.g, 1)] }]
        };
        let x = BigNumber::from_u32(1).unwrap();

        let err = prove(&relation, &[&x], &BigNumber::from_u32(1).unwrap(), &PARAMS, &OpenSslRandom).unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidStructure, err.kind());
    }
}
