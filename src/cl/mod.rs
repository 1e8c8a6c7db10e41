mod constants;
mod helpers;
pub mod manager;
pub mod nonce;
pub mod org;
mod proofs;
pub mod records;

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::groups::qr::QrSpecialRsa;
use crate::groups::schnorr::SchnorrGroup;
use crate::utils::clone_bignum_vec;
use crate::utils::json::{JsonDecodable, JsonEncodable};
use crate::utils::random::RandomSource;
use crate::zkp::{ProofParams, SigmaProof};

pub use self::constants::LARGE_NONCE;

/// Single use session value issued by an `Organization`.
pub type Nonce = BigNumber;

/// Issuer's proof that `A = Q^(e^-1 mod p'q')`, bound to the request nonce.
pub type AProof = SigmaProof;

/// Scheme lengths and attribute capacities.
///
/// # Example
/// ```
/// use cl_crypto::cl::ClParams;
/// use cl_crypto::utils::json::JsonDecodable;
///
/// let params = ClParams::from_json(r#"{"rho_bit_len":160,"n_length":256,"known_attrs_num":4,
///     "committed_attrs_num":2,"hidden_attrs_num":3,"attr_bit_len":256,"hash_bit_len":256,
///     "sec_param":80,"e_bit_len":597,"e1_bit_len":120,"v_bit_len":2724,"max_pending_nonces":16}"#).unwrap();
/// params.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClParams {
    /// Bit length of the Schnorr group order.
    pub rho_bit_len: usize,
    /// Bit length of the special RSA modulus.
    pub n_length: usize,
    pub known_attrs_num: usize,
    pub committed_attrs_num: usize,
    pub hidden_attrs_num: usize,
    pub attr_bit_len: usize,
    pub hash_bit_len: usize,
    pub sec_param: usize,
    pub e_bit_len: usize,
    /// `e` is drawn from `[2^(e_bit_len - 1), 2^(e_bit_len - 1) + 2^(e1_bit_len - 1)]`.
    pub e1_bit_len: usize,
    pub v_bit_len: usize,
    /// Outstanding nonces kept per registry before the oldest is dropped.
    pub max_pending_nonces: usize
}

impl Default for ClParams {
    fn default() -> ClParams {
        ClParams {
            rho_bit_len: 256,
            n_length: 256,
            known_attrs_num: 4,
            committed_attrs_num: 2,
            hidden_attrs_num: 3,
            attr_bit_len: 256,
            hash_bit_len: 256,
            sec_param: 80,
            e_bit_len: 597,
            e1_bit_len: 120,
            v_bit_len: 2724,
            max_pending_nonces: 1024
        }
    }
}

impl ClParams {
    pub fn validate(&self) -> ClCryptoResult<()> {
        trace!("ClParams::validate: >>> params: {:?}", self);

        match self.rho_bit_len {
            160 | 224 | 256 => {}
            _ => return Err(err_msg(ClCryptoErrorKind::InvalidParam(1),
                                    format!("rho_bit_len must be 160, 224 or 256, found {}", self.rho_bit_len)))
        }

        if self.n_length == 0 || self.n_length % 2 != 0 {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(2),
                               format!("n_length must be a positive even number, found {}", self.n_length)));
        }

        if self.attr_bit_len == 0 || self.sec_param == 0 || self.e1_bit_len == 0 || self.max_pending_nonces == 0 {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(6), "Lengths and nonce window must be positive"));
        }

        if self.hash_bit_len < constants::CHALLENGE_BIT_LEN {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(7),
                               format!("hash_bit_len must cover the {} bit challenge", constants::CHALLENGE_BIT_LEN)));
        }

        if self.e_bit_len <= self.attr_bit_len + 2 {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(9), "e_bit_len must exceed attr_bit_len + 2"));
        }

        if self.e1_bit_len >= self.e_bit_len {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(10), "e1_bit_len must be below e_bit_len"));
        }

        if self.v_bit_len <= self.n_length + self.sec_param {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(11), "v_bit_len must exceed n_length + sec_param"));
        }

        trace!("ClParams::validate: <<<");

        Ok(())
    }

    pub fn proof_params(&self) -> ProofParams {
        ProofParams {
            hash_bit_len: self.hash_bit_len,
            sec_param: self.sec_param
        }
    }

    /// Bit length of `V1` and of the presentation randomizer `r_A`.
    pub fn blinding_bit_len(&self) -> usize {
        self.n_length + self.sec_param
    }
}

impl JsonEncodable for ClParams {}

impl<'a> JsonDecodable<'a> for ClParams {}

/// Organization public key.
///
/// `z`, `r_0` and every `r_*` base are powers of `s` in `QR_n`. `nym_group` and `nym_h` are
/// the Pedersen parameters for pseudonyms and attribute commitments.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrgPubKey {
    pub n: BigNumber,
    pub s: BigNumber,
    pub z: BigNumber,
    pub r_0: BigNumber,
    pub r_known: Vec<BigNumber>,
    pub r_committed: Vec<BigNumber>,
    pub r_hidden: Vec<BigNumber>,
    pub nym_group: SchnorrGroup,
    pub nym_h: BigNumber
}

impl OrgPubKey {
    /// Random integer in `[0, q)` of the pseudonym group.
    pub fn generate_user_master_secret(&self, rng: &dyn RandomSource) -> ClCryptoResult<MasterSecret> {
        Ok(MasterSecret {
            ms: self.nym_group.random_exponent(rng)?
        })
    }

    pub fn qr_group(&self) -> ClCryptoResult<QrSpecialRsa> {
        Ok(QrSpecialRsa::new(self.n.clone()?))
    }

    pub fn clone(&self) -> ClCryptoResult<OrgPubKey> {
        Ok(OrgPubKey {
            n: self.n.clone()?,
            s: self.s.clone()?,
            z: self.z.clone()?,
            r_0: self.r_0.clone()?,
            r_known: clone_bignum_vec(&self.r_known)?,
            r_committed: clone_bignum_vec(&self.r_committed)?,
            r_hidden: clone_bignum_vec(&self.r_hidden)?,
            nym_group: self.nym_group.clone()?,
            nym_h: self.nym_h.clone()?
        })
    }
}

impl JsonEncodable for OrgPubKey {}

impl<'a> JsonDecodable<'a> for OrgPubKey {}

/// `n = (2p' + 1)(2q' + 1)`.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrgSecKey {
    pub p_prime: BigNumber,
    pub q_prime: BigNumber
}

impl OrgSecKey {
    /// Order of `QR_n`.
    pub fn order(&self) -> ClCryptoResult<BigNumber> {
        self.p_prime.mul(&self.q_prime, None)
    }

    pub fn clone(&self) -> ClCryptoResult<OrgSecKey> {
        Ok(OrgSecKey {
            p_prime: self.p_prime.clone()?,
            q_prime: self.q_prime.clone()?
        })
    }
}

impl JsonEncodable for OrgSecKey {}

impl<'a> JsonDecodable<'a> for OrgSecKey {}

/// Secret key of the user. Never leaves the `CredentialManager`.
#[derive(Debug, Deserialize, Serialize)]
pub struct MasterSecret {
    ms: BigNumber
}

impl MasterSecret {
    pub fn value(&self) -> ClCryptoResult<BigNumber> {
        self.ms.clone()
    }

    pub fn clone(&self) -> ClCryptoResult<MasterSecret> {
        Ok(MasterSecret { ms: self.ms.clone()? })
    }
}

impl JsonEncodable for MasterSecret {}

impl<'a> JsonDecodable<'a> for MasterSecret {}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CredentialRequest {
    pub nym: BigNumber,
    pub u: BigNumber,
    pub commitments_of_attrs: Vec<BigNumber>,
    pub known_attrs: Vec<BigNumber>,
    pub hidden_attrs_count: usize,
    pub proof: SigmaProof,
    pub nonce: Nonce
}

impl CredentialRequest {
    pub fn clone(&self) -> ClCryptoResult<CredentialRequest> {
        Ok(CredentialRequest {
            nym: self.nym.clone()?,
            u: self.u.clone()?,
            commitments_of_attrs: clone_bignum_vec(&self.commitments_of_attrs)?,
            known_attrs: clone_bignum_vec(&self.known_attrs)?,
            hidden_attrs_count: self.hidden_attrs_count,
            proof: self.proof.clone()?,
            nonce: self.nonce.clone()?
        })
    }
}

impl JsonEncodable for CredentialRequest {}

impl<'a> JsonDecodable<'a> for CredentialRequest {}

/// `A^e * S^(V1 + v11) * R_0^ms * Π R^m = Z (mod n)`.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credential {
    pub a: BigNumber,
    pub e: BigNumber,
    pub v11: BigNumber
}

impl Credential {
    pub fn clone(&self) -> ClCryptoResult<Credential> {
        Ok(Credential {
            a: self.a.clone()?,
            e: self.e.clone()?,
            v11: self.v11.clone()?
        })
    }
}

impl JsonEncodable for Credential {}

impl<'a> JsonDecodable<'a> for Credential {}

/// `A' = A * S^r_A` for a fresh `r_A`.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RandomizedCredential {
    pub a_prime: BigNumber
}

impl JsonEncodable for RandomizedCredential {}

impl<'a> JsonDecodable<'a> for RandomizedCredential {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttrCounts {
    pub known: usize,
    pub committed: usize,
    pub hidden: usize
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PresentationProof {
    pub sigma: SigmaProof,
    pub attr_counts: AttrCounts,
    pub nonce: Nonce
}

impl PresentationProof {
    pub fn clone(&self) -> ClCryptoResult<PresentationProof> {
        Ok(PresentationProof {
            sigma: self.sigma.clone()?,
            attr_counts: self.attr_counts,
            nonce: self.nonce.clone()?
        })
    }
}

impl JsonEncodable for PresentationProof {}

impl<'a> JsonDecodable<'a> for PresentationProof {}
