use super::helpers::*;
use super::nonce::NonceRegistry;
use super::proofs::{a_proof_relation, presentation_relation, request_relation};
use super::records::{MemoryReceiverRecordStore, ReceiverRecord, ReceiverRecordStore};
use super::*;

use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;
use crate::groups::params::{DsaParamsGenerator, GroupParamsGenerator};
use crate::groups::qr::QrSpecialRsa;
use crate::groups::schnorr::SchnorrGroup;
use crate::groups::ProofGroup;
use crate::utils::clone_bignum_vec;
use crate::utils::commitment::get_pedersen_commitment;
use crate::utils::random::RandomSource;
use crate::utils::rsa::generate_special_rsa_modulus;
use crate::zkp;

use std::sync::{Arc, Mutex, MutexGuard};

/// Key material of a verification only organization.
pub struct PublicOnly;

/// Key material of an organization able to issue and update credentials.
pub struct IssuerCapable {
    sec_key: OrgSecKey,
    records: Arc<dyn ReceiverRecordStore>,
    /// Held across every read-modify-write of `records` by this instance.
    records_lock: Mutex<()>,
    issue_nonces: NonceRegistry
}

/// Credential issuer and verifier.
///
/// Issuance operations exist on `Organization<IssuerCapable>` only. Any organization hands
/// out presentation nonces and verifies presentations.
pub struct Organization<K> {
    params: ClParams,
    pub_key: OrgPubKey,
    qr: QrSpecialRsa,
    rng: Arc<dyn RandomSource>,
    prove_nonces: NonceRegistry,
    keys: K
}

impl Organization<IssuerCapable> {
    /// Generates fresh keys with the default group parameter generator.
    pub fn new(params: &ClParams, rng: Arc<dyn RandomSource>) -> ClCryptoResult<Organization<IssuerCapable>> {
        let generator = DsaParamsGenerator::new(rng.clone());
        Self::new_with_generator(params, &generator, rng)
    }

    pub fn new_with_generator(params: &ClParams,
                              generator: &dyn GroupParamsGenerator,
                              rng: Arc<dyn RandomSource>) -> ClCryptoResult<Organization<IssuerCapable>> {
        trace!("Organization::new_with_generator: >>> params: {:?}", params);

        params.validate()?;

        let (pub_key, sec_key) = Self::_new_keys(params, generator, rng.as_ref())?;
        let org = Self::from_keys(params, &pub_key, &sec_key,
                                  Arc::new(MemoryReceiverRecordStore::new()), rng)?;

        trace!("Organization::new_with_generator: <<< pub_key: {:?}", org.pub_key);

        Ok(org)
    }

    /// Rebuilds an issuer from persisted keys. `records` may be shared with other instances.
    pub fn from_keys(params: &ClParams,
                     pub_key: &OrgPubKey,
                     sec_key: &OrgSecKey,
                     records: Arc<dyn ReceiverRecordStore>,
                     rng: Arc<dyn RandomSource>) -> ClCryptoResult<Organization<IssuerCapable>> {
        params.validate()?;
        Self::_check_pub_key(params, pub_key)?;

        let keys = IssuerCapable {
            sec_key: sec_key.clone()?,
            records,
            records_lock: Mutex::new(()),
            issue_nonces: NonceRegistry::new(rng.clone(), params.max_pending_nonces)
        };

        Self::_with_keys(params, pub_key, keys, rng)
    }

    pub fn sec_key(&self) -> &OrgSecKey {
        &self.keys.sec_key
    }

    pub fn records(&self) -> Arc<dyn ReceiverRecordStore> {
        self.keys.records.clone()
    }

    pub fn get_credential_issue_nonce(&self) -> ClCryptoResult<Nonce> {
        self.keys.issue_nonces.issue()
    }

    /// Verifies the request and signs it.
    ///
    /// The request nonce is consumed before anything else is checked. The pseudonym is
    /// recorded only once signing succeeded.
    pub fn issue_credential(&self, request: &CredentialRequest) -> ClCryptoResult<(Credential, AProof)> {
        trace!("Organization::issue_credential: >>> request: {:?}", request);

        self.keys.issue_nonces.consume(&request.nonce)?;

        check_capacity(request.known_attrs.len(), self.params.known_attrs_num, "known")?;
        check_capacity(request.commitments_of_attrs.len(), self.params.committed_attrs_num, "committed")?;
        check_capacity(request.hidden_attrs_count, self.params.hidden_attrs_num, "hidden")?;

        let nym_group = &self.pub_key.nym_group;
        if !nym_group.is_element_in_group(&request.nym)? {
            return Err(err_msg(ClCryptoErrorKind::Membership, "Pseudonym is not in the pseudonym group"));
        }
        for (j, commitment) in request.commitments_of_attrs.iter().enumerate() {
            if !nym_group.is_element_in_group(commitment)? {
                return Err(err_msg(ClCryptoErrorKind::Membership,
                                   format!("Commitment of attribute {} is not in the pseudonym group", j)));
            }
        }
        if !self.qr.is_in_range(&request.u)? {
            return Err(err_msg(ClCryptoErrorKind::Membership, "U is not in Z_n"));
        }

        let relation = request_relation(&self.params, &self.pub_key, &self.qr, &request.nym, &request.u,
                                        &request.commitments_of_attrs, request.hidden_attrs_count)?;
        if !zkp::verify(&relation, &request.proof, &request.nonce, &self.params.proof_params())? {
            return Err(err_msg(ClCryptoErrorKind::ProofRejected, "Credential request proof is not valid"));
        }

        let res = self._sign(&request.u, &request.known_attrs, &request.nonce)?;

        let _guard = self._lock_records()?;
        self.keys.records.store(&request.nym, ReceiverRecord {
            u: request.u.clone()?,
            commitments_of_attrs: clone_bignum_vec(&request.commitments_of_attrs)?,
            known_attrs: clone_bignum_vec(&request.known_attrs)?,
            nonce: request.nonce.clone()?
        })?;

        trace!("Organization::issue_credential: <<< credential: {:?}, a_proof: {:?}", res.0, res.1);

        Ok(res)
    }

    /// Re-signs the `U` stored for `nym` over `new_known_attrs`.
    ///
    /// `nonce` must be the nonce of the request the pseudonym was issued for.
    pub fn update_credential(&self, nym: &BigNumber, nonce: &Nonce,
                             new_known_attrs: &[BigNumber]) -> ClCryptoResult<(Credential, AProof)> {
        trace!("Organization::update_credential: >>> nym: {:?}, nonce: {:?}, new_known_attrs: {:?}", nym, nonce, new_known_attrs);

        check_capacity(new_known_attrs.len(), self.params.known_attrs_num, "known")?;

        let _guard = self._lock_records()?;
        let mut record = self.keys.records.load(nym)?
            .ok_or_else(|| err_msg(ClCryptoErrorKind::UnboundNym, "No credential was issued for this pseudonym"))?;

        if record.nonce != *nonce {
            return Err(err_msg(ClCryptoErrorKind::UnboundNym, "Pseudonym is not bound to this nonce"));
        }

        let res = self._sign(&record.u, new_known_attrs, nonce)?;

        record.known_attrs = clone_bignum_vec(new_known_attrs)?;
        self.keys.records.store(nym, record)?;

        trace!("Organization::update_credential: <<< credential: {:?}, a_proof: {:?}", res.0, res.1);

        Ok(res)
    }

    fn _lock_records(&self) -> ClCryptoResult<MutexGuard<'_, ()>> {
        self.keys.records_lock.lock()
            .map_err(|_| err_msg(ClCryptoErrorKind::InvalidState, "Receiver record lock is poisoned"))
    }

    fn _new_keys(params: &ClParams,
                 generator: &dyn GroupParamsGenerator,
                 rng: &dyn RandomSource) -> ClCryptoResult<(OrgPubKey, OrgSecKey)> {
        trace!("Organization::_new_keys: >>> params: {:?}", params);

        let nym_group = SchnorrGroup::new_with_generator(params.rho_bit_len, generator)?;
        let nym_h = nym_group.random_element(rng)?;
        if nym_h == BigNumber::from_u32(1)? {
            return Err(err_msg(ClCryptoErrorKind::GroupGenerationFailure, "Second generator is the identity"));
        }

        let mut ctx = BigNumber::new_context()?;

        let (n, p_prime, q_prime) = generate_special_rsa_modulus(params.n_length, &mut ctx)?;
        let s = random_qr(&n, rng, &mut ctx)?;

        let gen_base = |ctx: &mut BigNumberContext| -> ClCryptoResult<BigNumber> {
            s.mod_exp(&gen_x(&p_prime, &q_prime, rng, ctx)?, &n, Some(&mut *ctx))
        };

        let z = gen_base(&mut ctx)?;
        let r_0 = gen_base(&mut ctx)?;

        let mut r_known = Vec::with_capacity(params.known_attrs_num);
        for _ in 0..params.known_attrs_num {
            r_known.push(gen_base(&mut ctx)?);
        }
        let mut r_committed = Vec::with_capacity(params.committed_attrs_num);
        for _ in 0..params.committed_attrs_num {
            r_committed.push(gen_base(&mut ctx)?);
        }
        let mut r_hidden = Vec::with_capacity(params.hidden_attrs_num);
        for _ in 0..params.hidden_attrs_num {
            r_hidden.push(gen_base(&mut ctx)?);
        }

        let pub_key = OrgPubKey { n, s, z, r_0, r_known, r_committed, r_hidden, nym_group, nym_h };
        let sec_key = OrgSecKey { p_prime, q_prime };

        trace!("Organization::_new_keys: <<< pub_key: {:?}", pub_key);

        Ok((pub_key, sec_key))
    }

    /// `A = (Z / (S^v11 * U * Π R_k^m))^(e^-1 mod p'q')` and the proof of it.
    fn _sign(&self, u: &BigNumber, known_attrs: &[BigNumber], nonce: &Nonce) -> ClCryptoResult<(Credential, AProof)> {
        trace!("Organization::_sign: >>> u: {:?}, known_attrs: {:?}, nonce: {:?}", u, known_attrs, nonce);

        let mut ctx = BigNumber::new_context()?;

        let (e_start, e_end) = e_range(&self.params)?;
        let e = generate_prime_in_range(&e_start, &e_end, self.rng.as_ref(), &mut ctx)?;
        let v11 = generate_v_prime_prime(&self.params, self.rng.as_ref())?;

        let q = issuance_q(&self.pub_key, &self.qr, u, &v11, known_attrs, &mut ctx)?;

        let order = self.keys.sec_key.order()?;
        let e_inverse = e.inverse(&order, Some(&mut ctx))?;
        let a = q.mod_exp(&e_inverse, &self.pub_key.n, Some(&mut ctx))?;

        let relation = a_proof_relation(&self.params, &self.qr, &q, &a, Some(&order))?;
        let a_proof = zkp::prove(&relation, &[&e_inverse], nonce, &self.params.proof_params(), self.rng.as_ref())?;

        trace!("Organization::_sign: <<< a: {:?}, e: {:?}", a, e);

        Ok((Credential { a, e, v11 }, a_proof))
    }
}

impl Organization<PublicOnly> {
    /// Verification only organization.
    pub fn from_public_key(params: &ClParams,
                           pub_key: &OrgPubKey,
                           rng: Arc<dyn RandomSource>) -> ClCryptoResult<Organization<PublicOnly>> {
        params.validate()?;
        Self::_check_pub_key(params, pub_key)?;
        Self::_with_keys(params, pub_key, PublicOnly, rng)
    }
}

impl<K> Organization<K> {
    fn _with_keys(params: &ClParams, pub_key: &OrgPubKey, keys: K,
                  rng: Arc<dyn RandomSource>) -> ClCryptoResult<Organization<K>> {
        Ok(Organization {
            params: params.clone(),
            pub_key: pub_key.clone()?,
            qr: pub_key.qr_group()?,
            prove_nonces: NonceRegistry::new(rng.clone(), params.max_pending_nonces),
            rng,
            keys
        })
    }

    fn _check_pub_key(params: &ClParams, pub_key: &OrgPubKey) -> ClCryptoResult<()> {
        if pub_key.r_known.len() != params.known_attrs_num
            || pub_key.r_committed.len() != params.committed_attrs_num
            || pub_key.r_hidden.len() != params.hidden_attrs_num {
            return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                               "Public key bases do not match the attribute capacities"));
        }
        Ok(())
    }

    pub fn params(&self) -> &ClParams {
        &self.params
    }

    pub fn pub_key(&self) -> &OrgPubKey {
        &self.pub_key
    }

    pub fn get_prove_credential_nonce(&self) -> ClCryptoResult<Nonce> {
        self.prove_nonces.issue()
    }

    /// Verifies a presentation against the revealed attribute values.
    ///
    /// Malformed input (unknown nonce, bad indices, too many attributes) is an error; a proof
    /// that does not verify is `Ok(false)`.
    pub fn prove_credential(&self,
                            randomized: &RandomizedCredential,
                            proof: &PresentationProof,
                            revealed_known_idx: &[usize],
                            revealed_committed_idx: &[usize],
                            revealed_known_vals: &[BigNumber],
                            revealed_committed_vals: &[BigNumber]) -> ClCryptoResult<bool> {
        trace!("Organization::prove_credential: >>> randomized: {:?}, proof: {:?}, revealed_known_idx: {:?}, revealed_committed_idx: {:?}, \
        revealed_known_vals: {:?}, revealed_committed_vals: {:?}", randomized, proof, revealed_known_idx, revealed_committed_idx,
               revealed_known_vals, revealed_committed_vals);

        self.prove_nonces.consume(&proof.nonce)?;

        let counts = &proof.attr_counts;
        check_capacity(counts.known, self.params.known_attrs_num, "known")?;
        check_capacity(counts.committed, self.params.committed_attrs_num, "committed")?;
        check_capacity(counts.hidden, self.params.hidden_attrs_num, "hidden")?;

        check_reveal_indices(revealed_known_idx, counts.known, "known")?;
        check_reveal_indices(revealed_committed_idx, counts.committed, "committed")?;

        if revealed_known_idx.len() != revealed_known_vals.len()
            || revealed_committed_idx.len() != revealed_committed_vals.len() {
            return Err(err_msg(ClCryptoErrorKind::IndexOutOfRange,
                               "Revealed indices and revealed values differ in length"));
        }

        if !self.qr.is_in_range(&randomized.a_prime)? {
            debug!("Organization::prove_credential: A' is not in Z_n");
            return Ok(false);
        }

        let relation = match presentation_relation(&self.params, &self.pub_key, &self.qr, &randomized.a_prime, counts,
                                                   revealed_known_idx, revealed_committed_idx,
                                                   revealed_known_vals, revealed_committed_vals) {
            Ok(relation) => relation,
            Err(ref err) if err.kind() == ClCryptoErrorKind::Membership => {
                debug!("Organization::prove_credential: A' is not invertible modulo n");
                return Ok(false);
            }
            Err(err) => return Err(err)
        };

        let valid = match zkp::verify(&relation, &proof.sigma, &proof.nonce, &self.params.proof_params()) {
            Ok(valid) => valid,
            Err(ref err) if err.kind() == ClCryptoErrorKind::Membership => false,
            Err(err) => return Err(err)
        };

        if !valid {
            debug!("Organization::prove_credential: presentation proof does not verify");
        }

        trace!("Organization::prove_credential: <<< valid: {:?}", valid);

        Ok(valid)
    }

    /// Checks `commitment = g^value * h^blinding (mod P)` in the pseudonym group.
    pub fn verify_commitment_opening(&self, commitment: &BigNumber, value: &BigNumber,
                                     blinding: &BigNumber) -> ClCryptoResult<bool> {
        trace!("Organization::verify_commitment_opening: >>> commitment: {:?}", commitment);

        let group = &self.pub_key.nym_group;
        if !group.is_element_in_group(commitment)? {
            return Err(err_msg(ClCryptoErrorKind::Membership, "Commitment is not in the pseudonym group"));
        }

        let mut ctx = BigNumber::new_context()?;
        let expected = get_pedersen_commitment(&group.g, value, &self.pub_key.nym_h, blinding, &group.p, &mut ctx)?;
        let valid = expected == *commitment;

        trace!("Organization::verify_commitment_opening: <<< valid: {:?}", valid);

        Ok(valid)
    }
}

/// `Q = Z / (S^v11 * U * Π R_k^m) (mod n)`.
pub(super) fn issuance_q(pub_key: &OrgPubKey, qr: &QrSpecialRsa, u: &BigNumber, v11: &BigNumber,
                         known_attrs: &[BigNumber], ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    let mut denominator = qr.mul(&qr.exp(&pub_key.s, v11, ctx)?, u, ctx)?;

    for (i, m) in known_attrs.iter().enumerate() {
        let r = pub_key.r_known.get(i)
            .ok_or_else(|| err_msg(ClCryptoErrorKind::CapacityExceeded, format!("No public base for known attribute {}", i)))?;
        denominator = qr.mul(&denominator, &qr.exp(r, m, ctx)?, ctx)?;
    }

    pub_key.z.mod_div(&denominator, &pub_key.n, Some(&mut *ctx))
}
