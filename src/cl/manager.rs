use super::constants::E_PRIMALITY_CHECKS;
use super::helpers::*;
use super::org::issuance_q;
use super::proofs::{a_proof_relation, presentation_relation, request_relation};
use super::*;

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::groups::qr::QrSpecialRsa;
use crate::utils::clone_bignum_vec;
use crate::utils::commitment::get_pedersen_commitment;
use crate::utils::random::RandomSource;
use crate::zkp;

use std::sync::Arc;

/// User side state of one credential relationship with an organization.
pub struct CredentialManager {
    params: ClParams,
    pub_key: OrgPubKey,
    qr: QrSpecialRsa,
    rng: Arc<dyn RandomSource>,
    master_secret: MasterSecret,
    nym: BigNumber,
    /// Absent on managers rebuilt from persisted state.
    nym_blinding: Option<BigNumber>,
    v1: BigNumber,
    u: BigNumber,
    known_attrs: Vec<BigNumber>,
    committed_attrs: Vec<BigNumber>,
    hidden_attrs: Vec<BigNumber>,
    commitments_of_attrs: Vec<BigNumber>,
    commitment_blindings: Option<Vec<BigNumber>>,
    cred_req_nonce: Option<Nonce>,
    credential: Option<Credential>
}

impl CredentialManager {
    /// Draws the pseudonym, `V1` and the commitment blindings.
    pub fn new(params: &ClParams,
               pub_key: &OrgPubKey,
               master_secret: &MasterSecret,
               known_attrs: &[BigNumber],
               committed_attrs: &[BigNumber],
               hidden_attrs: &[BigNumber],
               rng: Arc<dyn RandomSource>) -> ClCryptoResult<CredentialManager> {
        trace!("CredentialManager::new: >>> params: {:?}, known_attrs: {:?}, committed_attrs: {:?}, hidden_attrs_count: {}",
               params, known_attrs, committed_attrs, hidden_attrs.len());

        params.validate()?;
        CredentialManager::_check_attrs(params, known_attrs, committed_attrs, hidden_attrs)?;

        let mut ctx = BigNumber::new_context()?;
        let group = &pub_key.nym_group;
        let ms = master_secret.value()?;

        let nym_blinding = group.random_exponent(rng.as_ref())?;
        let nym = get_pedersen_commitment(&group.g, &ms, &pub_key.nym_h, &nym_blinding, &group.p, &mut ctx)?;

        let v1 = rng.rand_bits(params.blinding_bit_len())?;

        let mut commitments_of_attrs = Vec::with_capacity(committed_attrs.len());
        let mut commitment_blindings = Vec::with_capacity(committed_attrs.len());
        for m in committed_attrs {
            let r = group.random_exponent(rng.as_ref())?;
            commitments_of_attrs.push(get_pedersen_commitment(&group.g, m, &pub_key.nym_h, &r, &group.p, &mut ctx)?);
            commitment_blindings.push(r);
        }

        let manager = CredentialManager::_build(params, pub_key, master_secret, nym, Some(nym_blinding), v1,
                                                known_attrs, committed_attrs, hidden_attrs,
                                                commitments_of_attrs, Some(commitment_blindings), None, rng)?;

        trace!("CredentialManager::new: <<< nym: {:?}", manager.nym);

        Ok(manager)
    }

    /// Rebuilds the state of an issued relationship for updates and presentations.
    ///
    /// `nym`, `v1`, `req_nonce` and the commitments must be the ones used at issuance.
    pub fn from_existing(nym: &BigNumber,
                         v1: &BigNumber,
                         req_nonce: &Nonce,
                         params: &ClParams,
                         pub_key: &OrgPubKey,
                         master_secret: &MasterSecret,
                         known_attrs: &[BigNumber],
                         committed_attrs: &[BigNumber],
                         hidden_attrs: &[BigNumber],
                         commitments_of_attrs: &[BigNumber],
                         rng: Arc<dyn RandomSource>) -> ClCryptoResult<CredentialManager> {
        trace!("CredentialManager::from_existing: >>> nym: {:?}, req_nonce: {:?}", nym, req_nonce);

        params.validate()?;
        CredentialManager::_check_attrs(params, known_attrs, committed_attrs, hidden_attrs)?;

        if commitments_of_attrs.len() != committed_attrs.len() {
            return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                               format!("{} commitments given for {} committed attributes",
                                       commitments_of_attrs.len(), committed_attrs.len())));
        }

        let group = &pub_key.nym_group;
        if !group.is_element_in_group(nym)? {
            return Err(err_msg(ClCryptoErrorKind::Membership, "Pseudonym is not in the pseudonym group"));
        }
        for commitment in commitments_of_attrs {
            if !group.is_element_in_group(commitment)? {
                return Err(err_msg(ClCryptoErrorKind::Membership, "Commitment is not in the pseudonym group"));
            }
        }

        let manager = CredentialManager::_build(params, pub_key, master_secret, nym.clone()?, None, v1.clone()?,
                                                known_attrs, committed_attrs, hidden_attrs,
                                                clone_bignum_vec(commitments_of_attrs)?, None,
                                                Some(req_nonce.clone()?), rng)?;

        trace!("CredentialManager::from_existing: <<<");

        Ok(manager)
    }

    pub fn nym(&self) -> &BigNumber {
        &self.nym
    }

    pub fn v1(&self) -> &BigNumber {
        &self.v1
    }

    pub fn commitments_of_attrs(&self) -> &[BigNumber] {
        &self.commitments_of_attrs
    }

    pub fn cred_req_nonce(&self) -> Option<&Nonce> {
        self.cred_req_nonce.as_ref()
    }

    /// `(m_j, r_j)` opening `C_j`.
    pub fn commitment_opening(&self, j: usize) -> ClCryptoResult<(BigNumber, BigNumber)> {
        let blindings = self.commitment_blindings.as_ref()
            .ok_or_else(|| err_msg(ClCryptoErrorKind::InvalidState, "Commitment blindings are not known"))?;

        match (self.committed_attrs.get(j), blindings.get(j)) {
            (Some(m), Some(r)) => Ok((m.clone()?, r.clone()?)),
            _ => Err(err_msg(ClCryptoErrorKind::IndexOutOfRange,
                             format!("Committed attribute index {} is out of range 0..{}", j, self.committed_attrs.len())))
        }
    }

    /// Proves knowledge of `(ms, nym blinding, V1, committed values and blindings, hidden values)`
    /// bound to `nonce`, which is kept for verifying the issued credential.
    pub fn get_credential_request(&mut self, nonce: &Nonce) -> ClCryptoResult<CredentialRequest> {
        trace!("CredentialManager::get_credential_request: >>> nonce: {:?}", nonce);

        let (nym_blinding, commitment_blindings) = match (&self.nym_blinding, &self.commitment_blindings) {
            (Some(nym_blinding), Some(commitment_blindings)) => (nym_blinding, commitment_blindings),
            _ => return Err(err_msg(ClCryptoErrorKind::InvalidState,
                                    "Rebuilt credential manager cannot request a new credential"))
        };

        let group = &self.pub_key.nym_group;
        if !group.is_element_in_group(&self.nym)? {
            return Err(err_msg(ClCryptoErrorKind::Membership, "Pseudonym is not in the pseudonym group"));
        }
        for commitment in self.commitments_of_attrs.iter() {
            if !group.is_element_in_group(commitment)? {
                return Err(err_msg(ClCryptoErrorKind::Membership, "Commitment is not in the pseudonym group"));
            }
        }

        let relation = request_relation(&self.params, &self.pub_key, &self.qr, &self.nym, &self.u,
                                        &self.commitments_of_attrs, self.hidden_attrs.len())?;

        let ms = self.master_secret.value()?;
        let mut witnesses: Vec<&BigNumber> = vec![&ms, nym_blinding, &self.v1];
        witnesses.extend(self.committed_attrs.iter());
        witnesses.extend(commitment_blindings.iter());
        witnesses.extend(self.hidden_attrs.iter());

        let proof = zkp::prove(&relation, &witnesses, nonce, &self.params.proof_params(), self.rng.as_ref())?;

        let request = CredentialRequest {
            nym: self.nym.clone()?,
            u: self.u.clone()?,
            commitments_of_attrs: clone_bignum_vec(&self.commitments_of_attrs)?,
            known_attrs: clone_bignum_vec(&self.known_attrs)?,
            hidden_attrs_count: self.hidden_attrs.len(),
            proof,
            nonce: nonce.clone()?
        };

        self.cred_req_nonce = Some(nonce.clone()?);

        trace!("CredentialManager::get_credential_request: <<< request: {:?}", request);

        Ok(request)
    }

    /// Checks `e`, `A^e = Q` and the issuer's proof, then keeps the credential.
    pub fn verify_credential(&mut self, credential: &Credential, a_proof: &AProof) -> ClCryptoResult<bool> {
        trace!("CredentialManager::verify_credential: >>> credential: {:?}, a_proof: {:?}", credential, a_proof);

        let nonce = self.cred_req_nonce.as_ref()
            .ok_or_else(|| err_msg(ClCryptoErrorKind::InvalidState, "No credential was requested"))?;

        let mut ctx = BigNumber::new_context()?;

        let (e_start, e_end) = e_range(&self.params)?;
        if credential.e < e_start || credential.e > e_end || !credential.e.is_prime_with_checks(E_PRIMALITY_CHECKS, Some(&mut ctx))? {
            debug!("CredentialManager::verify_credential: e is not a prime in the expected range");
            return Ok(false);
        }

        if !self.qr.is_in_range(&credential.a)? {
            debug!("CredentialManager::verify_credential: A is not in Z_n");
            return Ok(false);
        }

        let q = issuance_q(&self.pub_key, &self.qr, &self.u, &credential.v11, &self.known_attrs, &mut ctx)?;
        if credential.a.mod_exp(&credential.e, &self.pub_key.n, Some(&mut ctx))? != q {
            debug!("CredentialManager::verify_credential: A^e does not match Q");
            return Ok(false);
        }

        let relation = a_proof_relation(&self.params, &self.qr, &q, &credential.a, None)?;
        if !zkp::verify(&relation, a_proof, nonce, &self.params.proof_params())? {
            debug!("CredentialManager::verify_credential: AProof does not verify");
            return Ok(false);
        }

        self.credential = Some(credential.clone()?);

        trace!("CredentialManager::verify_credential: <<< valid: true");

        Ok(true)
    }

    /// Replaces the known attributes ahead of an update by the organization.
    pub fn update_credential(&mut self, new_known_attrs: &[BigNumber]) -> ClCryptoResult<()> {
        trace!("CredentialManager::update_credential: >>> new_known_attrs: {:?}", new_known_attrs);

        check_capacity(new_known_attrs.len(), self.params.known_attrs_num, "known")?;
        CredentialManager::_check_attr_lengths(&self.params, new_known_attrs)?;

        self.known_attrs = clone_bignum_vec(new_known_attrs)?;
        self.credential = None;

        trace!("CredentialManager::update_credential: <<<");

        Ok(())
    }

    /// Randomizes the stored credential and proves possession of it, revealing the given
    /// known and committed attributes. Every call draws a fresh `r_A`.
    pub fn build_credential_proof(&self,
                                  credential: &Credential,
                                  revealed_known_idx: &[usize],
                                  revealed_committed_idx: &[usize],
                                  nonce: &Nonce) -> ClCryptoResult<(RandomizedCredential, PresentationProof)> {
        trace!("CredentialManager::build_credential_proof: >>> revealed_known_idx: {:?}, revealed_committed_idx: {:?}, nonce: {:?}",
               revealed_known_idx, revealed_committed_idx, nonce);

        match self.credential {
            Some(ref stored) if stored == credential => {}
            _ => return Err(err_msg(ClCryptoErrorKind::InvalidState, "Credential was not verified by this manager"))
        }

        check_reveal_indices(revealed_known_idx, self.known_attrs.len(), "known")?;
        check_reveal_indices(revealed_committed_idx, self.committed_attrs.len(), "committed")?;

        let mut ctx = BigNumber::new_context()?;

        let r_a = self.rng.rand_bits(self.params.blinding_bit_len())?;
        let a_prime = self.pub_key.s.mod_exp(&r_a, &self.pub_key.n, Some(&mut ctx))?
            .mod_mul(&credential.a, &self.pub_key.n, Some(&mut ctx))?;

        let v = self.v1.add(&credential.v11)?;
        let v_prime = v.sub(&credential.e.mul(&r_a, Some(&mut ctx))?)?;
        let e_prime = credential.e.sub(&two_pow(self.params.e_bit_len - 1)?)?;

        let counts = AttrCounts {
            known: self.known_attrs.len(),
            committed: self.committed_attrs.len(),
            hidden: self.hidden_attrs.len()
        };

        let revealed_known_vals = revealed_known_idx.iter()
            .map(|&i| self.known_attrs[i].clone())
            .collect::<ClCryptoResult<Vec<BigNumber>>>()?;
        let revealed_committed_vals = revealed_committed_idx.iter()
            .map(|&j| self.committed_attrs[j].clone())
            .collect::<ClCryptoResult<Vec<BigNumber>>>()?;

        let relation = presentation_relation(&self.params, &self.pub_key, &self.qr, &a_prime, &counts,
                                             revealed_known_idx, revealed_committed_idx,
                                             &revealed_known_vals, &revealed_committed_vals)?;

        let ms = self.master_secret.value()?;
        let mut witnesses: Vec<&BigNumber> = vec![&e_prime, &v_prime, &ms];
        witnesses.extend(unrevealed_indices(counts.known, revealed_known_idx).into_iter().map(|i| &self.known_attrs[i]));
        witnesses.extend(unrevealed_indices(counts.committed, revealed_committed_idx).into_iter().map(|j| &self.committed_attrs[j]));
        witnesses.extend(self.hidden_attrs.iter());

        let sigma = zkp::prove(&relation, &witnesses, nonce, &self.params.proof_params(), self.rng.as_ref())?;

        let proof = PresentationProof { sigma, attr_counts: counts, nonce: nonce.clone()? };
        let randomized = RandomizedCredential { a_prime: a_prime.clone()? };

        trace!("CredentialManager::build_credential_proof: <<< randomized: {:?}, proof: {:?}", randomized, proof);

        Ok((randomized, proof))
    }

    fn _build(params: &ClParams,
              pub_key: &OrgPubKey,
              master_secret: &MasterSecret,
              nym: BigNumber,
              nym_blinding: Option<BigNumber>,
              v1: BigNumber,
              known_attrs: &[BigNumber],
              committed_attrs: &[BigNumber],
              hidden_attrs: &[BigNumber],
              commitments_of_attrs: Vec<BigNumber>,
              commitment_blindings: Option<Vec<BigNumber>>,
              cred_req_nonce: Option<Nonce>,
              rng: Arc<dyn RandomSource>) -> ClCryptoResult<CredentialManager> {
        let u = CredentialManager::_compute_u(pub_key, &master_secret.value()?, &v1, committed_attrs, hidden_attrs)?;

        Ok(CredentialManager {
            params: params.clone(),
            pub_key: pub_key.clone()?,
            qr: pub_key.qr_group()?,
            rng,
            master_secret: master_secret.clone()?,
            nym,
            nym_blinding,
            v1,
            u,
            known_attrs: clone_bignum_vec(known_attrs)?,
            committed_attrs: clone_bignum_vec(committed_attrs)?,
            hidden_attrs: clone_bignum_vec(hidden_attrs)?,
            commitments_of_attrs,
            commitment_blindings,
            cred_req_nonce,
            credential: None
        })
    }

    /// `U = S^V1 * R_0^ms * Π R_c^m_c * Π R_h^m_h (mod n)`.
    fn _compute_u(pub_key: &OrgPubKey, ms: &BigNumber, v1: &BigNumber,
                  committed_attrs: &[BigNumber], hidden_attrs: &[BigNumber]) -> ClCryptoResult<BigNumber> {
        let mut ctx = BigNumber::new_context()?;
        let n = &pub_key.n;

        let mut u = pub_key.s.mod_exp(v1, n, Some(&mut ctx))?
            .mod_mul(&pub_key.r_0.mod_exp(ms, n, Some(&mut ctx))?, n, Some(&mut ctx))?;

        for (r, m) in pub_key.r_committed.iter().zip(committed_attrs.iter()) {
            u = u.mod_mul(&r.mod_exp(m, n, Some(&mut ctx))?, n, Some(&mut ctx))?;
        }
        for (r, m) in pub_key.r_hidden.iter().zip(hidden_attrs.iter()) {
            u = u.mod_mul(&r.mod_exp(m, n, Some(&mut ctx))?, n, Some(&mut ctx))?;
        }

        Ok(u)
    }

    fn _check_attrs(params: &ClParams, known_attrs: &[BigNumber], committed_attrs: &[BigNumber],
                    hidden_attrs: &[BigNumber]) -> ClCryptoResult<()> {
        check_capacity(known_attrs.len(), params.known_attrs_num, "known")?;
        check_capacity(committed_attrs.len(), params.committed_attrs_num, "committed")?;
        check_capacity(hidden_attrs.len(), params.hidden_attrs_num, "hidden")?;

        CredentialManager::_check_attr_lengths(params, known_attrs)?;
        CredentialManager::_check_attr_lengths(params, committed_attrs)?;
        CredentialManager::_check_attr_lengths(params, hidden_attrs)
    }

    fn _check_attr_lengths(params: &ClParams, attrs: &[BigNumber]) -> ClCryptoResult<()> {
        for attr in attrs {
            if attr.is_negative() || attr.num_bits()? as usize > params.attr_bit_len {
                return Err(err_msg(ClCryptoErrorKind::InvalidStructure,
                                   format!("Attribute must be a non-negative integer of at most {} bits", params.attr_bit_len)));
            }
        }
        Ok(())
    }
}
