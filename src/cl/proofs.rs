//! Relations proven during issuance and presentation.

use super::helpers::{two_pow, unrevealed_indices};
use super::{AttrCounts, ClParams, OrgPubKey};

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::groups::qr::QrSpecialRsa;
use crate::groups::ProofGroup;
use crate::zkp::{Relation, SecretSpec, Statement};

fn _base<'a>(bases: &'a [BigNumber], idx: usize, what: &str) -> ClCryptoResult<&'a BigNumber> {
    bases.get(idx)
        .ok_or_else(|| err_msg(ClCryptoErrorKind::CapacityExceeded,
                               format!("No public base for {} attribute {}", what, idx)))
}

/// Request proof over secrets `[ms, nym blinding, V1, m_c.., r_c.., m_h..]`:
///
/// * `nym = g^ms * h^r (mod P)`
/// * `C_j = g^m_cj * h^r_j (mod P)` for every committed attribute
/// * `U = S^V1 * R_0^ms * Π R_c^m_c * Π R_h^m_h (mod n)`
pub fn request_relation<'a>(params: &ClParams,
                            pub_key: &'a OrgPubKey,
                            qr: &'a QrSpecialRsa,
                            nym: &BigNumber,
                            u: &BigNumber,
                            commitments_of_attrs: &[BigNumber],
                            hidden_attrs_count: usize) -> ClCryptoResult<Relation<'a>> {
    let committed = commitments_of_attrs.len();
    let group = &pub_key.nym_group;

    let mut secrets = vec![
        SecretSpec::integer(params.rho_bit_len),
        SecretSpec::integer(params.rho_bit_len),
        SecretSpec::integer(params.blinding_bit_len()),
    ];
    secrets.extend((0..committed).map(|_| SecretSpec::integer(params.attr_bit_len)));
    secrets.extend((0..committed).map(|_| SecretSpec::integer(params.rho_bit_len)));
    secrets.extend((0..hidden_attrs_count).map(|_| SecretSpec::integer(params.attr_bit_len)));

    let mut statements = vec![Statement {
        group,
        value: nym.clone()?,
        terms: vec![(&group.g, 0), (&pub_key.nym_h, 1)]
    }];

    for (j, commitment) in commitments_of_attrs.iter().enumerate() {
        statements.push(Statement {
            group,
            value: commitment.clone()?,
            terms: vec![(&group.g, 3 + j), (&pub_key.nym_h, 3 + committed + j)]
        });
    }

    let mut u_terms = vec![(&pub_key.s, 2), (&pub_key.r_0, 0)];
    for j in 0..committed {
        u_terms.push((_base(&pub_key.r_committed, j, "committed")?, 3 + j));
    }
    for i in 0..hidden_attrs_count {
        u_terms.push((_base(&pub_key.r_hidden, i, "hidden")?, 3 + 2 * committed + i));
    }
    statements.push(Statement { group: qr, value: u.clone()?, terms: u_terms });

    Ok(Relation { secrets, statements })
}

/// `A = Q^d (mod n)` with `d = e^-1 mod p'q'`. The issuer passes the order, verifiers don't.
pub fn a_proof_relation<'a>(params: &ClParams,
                            qr: &'a QrSpecialRsa,
                            q: &'a BigNumber,
                            a: &BigNumber,
                            order: Option<&'a BigNumber>) -> ClCryptoResult<Relation<'a>> {
    Ok(Relation {
        secrets: vec![SecretSpec::modular(params.n_length, order)],
        statements: vec![Statement { group: qr, value: a.clone()?, terms: vec![(q, 0)] }]
    })
}

/// Presentation proof over secrets `[e', v', ms, unrevealed m_k.., unrevealed m_c.., m_h..]`:
///
/// `Z / (A'^(2^(e_bit_len - 1)) * Π revealed R^m) = A'^e' * S^v' * R_0^ms * Π unrevealed R^m * Π R_h^m_h (mod n)`
pub fn presentation_relation<'a>(params: &ClParams,
                                 pub_key: &'a OrgPubKey,
                                 qr: &'a QrSpecialRsa,
                                 a_prime: &'a BigNumber,
                                 counts: &AttrCounts,
                                 revealed_known_idx: &[usize],
                                 revealed_committed_idx: &[usize],
                                 revealed_known_vals: &[BigNumber],
                                 revealed_committed_vals: &[BigNumber]) -> ClCryptoResult<Relation<'a>> {
    let mut ctx = BigNumber::new_context()?;

    let mut denominator = qr.exp(a_prime, &two_pow(params.e_bit_len - 1)?, &mut ctx)?;
    for (&i, m) in revealed_known_idx.iter().zip(revealed_known_vals.iter()) {
        let pow = qr.exp(_base(&pub_key.r_known, i, "known")?, m, &mut ctx)?;
        denominator = qr.mul(&denominator, &pow, &mut ctx)?;
    }
    for (&j, m) in revealed_committed_idx.iter().zip(revealed_committed_vals.iter()) {
        let pow = qr.exp(_base(&pub_key.r_committed, j, "committed")?, m, &mut ctx)?;
        denominator = qr.mul(&denominator, &pow, &mut ctx)?;
    }
    let value = qr.mul(&pub_key.z, &qr.inv(&denominator, &mut ctx)?, &mut ctx)?;

    let mut secrets = vec![
        SecretSpec::integer(params.e1_bit_len),
        SecretSpec::integer(params.v_bit_len + 1),
        SecretSpec::integer(params.rho_bit_len),
    ];
    let mut terms = vec![(a_prime, 0), (&pub_key.s, 1), (&pub_key.r_0, 2)];

    for i in unrevealed_indices(counts.known, revealed_known_idx) {
        terms.push((_base(&pub_key.r_known, i, "known")?, secrets.len()));
        secrets.push(SecretSpec::integer(params.attr_bit_len));
    }
    for j in unrevealed_indices(counts.committed, revealed_committed_idx) {
        terms.push((_base(&pub_key.r_committed, j, "committed")?, secrets.len()));
        secrets.push(SecretSpec::integer(params.attr_bit_len));
    }
    for i in 0..counts.hidden {
        terms.push((_base(&pub_key.r_hidden, i, "hidden")?, secrets.len()));
        secrets.push(SecretSpec::integer(params.attr_bit_len));
    }

    Ok(Relation {
        secrets,
        statements: vec![Statement { group: qr, value, terms }]
    })
}
