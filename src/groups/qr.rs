use super::ProofGroup;

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::utils::json::{JsonDecodable, JsonEncodable};

/// `Z_n^*` for a special RSA modulus `n`. The quadratic residues form the subgroup the
/// credential signature lives in; membership in it cannot be decided without the factors.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QrSpecialRsa {
    pub n: BigNumber
}

impl QrSpecialRsa {
    pub fn new(n: BigNumber) -> QrSpecialRsa {
        QrSpecialRsa { n }
    }

    /// Checks `0 < x < n`.
    pub fn is_in_range(&self, x: &BigNumber) -> ClCryptoResult<bool> {
        Ok(!x.is_negative() && *x != BigNumber::new()? && *x < self.n)
    }

    pub fn clone(&self) -> ClCryptoResult<QrSpecialRsa> {
        Ok(QrSpecialRsa { n: self.n.clone()? })
    }
}

impl ProofGroup for QrSpecialRsa {
    fn modulus(&self) -> &BigNumber {
        &self.n
    }
}

impl JsonEncodable for QrSpecialRsa {}

impl<'a> JsonDecodable<'a> for QrSpecialRsa {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_in_range_works() {
        let group = QrSpecialRsa::new(BigNumber::from_dec("77").unwrap());

        assert!(group.is_in_range(&BigNumber::from_dec("4").unwrap()).unwrap());
        assert!(!group.is_in_range(&BigNumber::from_dec("0").unwrap()).unwrap());
        assert!(!group.is_in_range(&BigNumber::from_dec("77").unwrap()).unwrap());
        assert!(!group.is_in_range(&BigNumber::from_dec("-4").unwrap()).unwrap());
    }

    #[test]
    fn inv_works() {
        let mut ctx = BigNumber::new_context().unwrap();
        let group = QrSpecialRsa::new(BigNumber::from_dec("77").unwrap());
        let x = BigNumber::from_dec("4").unwrap();

        let x_inv = group.inv(&x, &mut ctx).unwrap();
        assert_eq!(BigNumber::from_u32(1).unwrap(), group.mul(&x, &x_inv, &mut ctx).unwrap());
    }
}
