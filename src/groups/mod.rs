pub mod params;
pub mod qr;
pub mod schnorr;

use crate::bn::{BigNumber, BigNumberContext};
use crate::errors::prelude::*;

use std::fmt;

/// Multiplicative group modulo a public modulus in which proof statements are evaluated.
pub trait ProofGroup: fmt::Debug + Send + Sync {
    fn modulus(&self) -> &BigNumber;

    fn mul(&self, x: &BigNumber, y: &BigNumber, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
        x.mod_mul(y, self.modulus(), Some(&mut *ctx))
    }

    fn exp(&self, base: &BigNumber, exponent: &BigNumber, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
        exp_signed(base, exponent, self.modulus(), ctx)
    }

    fn inv(&self, x: &BigNumber, ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
        x.inverse(self.modulus(), Some(&mut *ctx))
            .map_err(|_| err_msg(ClCryptoErrorKind::Membership, "Element is not invertible"))
    }
}

/// `base^exponent mod modulus`; a negative exponent yields the inverse of `base^|exponent|`.
pub fn exp_signed(base: &BigNumber, exponent: &BigNumber, modulus: &BigNumber,
                  ctx: &mut BigNumberContext) -> ClCryptoResult<BigNumber> {
    if !exponent.is_negative() {
        return base.mod_exp(exponent, modulus, Some(&mut *ctx));
    }

    base.mod_exp(&exponent.abs()?, modulus, Some(&mut *ctx))?
        .inverse(modulus, Some(&mut *ctx))
        .map_err(|_| err_msg(ClCryptoErrorKind::Membership, "Base is not invertible"))
}
