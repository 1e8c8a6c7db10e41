use crate::errors::prelude::*;

use int_traits::IntTraits;

use openssl::bn::{BigNum, BigNumContext, BigNumRef, MsbOption};
use openssl::error::ErrorStack;
use openssl::hash::{Hasher, MessageDigest};

use serde::de::{Deserialize, Deserializer, Error as DError, Visitor};
use serde::ser::{Error as SError, Serialize, Serializer};

use std::cmp::Ord;
use std::cmp::Ordering;
use std::fmt;

pub struct BigNumberContext {
    openssl_bn_context: BigNumContext
}

#[derive(Debug)]
pub struct BigNumber {
    openssl_bn: BigNum
}

impl BigNumber {
    pub fn new_context() -> ClCryptoResult<BigNumberContext> {
        let ctx = BigNumContext::new()?;
        Ok(BigNumberContext {
            openssl_bn_context: ctx
        })
    }

    pub fn new() -> ClCryptoResult<BigNumber> {
        let bn = BigNum::new()?;
        Ok(BigNumber {
            openssl_bn: bn
        })
    }

    pub fn generate_prime(size: usize) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::generate_prime(&mut bn.openssl_bn, size as i32, false, None, None)?;
        Ok(bn)
    }

    /// Generates a `size` bit prime `p` such that `(p - 1) / 2` is prime as well.
    pub fn generate_safe_prime(size: usize) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::generate_prime(&mut bn.openssl_bn, size as i32, true, None, None)?;
        Ok(bn)
    }

    pub fn is_prime(&self, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<bool> {
        let prime_len = self.to_dec()?.len();
        let checks = prime_len.log2() as i32;
        self.is_prime_with_checks(checks, ctx)
    }

    /// Miller-Rabin with a fixed number of rounds, after trial division.
    pub fn is_prime_with_checks(&self, checks: i32, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<bool> {
        match ctx {
            Some(context) => Ok(self.openssl_bn.is_prime_fasttest(checks, &mut context.openssl_bn_context, true)?),
            None => {
                let mut ctx = BigNumber::new_context()?;
                Ok(self.openssl_bn.is_prime_fasttest(checks, &mut ctx.openssl_bn_context, true)?)
            }
        }
    }

    pub fn rand(size: usize) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::rand(&mut bn.openssl_bn, size as i32, MsbOption::MAYBE_ZERO, false)?;
        Ok(bn)
    }

    pub fn rand_range(&self) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::rand_range(&self.openssl_bn, &mut bn.openssl_bn)?;
        Ok(bn)
    }

    pub fn num_bits(&self) -> ClCryptoResult<i32> {
        Ok(self.openssl_bn.num_bits())
    }

    pub fn set_bit(&mut self, n: i32) -> ClCryptoResult<&mut BigNumber> {
        BigNumRef::set_bit(&mut self.openssl_bn, n)?;
        Ok(self)
    }

    pub fn is_negative(&self) -> bool {
        self.openssl_bn.is_negative()
    }

    pub fn set_negative(&mut self, negative: bool) -> ClCryptoResult<&mut BigNumber> {
        BigNumRef::set_negative(&mut self.openssl_bn, negative);
        Ok(self)
    }

    pub fn abs(&self) -> ClCryptoResult<BigNumber> {
        let mut bn = self.clone()?;
        bn.set_negative(false)?;
        Ok(bn)
    }

    pub fn from_u32(n: usize) -> ClCryptoResult<BigNumber> {
        let bn = BigNum::from_u32(n as u32)?;
        Ok(BigNumber {
            openssl_bn: bn
        })
    }

    pub fn from_dec(dec: &str) -> ClCryptoResult<BigNumber> {
        let bn = BigNum::from_dec_str(dec)?;
        Ok(BigNumber {
            openssl_bn: bn
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> ClCryptoResult<BigNumber> {
        let bn = BigNum::from_slice(bytes)?;
        Ok(BigNumber {
            openssl_bn: bn
        })
    }

    pub fn to_dec(&self) -> ClCryptoResult<String> {
        let result = self.openssl_bn.to_dec_str()?;
        Ok(result.to_string())
    }

    /// Big-endian magnitude; the sign is not encoded.
    pub fn to_bytes(&self) -> ClCryptoResult<Vec<u8>> {
        Ok(self.openssl_bn.to_vec())
    }

    pub fn add(&self, a: &BigNumber) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::checked_add(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn)?;
        Ok(bn)
    }

    pub fn sub(&self, a: &BigNumber) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        BigNumRef::checked_sub(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn)?;
        Ok(bn)
    }

    pub fn mul(&self, a: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::checked_mul(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::checked_mul(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    pub fn mod_add(&self, a: &BigNumber, n: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::mod_add(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &n.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::mod_add(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &n.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    pub fn mod_mul(&self, a: &BigNumber, n: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::mod_mul(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &n.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::mod_mul(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &n.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    pub fn div(&self, a: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::checked_div(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::checked_div(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    pub fn add_word(&mut self, w: u32) -> ClCryptoResult<&mut BigNumber> {
        BigNumRef::add_word(&mut self.openssl_bn, w)?;
        Ok(self)
    }

    pub fn sub_word(&mut self, w: u32) -> ClCryptoResult<&mut BigNumber> {
        BigNumRef::sub_word(&mut self.openssl_bn, w)?;
        Ok(self)
    }

    pub fn div_word(&mut self, w: u32) -> ClCryptoResult<&mut BigNumber> {
        BigNumRef::div_word(&mut self.openssl_bn, w)?;
        Ok(self)
    }

    /// `self^a mod b` for a non-negative exponent `a`.
    pub fn mod_exp(&self, a: &BigNumber, b: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::mod_exp(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &b.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::mod_exp(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &b.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    /// Non-negative remainder of `self` modulo `a`.
    pub fn modulus(&self, a: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::nnmod(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::nnmod(&mut bn.openssl_bn, &self.openssl_bn, &a.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    /// Modular inverse; fails when `gcd(self, n) != 1`.
    pub fn inverse(&self, n: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        let mut bn = BigNumber::new()?;
        match ctx {
            Some(context) => BigNumRef::mod_inverse(&mut bn.openssl_bn, &self.openssl_bn, &n.openssl_bn, &mut context.openssl_bn_context)?,
            None => {
                let mut ctx = BigNumber::new_context()?;
                BigNumRef::mod_inverse(&mut bn.openssl_bn, &self.openssl_bn, &n.openssl_bn, &mut ctx.openssl_bn_context)?;
            }
        }
        Ok(bn)
    }

    pub fn mod_div(&self, b: &BigNumber, p: &BigNumber, ctx: Option<&mut BigNumberContext>) -> ClCryptoResult<BigNumber> {
        //(a*  (1/b mod p) mod p)
        match ctx {
            Some(context) => b
                .inverse(p, Some(&mut *context))?
                .mod_mul(&self, p, Some(context)),
            None => {
                let mut context = BigNumber::new_context()?;
                b.inverse(p, Some(&mut context))?
                    .mod_mul(&self, p, Some(&mut context))
            }
        }
    }

    pub fn clone(&self) -> ClCryptoResult<BigNumber> {
        Ok(BigNumber {
            openssl_bn: self.openssl_bn.to_owned()?
        })
    }

    pub fn hash_array(nums: &Vec<Vec<u8>>) -> ClCryptoResult<Vec<u8>> {
        let mut sha256 = Hasher::new(MessageDigest::sha256())?;

        for num in nums.iter() {
            sha256.update(&num)?;
        }

        Ok(sha256.finish()?.to_vec())
    }
}

impl Ord for BigNumber {
    fn cmp(&self, other: &BigNumber) -> Ordering {
        self.openssl_bn.cmp(&other.openssl_bn)
    }
}

impl Eq for BigNumber {}

impl PartialOrd for BigNumber {
    fn partial_cmp(&self, other: &BigNumber) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BigNumber {
    fn eq(&self, other: &BigNumber) -> bool {
        self.openssl_bn == other.openssl_bn
    }
}

impl Serialize for BigNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_newtype_struct("BigNumber", &self.to_dec().map_err(SError::custom)?)
    }
}

impl<'a> Deserialize<'a> for BigNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'a> {
        struct BigNumberVisitor;

        impl<'a> Visitor<'a> for BigNumberVisitor {
            type Value = BigNumber;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("expected BigNumber")
            }

            fn visit_str<E>(self, value: &str) -> Result<BigNumber, E>
                where E: DError
            {
                Ok(BigNumber::from_dec(value).map_err(DError::custom)?)
            }
        }

        deserializer.deserialize_str(BigNumberVisitor)
    }
}

impl From<ErrorStack> for ClCryptoError {
    fn from(err: ErrorStack) -> ClCryptoError {
        // TODO: split invalid structure errors from allocation failures once ErrorStack codes are mapped
        err.to_cl(ClCryptoErrorKind::InvalidStructure, "Internal OpenSSL error")
    }
}
