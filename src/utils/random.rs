use crate::bn::BigNumber;
use crate::errors::prelude::*;

/// Source of cryptographically secure random integers.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[0, 2^size)`.
    fn rand_bits(&self, size: usize) -> ClCryptoResult<BigNumber>;

    /// Uniform integer in `[0, bound)`.
    fn rand_range(&self, bound: &BigNumber) -> ClCryptoResult<BigNumber>;
}

/// OpenSSL CSPRNG (`BN_rand`, `BN_rand_range`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSslRandom;

impl RandomSource for OpenSslRandom {
    fn rand_bits(&self, size: usize) -> ClCryptoResult<BigNumber> {
        BigNumber::rand(size)
    }

    fn rand_range(&self, bound: &BigNumber) -> ClCryptoResult<BigNumber> {
        if bound.is_negative() || *bound == BigNumber::new()? {
            return Err(err_msg(ClCryptoErrorKind::InvalidParam(1), "Random range bound must be positive"));
        }
        bound.rand_range()
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    /// Returns the same value on every draw.
    pub struct StuckRandom {
        pub value: u32
    }

    impl RandomSource for StuckRandom {
        fn rand_bits(&self, _size: usize) -> ClCryptoResult<BigNumber> {
            BigNumber::from_u32(self.value as usize)
        }

        fn rand_range(&self, _bound: &BigNumber) -> ClCryptoResult<BigNumber> {
            BigNumber::from_u32(self.value as usize)
        }
    }

    /// Draws from OpenSSL until `break_source` is called, then fails every draw.
    #[derive(Default)]
    pub struct BreakableRandom {
        broken: AtomicBool
    }

    impl BreakableRandom {
        pub fn new() -> BreakableRandom {
            BreakableRandom::default()
        }

        pub fn break_source(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        fn _check(&self) -> ClCryptoResult<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(err_msg(ClCryptoErrorKind::InvalidState, "Random source is broken"));
            }
            Ok(())
        }
    }

    impl RandomSource for BreakableRandom {
        fn rand_bits(&self, size: usize) -> ClCryptoResult<BigNumber> {
            self._check()?;
            OpenSslRandom.rand_bits(size)
        }

        fn rand_range(&self, bound: &BigNumber) -> ClCryptoResult<BigNumber> {
            self._check()?;
            OpenSslRandom.rand_range(bound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_range_stays_below_bound() {
        let bound = BigNumber::from_dec("1000").unwrap();
        for _ in 0..100 {
            let r = OpenSslRandom.rand_range(&bound).unwrap();
            assert!(r < bound);
            assert!(!r.is_negative());
        }
    }

    #[test]
    fn rand_range_rejects_zero_bound() {
        let err = OpenSslRandom.rand_range(&BigNumber::new().unwrap()).unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidParam(1), err.kind());
    }

    #[test]
    fn rand_bits_respects_size() {
        for _ in 0..100 {
            assert!(OpenSslRandom.rand_bits(80).unwrap().num_bits().unwrap() <= 80);
        }
    }
}
