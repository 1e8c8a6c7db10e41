pub mod commitment;
pub mod json;
pub mod logger;
pub mod random;
pub mod rsa;

use crate::bn::BigNumber;
use crate::errors::prelude::*;

pub fn get_hash_as_int(nums: &Vec<Vec<u8>>) -> ClCryptoResult<BigNumber> {
    trace!("Helpers::get_hash_as_int: >>> nums: {:?}", nums);

    let hash = BigNumber::from_bytes(&BigNumber::hash_array(&nums)?);

    trace!("Helpers::get_hash_as_int: <<< hash: {:?}", hash);

    hash
}

pub fn clone_bignum_vec(other: &[BigNumber]) -> ClCryptoResult<Vec<BigNumber>> {
    let mut res: Vec<BigNumber> = Vec::with_capacity(other.len());
    for v in other {
        res.push(v.clone()?);
    }
    Ok(res)
}

#[cfg(test)]
macro_rules! hashset {
    ( $( $x:expr ),* ) => {
        {
            let mut set = ::std::collections::HashSet::new();
            $(
                set.insert($x);
            )*
            set
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_hash_as_int_works() {
        let nums = vec![
            BigNumber::from_dec("7").unwrap().to_bytes().unwrap(),
            BigNumber::from_dec("22").unwrap().to_bytes().unwrap()
        ];
        let a = get_hash_as_int(&nums).unwrap();
        let b = get_hash_as_int(&nums).unwrap();

        assert_eq!(a, b);
        assert!(a.num_bits().unwrap() <= 256);
    }

    #[test]
    fn clone_bignum_vec_keeps_sign() {
        let v = vec![BigNumber::from_dec("-3").unwrap(), BigNumber::from_dec("5").unwrap()];
        assert_eq!(v, clone_bignum_vec(&v).unwrap());
    }
}
