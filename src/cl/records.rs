use super::Nonce;

use crate::bn::BigNumber;
use crate::errors::prelude::*;
use crate::utils::clone_bignum_vec;
use crate::utils::json::{JsonDecodable, JsonEncodable};

use std::collections::HashMap;
use std::sync::Mutex;

/// What the issuer remembers about a pseudonym it issued a credential to.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReceiverRecord {
    pub u: BigNumber,
    pub commitments_of_attrs: Vec<BigNumber>,
    pub known_attrs: Vec<BigNumber>,
    /// Nonce of the issuance the pseudonym is bound to.
    pub nonce: Nonce
}

impl ReceiverRecord {
    pub fn clone(&self) -> ClCryptoResult<ReceiverRecord> {
        Ok(ReceiverRecord {
            u: self.u.clone()?,
            commitments_of_attrs: clone_bignum_vec(&self.commitments_of_attrs)?,
            known_attrs: clone_bignum_vec(&self.known_attrs)?,
            nonce: self.nonce.clone()?
        })
    }
}

impl JsonEncodable for ReceiverRecord {}

impl<'a> JsonDecodable<'a> for ReceiverRecord {}

/// Issuer side storage of receiver records keyed by pseudonym.
pub trait ReceiverRecordStore: Send + Sync {
    fn store(&self, nym: &BigNumber, record: ReceiverRecord) -> ClCryptoResult<()>;

    fn load(&self, nym: &BigNumber) -> ClCryptoResult<Option<ReceiverRecord>>;
}

#[derive(Debug, Default)]
pub struct MemoryReceiverRecordStore {
    records: Mutex<HashMap<String, ReceiverRecord>>
}

impl MemoryReceiverRecordStore {
    pub fn new() -> MemoryReceiverRecordStore {
        MemoryReceiverRecordStore::default()
    }
}

impl ReceiverRecordStore for MemoryReceiverRecordStore {
    fn store(&self, nym: &BigNumber, record: ReceiverRecord) -> ClCryptoResult<()> {
        trace!("MemoryReceiverRecordStore::store: >>> nym: {:?}, record: {:?}", nym, record);

        self.records.lock()
            .map_err(|_| err_msg(ClCryptoErrorKind::InvalidState, "Receiver record lock is poisoned"))?
            .insert(nym.to_dec()?, record);

        trace!("MemoryReceiverRecordStore::store: <<<");

        Ok(())
    }

    fn load(&self, nym: &BigNumber) -> ClCryptoResult<Option<ReceiverRecord>> {
        trace!("MemoryReceiverRecordStore::load: >>> nym: {:?}", nym);

        let key = nym.to_dec()?;
        let records = self.records.lock()
            .map_err(|_| err_msg(ClCryptoErrorKind::InvalidState, "Receiver record lock is poisoned"))?;

        let record = match records.get(&key) {
            Some(record) => Some(record.clone()?),
            None => None
        };

        trace!("MemoryReceiverRecordStore::load: <<< record: {:?}", record);

        Ok(record)
    }
}
