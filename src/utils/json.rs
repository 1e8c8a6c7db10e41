use crate::errors::prelude::*;

use serde::{Deserialize, Serialize};

pub trait JsonEncodable: Serialize + Sized {
    fn to_json(&self) -> ClCryptoResult<String> {
        serde_json::to_string(self)
            .map_err(|err| err_msg(ClCryptoErrorKind::InvalidState, format!("Unable to serialize: {}", err)))
    }
}

pub trait JsonDecodable<'a>: Deserialize<'a> {
    fn from_json(json: &'a str) -> ClCryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
