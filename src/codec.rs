use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A value failed to decode from its canonical byte encoding
#[derive(Debug, Error)]
#[error("malformed encoding: {0}")]
pub struct DecodeError(#[from] bincode::Error);

/// Canonical byte encoding: the same logical value always produces
/// byte-identical output. Block hashes and transaction ids depend on this.
pub trait Encodable: Serialize {
    fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("value has no canonical encoding")
    }
}

pub trait Decodable: Sized + DeserializeOwned {
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl<T: Serialize> Encodable for T {}
impl<T: Sized + DeserializeOwned> Decodable for T {}
