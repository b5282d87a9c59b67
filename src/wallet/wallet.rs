use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::TransactionError;

pub const CHECKSUM_LENGTH: usize = 4;
/// Address version byte
pub const VERSION: u8 = 0x00;

/// A P-256 keypair: secret scalar plus raw X || Y public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub secret_key: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Wallet {
        let (secret_key, public_key) = crypto::new_key_pair();
        Wallet {
            secret_key,
            public_key,
        }
    }

    /// RIPEMD-160(SHA-256(pubkey))
    pub fn pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(&self.public_key)
    }

    /// Base58(version || hash160 || checksum4)
    pub fn address(&self) -> String {
        let mut payload = vec![VERSION];
        payload.extend(self.pub_key_hash());
        let check = checksum(&payload);
        payload.extend(check);
        crypto::base58_encode(&payload)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    crypto::ripemd160(&crypto::sha256(pub_key))
}

/// First four bytes of a double SHA-256 over the versioned payload
pub fn checksum(payload: &[u8]) -> Vec<u8> {
    crypto::double_sha256(payload)[..CHECKSUM_LENGTH].to_vec()
}

/// Decode an address and check the embedded checksum against the rest
pub fn validate_address(address: &str) -> bool {
    let decoded = match crypto::base58_decode(address) {
        Some(decoded) if decoded.len() > CHECKSUM_LENGTH => decoded,
        _ => return false,
    };
    let (payload, actual) = decoded.split_at(decoded.len() - CHECKSUM_LENGTH);
    checksum(payload) == actual
}

/// The RIPEMD-160 key hash an address locks outputs to
pub fn address_to_pub_key_hash(address: &str) -> Result<Vec<u8>, TransactionError> {
    let decoded = crypto::base58_decode(address)
        .filter(|decoded| decoded.len() > CHECKSUM_LENGTH + 1)
        .ok_or_else(|| TransactionError::InvalidAddress(address.to_string()))?;
    Ok(decoded[1..decoded.len() - CHECKSUM_LENGTH].to_vec())
}
