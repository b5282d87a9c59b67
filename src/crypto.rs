use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::generic_array::GenericArray;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::EncodedPoint;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

pub const SECRET_KEY_LENGTH: usize = 32;
/// Raw X || Y coordinates, no SEC1 tag byte
pub const PUBLIC_KEY_LENGTH: usize = 64;
/// Raw r || s halves of equal length
pub const SIGNATURE_LENGTH: usize = 64;

pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(Sha256::digest(data)).to_vec()
}

pub fn ripemd160(data: &[u8]) -> Vec<u8> {
    Ripemd160::digest(data).to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(input: &str) -> Option<Vec<u8>> {
    bs58::decode(input).into_vec().ok()
}

/// Generate a fresh P-256 keypair as (secret scalar, raw X || Y public key)
pub fn new_key_pair() -> (Vec<u8>, Vec<u8>) {
    let secret = SigningKey::random(&mut OsRng);
    // uncompressed SEC1 is 0x04 || X || Y; keys travel without the tag
    let public = secret.verifying_key().to_encoded_point(false);
    (secret.to_bytes().to_vec(), public.as_bytes()[1..].to_vec())
}

/// ECDSA sign `message` (digested with SHA-256), returning raw r || s bytes
pub fn sign(secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = SigningKey::from_slice(secret_key).map_err(|_| CryptoError::MalformedSecretKey)?;
    let signature: Signature = key.sign_digest(Sha256::new_with_prefix(message));
    Ok(signature.to_bytes().to_vec())
}

/// Check a raw r || s signature over `message` against a raw X || Y public key
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(CryptoError::MalformedPublicKey);
    }
    let point = EncodedPoint::from_untagged_bytes(GenericArray::from_slice(public_key));
    let key =
        VerifyingKey::from_encoded_point(&point).map_err(|_| CryptoError::MalformedPublicKey)?;
    let signature =
        Signature::from_slice(signature).map_err(|_| CryptoError::MalformedSignature)?;
    Ok(key
        .verify_digest(Sha256::new_with_prefix(message), &signature)
        .is_ok())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_pair_shapes() {
        let (secret, public) = new_key_pair();
        assert_eq!(secret.len(), SECRET_KEY_LENGTH);
        assert_eq!(public.len(), PUBLIC_KEY_LENGTH);
    }

    #[test]
    fn sign_and_verify() {
        let (secret, public) = new_key_pair();
        let signature = sign(&secret, b"pay 5 to bob").unwrap();
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert!(verify(&public, b"pay 5 to bob", &signature).unwrap());
        assert!(!verify(&public, b"pay 6 to bob", &signature).unwrap());
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let (secret, _) = new_key_pair();
        let (_, other_public) = new_key_pair();
        let signature = sign(&secret, b"message").unwrap();
        assert!(!verify(&other_public, b"message", &signature).unwrap());
    }

    #[test]
    fn base58_round_trip() {
        let data = b"\x00tinycoin payload".to_vec();
        let encoded = base58_encode(&data);
        // the alphabet excludes 0 O l I + /
        assert!(!encoded.contains(['0', 'O', 'l', 'I', '+', '/']));
        assert_eq!(base58_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
