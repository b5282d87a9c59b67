mod wallet;
mod wallets;

pub use wallet::{
    address_to_pub_key_hash, checksum, hash_pub_key, validate_address, Wallet, CHECKSUM_LENGTH,
    VERSION,
};
pub use wallets::{wallet_file, Wallets};
