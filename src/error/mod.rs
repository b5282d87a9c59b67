use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    RocksDb(#[from] rocksdb::Error),
    #[error(transparent)]
    Codec(#[from] crate::codec::DecodeError),
    #[error("blockchain already exists")]
    ChainExists,
    #[error("no existing blockchain found")]
    NoChain,
    #[error("block not found")]
    BlockNotFound,
    #[error("corrupt store: {0}")]
    Corrupt(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed secret key")]
    MalformedSecretKey,
    #[error("malformed public key")]
    MalformedPublicKey,
    #[error("malformed signature")]
    MalformedSignature,
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("not enough funds: have {available}, need {required}")]
    InsufficientFunds { available: u64, required: u64 },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("transaction not found")]
    NotFound,
    #[error("referenced output does not exist")]
    MissingOutput,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] crate::codec::DecodeError),
    #[error("wallet file written for unsupported curve {0}")]
    UnsupportedCurve(String),
    #[error("no wallet for address {0}")]
    UnknownAddress(String),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("message shorter than a command header")]
    Truncated,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Codec(#[from] crate::codec::DecodeError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
