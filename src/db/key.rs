/// Namespace prefix of the UTXO index
pub const UTXO_PREFIX: &[u8] = b"utxo-";
/// Sentinel key holding the best block hash
pub const HEAD_KEY: &[u8] = b"lh";

/// Logical key layouts within the single shared keyspace
pub enum Key {
    /// A block, keyed by its raw 32-byte hash
    Block(Vec<u8>),
    /// A UTXO index entry: `"utxo-"` || transaction id
    Utxo(Vec<u8>),
    /// The chain head pointer, `"lh"`
    Head,
}

impl Key {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Key::Block(hash) => hash.clone(),
            Key::Utxo(txid) => {
                let mut key = UTXO_PREFIX.to_vec();
                key.extend_from_slice(txid);
                key
            }
            Key::Head => HEAD_KEY.to_vec(),
        }
    }
}
