mod message;
mod server;

pub use message::{
    AddrPayload, BlockPayload, GetBlocksPayload, GetDataPayload, InvPayload, Message, TxPayload,
    VersionPayload, COMMAND_LENGTH, KIND_BLOCK, KIND_TX, PROTOCOL_VERSION,
};
pub use server::{send_tx_to, Node, SEED_NODE};
