use serde::{Deserialize, Serialize};

use crate::codec::{Decodable, Encodable};
use crate::error::NetworkError;

/// Commands are ASCII, zero padded to this width on the wire
pub const COMMAND_LENGTH: usize = 12;
/// Gossip protocol version
pub const PROTOCOL_VERSION: u64 = 1;

/// Inventory kinds
pub const KIND_BLOCK: &str = "block";
pub const KIND_TX: &str = "tx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPayload {
    pub version: u64,
    pub best_height: u64,
    pub addr_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrPayload {
    pub addr_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvPayload {
    pub addr_from: String,
    pub kind: String,
    pub items: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlocksPayload {
    pub addr_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDataPayload {
    pub addr_from: String,
    pub kind: String,
    pub id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    pub addr_from: String,
    /// Encoded block
    pub block: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    pub addr_from: String,
    /// Encoded transaction
    pub transaction: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Version(VersionPayload),
    Addr(AddrPayload),
    Inv(InvPayload),
    GetBlocks(GetBlocksPayload),
    GetData(GetDataPayload),
    Block(BlockPayload),
    Tx(TxPayload),
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Message::Version(_) => "version",
            Message::Addr(_) => "addr",
            Message::Inv(_) => "inv",
            Message::GetBlocks(_) => "getblocks",
            Message::GetData(_) => "getdata",
            Message::Block(_) => "block",
            Message::Tx(_) => "tx",
        }
    }

    /// Zero-padded command header followed by the payload encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = cmd_to_bytes(self.command()).to_vec();
        let payload = match self {
            Message::Version(payload) => payload.encode(),
            Message::Addr(payload) => payload.encode(),
            Message::Inv(payload) => payload.encode(),
            Message::GetBlocks(payload) => payload.encode(),
            Message::GetData(payload) => payload.encode(),
            Message::Block(payload) => payload.encode(),
            Message::Tx(payload) => payload.encode(),
        };
        bytes.extend(payload);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Message, NetworkError> {
        if bytes.len() < COMMAND_LENGTH {
            return Err(NetworkError::Truncated);
        }
        let (header, payload) = bytes.split_at(COMMAND_LENGTH);

        Ok(match bytes_to_cmd(header).as_str() {
            "version" => Message::Version(VersionPayload::decode(payload)?),
            "addr" => Message::Addr(AddrPayload::decode(payload)?),
            "inv" => Message::Inv(InvPayload::decode(payload)?),
            "getblocks" => Message::GetBlocks(GetBlocksPayload::decode(payload)?),
            "getdata" => Message::GetData(GetDataPayload::decode(payload)?),
            "block" => Message::Block(BlockPayload::decode(payload)?),
            "tx" => Message::Tx(TxPayload::decode(payload)?),
            command => return Err(NetworkError::UnknownCommand(command.to_string())),
        })
    }
}

fn cmd_to_bytes(cmd: &str) -> [u8; COMMAND_LENGTH] {
    let mut bytes = [0u8; COMMAND_LENGTH];
    bytes[..cmd.len()].copy_from_slice(cmd.as_bytes());
    bytes
}

fn bytes_to_cmd(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
