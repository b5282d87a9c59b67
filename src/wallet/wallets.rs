use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Wallet;
use crate::codec::{Decodable, Encodable};
use crate::error::WalletError;

/// Curve identifier written into the wallet file so keypairs are only
/// loaded back onto the curve that produced them
const CURVE_TAG: &str = "ecdsa-p256";

/// Wallet file location for a node id
pub fn wallet_file(node_id: &str) -> PathBuf {
    PathBuf::from(format!("./tmp/wallets_{}.data", node_id))
}

/// On-disk shape of the wallet collection
#[derive(Serialize, Deserialize)]
struct WalletFile {
    curve: String,
    wallets: HashMap<String, Wallet>,
}

/// Every keypair owned by this node, keyed by address
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
}

impl Wallets {
    /// Load the collection for `node_id`, starting empty when no file
    /// exists yet
    pub fn load(node_id: &str) -> Result<Wallets, WalletError> {
        Self::load_from(wallet_file(node_id))
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Wallets, WalletError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Wallets {
                wallets: HashMap::new(),
                path,
            });
        }

        let content = fs::read(&path)?;
        let file = WalletFile::decode(&content)?;
        if file.curve != CURVE_TAG {
            return Err(WalletError::UnsupportedCurve(file.curve));
        }

        Ok(Wallets {
            wallets: file.wallets,
            path,
        })
    }

    /// Generate a keypair, register it and return its address
    pub fn add_wallet(&mut self) -> String {
        let wallet = Wallet::new();
        let address = wallet.address();
        self.wallets.insert(address.clone(), wallet);
        address
    }

    pub fn get_wallet(&self, address: &str) -> Result<&Wallet, WalletError> {
        self.wallets
            .get(address)
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))
    }

    pub fn addresses(&self) -> Vec<String> {
        self.wallets.keys().cloned().collect()
    }

    pub fn save(&self) -> Result<(), WalletError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = WalletFile {
            curve: CURVE_TAG.to_string(),
            wallets: self.wallets.clone(),
        };
        fs::write(&self.path, file.encode())?;
        Ok(())
    }
}
