use std::collections::HashMap;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::codec::Encodable;
use crate::crypto;
use crate::error::{ChainError, TransactionError};
use crate::utxo::UtxoSet;
use crate::wallet::{self, Wallet};

/// Block reward minted by every coinbase
pub const SUBSIDY: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction holding the referenced output; empty for coinbase
    pub id: Vec<u8>,
    /// Index of the referenced output; -1 for coinbase
    pub out: i64,
    /// Raw r || s bytes; empty until signed
    pub signature: Vec<u8>,
    /// Raw X || Y spender key, or arbitrary data for coinbase
    pub pub_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    /// RIPEMD-160(SHA-256(pubkey)) of the party that can spend this output
    pub pub_key_hash: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, address: &str) -> Result<TxOutput, TransactionError> {
        let mut output = TxOutput {
            value,
            pub_key_hash: vec![],
        };
        output.lock(address)?;
        Ok(output)
    }

    pub fn lock(&mut self, address: &str) -> Result<(), TransactionError> {
        self.pub_key_hash = wallet::address_to_pub_key_hash(address)?;
        Ok(())
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash == pub_key_hash
    }
}

/// The unspent outputs of one transaction, each keyed by its original
/// position in that transaction. Positions survive partial spends so that
/// `TxInput::out` always indexes correctly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutputs {
    pub outputs: Vec<(i64, TxOutput)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 of the transaction encoded with this field cleared
    pub id: Vec<u8>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// The minting transaction at the head of every block. Empty `data` is
    /// replaced with 24 random bytes, hex encoded.
    pub fn coinbase(to: &str, data: &[u8]) -> Result<Transaction, TransactionError> {
        let data = if data.is_empty() {
            let mut random = [0u8; 24];
            rand::thread_rng().fill_bytes(&mut random);
            hex::encode(random).into_bytes()
        } else {
            data.to_vec()
        };

        let input = TxInput {
            id: vec![],
            out: -1,
            signature: vec![],
            pub_key: data,
        };
        let output = TxOutput::new(SUBSIDY, to)?;

        let mut tx = Transaction {
            id: vec![],
            inputs: vec![input],
            outputs: vec![output],
        };
        tx.id = tx.hash();
        Ok(tx)
    }

    /// Build, fund and sign a payment of `amount` from `wallet` to `to`,
    /// returning change to the sender.
    pub fn new(
        wallet: &Wallet,
        to: &str,
        amount: u64,
        utxo: &UtxoSet,
    ) -> Result<Transaction, ChainError> {
        let pub_key_hash = wallet.pub_key_hash();
        let (accumulated, spendable) = utxo.find_spendable_outputs(&pub_key_hash, amount)?;

        if accumulated < amount {
            return Err(TransactionError::InsufficientFunds {
                available: accumulated,
                required: amount,
            }
            .into());
        }

        let mut inputs = vec![];
        for (txid, outs) in spendable {
            let id = hex::decode(&txid).expect("spendable keys are hex tx ids");
            for out in outs {
                inputs.push(TxInput {
                    id: id.clone(),
                    out,
                    signature: vec![],
                    pub_key: wallet.public_key.clone(),
                });
            }
        }

        let mut outputs = vec![TxOutput::new(amount, to)?];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, &wallet.address())?);
        }

        let mut tx = Transaction {
            id: vec![],
            inputs,
            outputs,
        };
        tx.id = tx.hash();
        utxo.chain.sign_transaction(&mut tx, &wallet.secret_key)?;
        Ok(tx)
    }

    /// Hash of the transaction with its id field cleared
    pub fn hash(&self) -> Vec<u8> {
        let mut copy = self.clone();
        copy.id = vec![];
        crypto::sha256(&copy.encode())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].id.is_empty() && self.inputs[0].out == -1
    }

    /// Copy with signatures and public keys stripped from every input; the
    /// shape both signer and verifier hash.
    fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                id: input.id.clone(),
                out: input.out,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();

        Transaction {
            id: self.id.clone(),
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// Hex rendering of the trimmed copy, one line
    fn sign_data(tx_copy: &Transaction) -> Vec<u8> {
        let mut data = hex::encode(tx_copy.encode()).into_bytes();
        data.push(b'\n');
        data
    }

    /// Sign every input against the transactions it references, keyed by hex
    /// id in `prev_txs`.
    pub fn sign(
        &mut self,
        secret_key: &[u8],
        prev_txs: &HashMap<String, Transaction>,
    ) -> Result<(), TransactionError> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut tx_copy = self.trimmed_copy();

        for index in 0..self.inputs.len() {
            let referenced = referenced_output(&tx_copy.inputs[index], prev_txs)?;
            tx_copy.inputs[index].signature = vec![];
            tx_copy.inputs[index].pub_key = referenced.pub_key_hash.clone();

            let signature = crypto::sign(secret_key, &Self::sign_data(&tx_copy))?;
            self.inputs[index].signature = signature;

            tx_copy.inputs[index].pub_key = vec![];
        }

        Ok(())
    }

    /// Check every input's signature; one failure invalidates the whole
    /// transaction.
    pub fn verify(
        &self,
        prev_txs: &HashMap<String, Transaction>,
    ) -> Result<bool, TransactionError> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let mut tx_copy = self.trimmed_copy();

        for (index, input) in self.inputs.iter().enumerate() {
            let referenced = referenced_output(&tx_copy.inputs[index], prev_txs)?;
            tx_copy.inputs[index].signature = vec![];
            tx_copy.inputs[index].pub_key = referenced.pub_key_hash.clone();

            let data = Self::sign_data(&tx_copy);
            match crypto::verify(&input.pub_key, &data, &input.signature) {
                Ok(true) => {}
                // an unparseable key or signature fails verification rather
                // than the caller
                Ok(false) | Err(_) => return Ok(false),
            }

            tx_copy.inputs[index].pub_key = vec![];
        }

        Ok(true)
    }
}

fn referenced_output<'a>(
    input: &TxInput,
    prev_txs: &'a HashMap<String, Transaction>,
) -> Result<&'a TxOutput, TransactionError> {
    let prev_tx = prev_txs
        .get(&hex::encode(&input.id))
        .ok_or(TransactionError::MissingOutput)?;
    usize::try_from(input.out)
        .ok()
        .and_then(|index| prev_tx.outputs.get(index))
        .ok_or(TransactionError::MissingOutput)
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", hex::encode(&self.id))?;
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {}:", i)?;
            writeln!(f, "       TXID:      {}", hex::encode(&input.id))?;
            writeln!(f, "       Out:       {}", input.out)?;
            writeln!(f, "       Signature: {}", hex::encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", hex::encode(&input.pub_key))?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {}:", i)?;
            writeln!(f, "       Value:  {}", output.value)?;
            writeln!(f, "       Script: {}", hex::encode(&output.pub_key_hash))?;
        }
        Ok(())
    }
}
