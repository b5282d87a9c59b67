use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::blockchain::Blockchain;
use crate::net::{self, Node};
use crate::pow::ProofOfWork;
use crate::primitives::Transaction;
use crate::utxo::UtxoSet;
use crate::wallet::{self, Wallets};

#[derive(Parser)]
#[command(name = "tinycoin", version, about = "Minimal UTXO proof-of-work blockchain node")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new keypair and print its address
    Createwallet,
    /// Print every locally held address
    Listaddresses,
    /// Initialize a chain whose genesis coinbase pays ADDRESS
    Createblockchain {
        #[arg(long)]
        address: String,
    },
    /// Walk the chain newest first and print each block
    Printchain,
    /// Rebuild the UTXO index from a full chain scan
    Reindexutxo,
    /// Sum the unspent outputs locked to ADDRESS
    Getbalance {
        #[arg(long)]
        address: String,
    },
    /// Transfer AMOUNT from FROM to TO
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        /// Mine the transaction locally instead of submitting it to the seed
        #[arg(long)]
        mine: bool,
    },
    /// Run the gossip server
    Startnode {
        /// Mine, with rewards paid to this address
        #[arg(long)]
        miner: Option<String>,
    },
}

/// Every persistence-touching command is namespaced by NODE_ID
fn node_id() -> Result<String> {
    std::env::var("NODE_ID").context("NODE_ID environment variable is not set")
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Createwallet => {
            let mut wallets = Wallets::load(&node_id()?)?;
            let address = wallets.add_wallet();
            wallets.save()?;
            println!("New address: {}", address);
        }

        Command::Listaddresses => {
            for address in Wallets::load(&node_id()?)?.addresses() {
                println!("{}", address);
            }
        }

        Command::Createblockchain { address } => {
            if !wallet::validate_address(&address) {
                bail!("invalid address: {}", address);
            }
            let chain = Blockchain::create(&address, &node_id()?)?;
            UtxoSet::new(&chain).reindex()?;
            println!("Finished!");
        }

        Command::Printchain => {
            let chain = Blockchain::open(&node_id()?)?;
            for block in chain.iter() {
                println!("============ Block {} ============", hex::encode(&block.hash));
                println!("Height:     {}", block.height);
                println!("Prev. hash: {}", hex::encode(&block.prev_hash));
                println!("PoW:        {}", ProofOfWork::new(&block).validate());
                for tx in &block.transactions {
                    println!("{}", tx);
                }
                println!();
            }
        }

        Command::Reindexutxo => {
            let chain = Blockchain::open(&node_id()?)?;
            let utxo = UtxoSet::new(&chain);
            utxo.reindex()?;
            println!(
                "Done! There are {} transactions in the UTXO set.",
                utxo.count_transactions()?
            );
        }

        Command::Getbalance { address } => {
            if !wallet::validate_address(&address) {
                bail!("invalid address: {}", address);
            }
            let chain = Blockchain::open(&node_id()?)?;
            let pub_key_hash = wallet::address_to_pub_key_hash(&address)?;
            let balance: u64 = UtxoSet::new(&chain)
                .find_utxo(&pub_key_hash)?
                .iter()
                .map(|output| output.value)
                .sum();
            println!("Balance of {}: {}", address, balance);
        }

        Command::Send {
            from,
            to,
            amount,
            mine,
        } => {
            if !wallet::validate_address(&from) {
                bail!("invalid sender address: {}", from);
            }
            if !wallet::validate_address(&to) {
                bail!("invalid recipient address: {}", to);
            }

            let node_id = node_id()?;
            let mut chain = Blockchain::open(&node_id)?;
            let wallets = Wallets::load(&node_id)?;
            let wallet = wallets.get_wallet(&from)?;

            let tx = {
                let utxo = UtxoSet::new(&chain);
                Transaction::new(wallet, &to, amount, &utxo)?
            };

            if mine {
                let block = chain.mine_block(vec![tx])?;
                UtxoSet::new(&chain).update(&block)?;
            } else {
                net::send_tx_to(net::SEED_NODE, &tx).await?;
            }
            println!("Success!");
        }

        Command::Startnode { miner } => {
            let node_id = node_id()?;
            if let Some(addr) = &miner {
                if !wallet::validate_address(addr) {
                    bail!("invalid miner address: {}", addr);
                }
                println!("Mining is on. Address to receive rewards: {}", addr);
            }
            println!("Starting node {}", node_id);

            let node = Node::new(&node_id, miner)?;
            node.run().await?;
        }
    }
    Ok(())
}
