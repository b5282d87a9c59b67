use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex as AsyncMutex;

use super::message::{
    AddrPayload, BlockPayload, GetBlocksPayload, GetDataPayload, InvPayload, Message, TxPayload,
    VersionPayload, KIND_BLOCK, KIND_TX, PROTOCOL_VERSION,
};
use crate::blockchain::Blockchain;
use crate::codec::{Decodable, Encodable};
use crate::error::{ChainError, NetworkError};
use crate::mempool::MemPool;
use crate::primitives::{Block, Transaction};
use crate::utxo::UtxoSet;

/// First entry of every node's peer list; relays transaction inventories
pub const SEED_NODE: &str = "localhost:3000";

/// A running gossip node: the chain, the peers we know about, blocks still
/// being downloaded and the local memory pool. Handlers run one per
/// connection and share this state through locks.
pub struct Node {
    /// Our listen address, localhost:<node id>
    addr: String,
    /// Reward address when this node mines
    mining_addr: Option<String>,
    chain: RwLock<Blockchain>,
    known_nodes: Mutex<Vec<String>>,
    blocks_in_transit: Mutex<Vec<Vec<u8>>>,
    mempool: Mutex<MemPool>,
    /// Held for a whole verify-mine-reindex-clear cycle; a second trigger
    /// waits here and then re-reads the drained pool
    miner_lock: AsyncMutex<()>,
}

impl Node {
    pub fn new(node_id: &str, mining_addr: Option<String>) -> Result<Arc<Node>, ChainError> {
        let chain = Blockchain::open(node_id)?;
        Ok(Arc::new(Node {
            addr: format!("localhost:{}", node_id),
            mining_addr,
            chain: RwLock::new(chain),
            known_nodes: Mutex::new(vec![SEED_NODE.to_string()]),
            blocks_in_transit: Mutex::new(vec![]),
            mempool: Mutex::new(MemPool::new()),
            miner_lock: AsyncMutex::new(()),
        }))
    }

    /// Bind, arm the shutdown handler, introduce ourselves to the seed and
    /// serve connections until the process is signalled.
    pub async fn run(self: Arc<Node>) -> Result<(), NetworkError> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!("listening on {}", self.addr);

        tokio::spawn(Arc::clone(&self).close_store_on_signal());

        if self.addr != SEED_NODE {
            self.send_version(SEED_NODE).await;
        }

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let node = Arc::clone(&self);
                    tokio::spawn(async move {
                        // per-message failures never take the server down
                        if let Err(err) = node.handle_connection(stream).await {
                            error!("dropping message: {}", err);
                        }
                    });
                }
                Err(err) => warn!("accept failed: {}", err),
            }
        }
    }

    async fn close_store_on_signal(self: Arc<Node>) {
        let mut interrupt = signal(SignalKind::interrupt()).expect("signal handler");
        let mut terminate = signal(SignalKind::terminate()).expect("signal handler");
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        info!("shutting down");
        self.chain.read().flush();
        std::process::exit(0);
    }

    /// Each connection carries exactly one command, read to EOF
    async fn handle_connection(&self, mut stream: TcpStream) -> Result<(), NetworkError> {
        let mut request = vec![];
        stream.read_to_end(&mut request).await?;

        let message = Message::from_bytes(&request)?;
        debug!("received {} command", message.command());

        match message {
            Message::Version(payload) => self.handle_version(payload).await,
            Message::Addr(payload) => self.handle_addr(payload).await,
            Message::Inv(payload) => self.handle_inv(payload).await,
            Message::GetBlocks(payload) => self.handle_get_blocks(payload).await,
            Message::GetData(payload) => self.handle_get_data(payload).await,
            Message::Block(payload) => self.handle_block(payload).await,
            Message::Tx(payload) => self.handle_tx(payload).await,
        }
    }

    /// Compare best heights: fetch from a taller peer, advertise ours to a
    /// shorter one, and remember the peer either way.
    async fn handle_version(&self, payload: VersionPayload) -> Result<(), NetworkError> {
        let best_height = self.chain.read().get_best_height()?;

        if best_height < payload.best_height {
            self.send_get_blocks(&payload.addr_from).await;
        } else if best_height > payload.best_height {
            self.send_version(&payload.addr_from).await;
        }

        self.learn_node(&payload.addr_from);
        Ok(())
    }

    async fn handle_addr(&self, payload: AddrPayload) -> Result<(), NetworkError> {
        for addr in payload.addr_list {
            self.learn_node(&addr);
        }
        info!("there are {} known nodes", self.known_nodes.lock().len());

        for node in self.peers() {
            self.send_get_blocks(&node).await;
        }
        Ok(())
    }

    async fn handle_get_blocks(&self, payload: GetBlocksPayload) -> Result<(), NetworkError> {
        let hashes = self.chain.read().get_block_hashes()?;
        self.send_inv(&payload.addr_from, KIND_BLOCK, hashes).await;
        Ok(())
    }

    async fn handle_inv(&self, payload: InvPayload) -> Result<(), NetworkError> {
        info!(
            "received inventory with {} {}",
            payload.items.len(),
            payload.kind
        );

        match payload.kind.as_str() {
            KIND_BLOCK => {
                let first = match payload.items.first() {
                    Some(first) => first.clone(),
                    None => return Ok(()),
                };
                {
                    let mut transit = self.blocks_in_transit.lock();
                    *transit = payload.items;
                    transit.retain(|hash| *hash != first);
                }
                self.send_get_data(&payload.addr_from, KIND_BLOCK, first)
                    .await;
            }
            KIND_TX => {
                let id = match payload.items.first() {
                    Some(id) => id.clone(),
                    None => return Ok(()),
                };
                if !self.mempool.lock().contains(&hex::encode(&id)) {
                    self.send_get_data(&payload.addr_from, KIND_TX, id).await;
                }
            }
            kind => warn!("unknown inventory kind {}", kind),
        }
        Ok(())
    }

    async fn handle_get_data(&self, payload: GetDataPayload) -> Result<(), NetworkError> {
        match payload.kind.as_str() {
            KIND_BLOCK => {
                let block = match self.chain.read().get_block(&payload.id) {
                    Ok(block) => block,
                    // nothing to serve; the request is silently dropped
                    Err(_) => return Ok(()),
                };
                self.send_block(&payload.addr_from, &block).await;
            }
            KIND_TX => {
                let tx = self.mempool.lock().get(&hex::encode(&payload.id));
                if let Some(tx) = tx {
                    self.send_tx(&payload.addr_from, &tx).await;
                }
            }
            kind => warn!("unknown inventory kind {}", kind),
        }
        Ok(())
    }

    /// Store a received block, then either request the next one in transit
    /// or, once the download is drained, rebuild the UTXO index.
    async fn handle_block(&self, payload: BlockPayload) -> Result<(), NetworkError> {
        let block = Block::decode(&payload.block)?;
        self.chain.write().add_block(&block)?;
        info!("added block {}", hex::encode(&block.hash));

        let next = {
            let mut transit = self.blocks_in_transit.lock();
            if transit.is_empty() {
                None
            } else {
                Some(transit.remove(0))
            }
        };

        match next {
            Some(hash) => {
                self.send_get_data(&payload.addr_from, KIND_BLOCK, hash)
                    .await;
            }
            None => {
                let chain = self.chain.read();
                UtxoSet::new(&chain).reindex()?;
                info!("utxo index rebuilt");
            }
        }
        Ok(())
    }

    /// Pool a received transaction. The seed relays the inventory to every
    /// other peer; a miner starts mining once the pool holds two.
    async fn handle_tx(&self, payload: TxPayload) -> Result<(), NetworkError> {
        let tx = Transaction::decode(&payload.transaction)?;
        let id = tx.id.clone();
        let pooled = {
            let mut pool = self.mempool.lock();
            pool.insert(tx);
            pool.len()
        };
        debug!("{}: {} transactions pooled", self.addr, pooled);

        if self.is_seed() {
            for node in self.peers() {
                if node != payload.addr_from {
                    self.send_inv(&node, KIND_TX, vec![id.clone()]).await;
                }
            }
        } else if self.mining_addr.is_some() && pooled >= 2 {
            self.mine_transactions().await?;
        }
        Ok(())
    }

    /// Assemble every verifying pooled transaction behind a fresh coinbase,
    /// mine, rebuild the index, drop the mined entries and announce the
    /// block; repeat while the pool refills. Concurrent triggers serialize
    /// on the miner lock, so a late trigger sees the pool its predecessor
    /// left behind rather than a stale candidate set.
    async fn mine_transactions(&self) -> Result<(), NetworkError> {
        let mining_addr = match &self.mining_addr {
            Some(addr) => addr.clone(),
            None => return Ok(()),
        };

        let _mining = self.miner_lock.lock().await;

        loop {
            let candidates = self.mempool.lock().transactions();
            if candidates.is_empty() {
                return Ok(());
            }

            let mut txs = vec![];
            {
                let chain = self.chain.read();
                for tx in candidates {
                    match chain.verify_transaction(&tx) {
                        Ok(true) => txs.push(tx),
                        _ => warn!("ignoring invalid transaction {}", hex::encode(&tx.id)),
                    }
                }
            }
            if txs.is_empty() {
                info!("all pooled transactions are invalid");
                return Ok(());
            }

            let coinbase =
                Transaction::coinbase(&mining_addr, b"").map_err(ChainError::Transaction)?;
            txs.insert(0, coinbase);

            let block = self.chain.write().mine_block(txs.clone())?;
            {
                let chain = self.chain.read();
                UtxoSet::new(&chain).reindex()?;
            }
            info!("mined a new block");

            {
                let mut pool = self.mempool.lock();
                for tx in &txs {
                    pool.remove(&hex::encode(&tx.id));
                }
            }

            for node in self.peers() {
                self.send_inv(&node, KIND_BLOCK, vec![block.hash.clone()])
                    .await;
            }

            if self.mempool.lock().is_empty() {
                return Ok(());
            }
        }
    }

    fn learn_node(&self, addr: &str) {
        let mut known = self.known_nodes.lock();
        if !known.iter().any(|node| node == addr) {
            known.push(addr.to_string());
        }
    }

    fn is_seed(&self) -> bool {
        let known = self.known_nodes.lock();
        known.first().map_or(false, |seed| *seed == self.addr)
    }

    /// Every known node except ourselves
    fn peers(&self) -> Vec<String> {
        self.known_nodes
            .lock()
            .iter()
            .filter(|node| **node != self.addr)
            .cloned()
            .collect()
    }

    /// Dial and deliver one message; an unreachable peer is dropped from
    /// the known set.
    async fn send_message(&self, addr: &str, message: &Message) {
        let data = message.to_bytes();
        match TcpStream::connect(addr).await {
            Ok(mut stream) => {
                if let Err(err) = stream.write_all(&data).await {
                    warn!("sending {} to {} failed: {}", message.command(), addr, err);
                }
                let _ = stream.shutdown().await;
            }
            Err(_) => {
                warn!("{} unavailable, dropping from known nodes", addr);
                self.known_nodes.lock().retain(|node| node != addr);
            }
        }
    }

    async fn send_version(&self, addr: &str) {
        let best_height = match self.chain.read().get_best_height() {
            Ok(height) => height,
            Err(err) => {
                error!("reading best height: {}", err);
                return;
            }
        };
        let message = Message::Version(VersionPayload {
            version: PROTOCOL_VERSION,
            best_height,
            addr_from: self.addr.clone(),
        });
        self.send_message(addr, &message).await;
    }

    async fn send_get_blocks(&self, addr: &str) {
        let message = Message::GetBlocks(GetBlocksPayload {
            addr_from: self.addr.clone(),
        });
        self.send_message(addr, &message).await;
    }

    async fn send_get_data(&self, addr: &str, kind: &str, id: Vec<u8>) {
        let message = Message::GetData(GetDataPayload {
            addr_from: self.addr.clone(),
            kind: kind.to_string(),
            id,
        });
        self.send_message(addr, &message).await;
    }

    async fn send_inv(&self, addr: &str, kind: &str, items: Vec<Vec<u8>>) {
        let message = Message::Inv(InvPayload {
            addr_from: self.addr.clone(),
            kind: kind.to_string(),
            items,
        });
        self.send_message(addr, &message).await;
    }

    async fn send_block(&self, addr: &str, block: &Block) {
        let message = Message::Block(BlockPayload {
            addr_from: self.addr.clone(),
            block: block.encode(),
        });
        self.send_message(addr, &message).await;
    }

    async fn send_tx(&self, addr: &str, tx: &Transaction) {
        let message = Message::Tx(TxPayload {
            addr_from: self.addr.clone(),
            transaction: tx.encode(),
        });
        self.send_message(addr, &message).await;
    }
}

/// One-shot transaction submission, used by `send` without `--mine`
pub async fn send_tx_to(addr: &str, tx: &Transaction) -> Result<(), NetworkError> {
    let message = Message::Tx(TxPayload {
        addr_from: String::new(),
        transaction: tx.encode(),
    });
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&message.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
