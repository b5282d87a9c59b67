use sha2::{Digest, Sha256};

/// Binary Merkle tree. Leaves hash their data, interior nodes hash the
/// concatenation of their children; an odd level duplicates its last node.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    pub root: MerkleNode,
}

#[derive(Debug, Clone)]
pub struct MerkleNode {
    pub left: Option<Box<MerkleNode>>,
    pub right: Option<Box<MerkleNode>>,
    pub data: Vec<u8>,
}

impl MerkleNode {
    fn leaf(data: &[u8]) -> MerkleNode {
        MerkleNode {
            left: None,
            right: None,
            data: Sha256::digest(data).to_vec(),
        }
    }

    fn join(left: MerkleNode, right: MerkleNode) -> MerkleNode {
        let mut hasher = Sha256::new();
        hasher.update(&left.data);
        hasher.update(&right.data);
        MerkleNode {
            data: hasher.finalize().to_vec(),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }
}

impl MerkleTree {
    /// Build a tree over `leaves`. Panics on empty input: every block carries
    /// at least its coinbase, so an empty leaf set is a programming error.
    pub fn new(leaves: &[Vec<u8>]) -> MerkleTree {
        assert!(!leaves.is_empty(), "merkle tree needs at least one leaf");

        let mut nodes: Vec<MerkleNode> = leaves.iter().map(|leaf| MerkleNode::leaf(leaf)).collect();

        while nodes.len() > 1 {
            if nodes.len() % 2 != 0 {
                let last = nodes.last().unwrap().clone();
                nodes.push(last);
            }

            let mut level = Vec::with_capacity(nodes.len() / 2);
            let mut pairs = nodes.into_iter();
            while let (Some(left), Some(right)) = (pairs.next(), pairs.next()) {
                level.push(MerkleNode::join(left, right));
            }
            nodes = level;
        }

        MerkleTree {
            root: nodes.pop().unwrap(),
        }
    }

    pub fn root_hash(&self) -> &[u8] {
        &self.root.data
    }
}
