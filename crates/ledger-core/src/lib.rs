pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;
pub mod node;
pub mod pool;
pub mod wire;

use constants::REWARD_SENDER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use chain::{is_valid_chain, validate_chain, ChainStore};
pub use config::NodeConfig;
pub use error::{ChainViolation, ConfigError, RejectReason, ReplaceOutcome, SubmitError};
pub use node::Node;
pub use pool::TransactionPool;

pub type Hash = [u8; 32];

/// A value transfer recorded in a block. Rewards and user transfers are kept
/// apart in memory; on the wire a reward is a transfer from `"Block reward"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "wire::WireTransaction", into = "wire::WireTransaction")]
pub enum Transaction {
    Reward {
        recipient: String,
        amount: f64,
    },
    Transfer {
        sender: String,
        recipient: String,
        amount: f64,
    },
}

impl Transaction {
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Self {
        Transaction::Reward {
            recipient: recipient.into(),
            amount,
        }
    }

    pub fn transfer(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Transaction::Transfer {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Transaction::Reward { .. } => REWARD_SENDER,
            Transaction::Transfer { sender, .. } => sender,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Transaction::Reward { recipient, .. } | Transaction::Transfer { recipient, .. } => {
                recipient
            }
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Transaction::Reward { amount, .. } | Transaction::Transfer { amount, .. } => *amount,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Transaction::Reward { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    #[serde(deserialize_with = "wire::hex_digest")]
    pub previous_hash: String,
}

impl Block {
    /// Builds a block holding its own copy of `transactions`.
    pub fn new(
        index: u64,
        transactions: &[Transaction],
        proof: u64,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            transactions: transactions.to_vec(),
            proof,
            previous_hash: previous_hash.into(),
        }
    }

    /// Protocol encoding hashed by every node. Field order is index,
    /// transactions, proof, previous_hash.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(128);
        encode_body(&mut bytes, self.index, &self.transactions);
        encode_tail(&mut bytes, self.proof, &self.previous_hash);
        bytes
    }

    pub fn digest(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher.finalize().into()
    }

    /// Lowercase hex digest; this is what `previous_hash` links to.
    pub fn hash(&self) -> String {
        hex::encode(self.digest())
    }
}

/// Everything in the canonical encoding that precedes the proof.
pub(crate) fn encode_body(out: &mut Vec<u8>, index: u64, transactions: &[Transaction]) {
    out.extend_from_slice(&index.to_le_bytes());
    out.extend_from_slice(&(transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        put_str(out, tx.sender());
        put_str(out, tx.recipient());
        out.extend_from_slice(&tx.amount().to_bits().to_le_bytes());
    }
}

pub(crate) fn encode_tail(out: &mut Vec<u8>, proof: u64, previous_hash: &str) {
    out.extend_from_slice(&proof.to_le_bytes());
    put_str(out, previous_hash);
}

pub(crate) fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

pub mod pow {
    use super::{Block, Hash};

    /// True iff the last `difficulty` characters of `hash` are all `'0'`.
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        difficulty <= hash.len() && hash.bytes().rev().take(difficulty).all(|c| c == b'0')
    }

    /// Number of trailing zero hex characters in the rendered digest.
    pub fn trailing_zero_nibbles(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash.iter().rev() {
            if *b == 0 {
                total += 2;
            } else {
                if b & 0x0f == 0 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    /// Mine the block by incrementing the proof from its current value until
    /// the digest ends in `difficulty` zero hex characters.
    pub fn mine_block(mut block: Block, difficulty: u32) -> Block {
        while trailing_zero_nibbles(&block.digest()) < difficulty {
            block.proof = block.proof.wrapping_add(1);
        }
        block
    }
}
