//! JSON wire schema shared with peers.
//!
//! ```text
//! { "index": <uint>,
//!   "transactions": [ {"sender": <string>, "recipient": <string>, "amount": <number>}, ... ],
//!   "proof": <uint>,
//!   "previous_hash": <hex string> }
//! ```
//!
//! A chain is a JSON array of blocks, genesis first. Unknown or missing
//! fields are rejected before any block is hashed.

use crate::constants::{HASH_HEX_SIZE, REWARD_SENDER};
use crate::{Block, Transaction};
use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireTransaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl From<WireTransaction> for Transaction {
    fn from(tx: WireTransaction) -> Self {
        if tx.sender == REWARD_SENDER {
            Transaction::Reward {
                recipient: tx.recipient,
                amount: tx.amount,
            }
        } else {
            Transaction::Transfer {
                sender: tx.sender,
                recipient: tx.recipient,
                amount: tx.amount,
            }
        }
    }
}

impl From<Transaction> for WireTransaction {
    fn from(tx: Transaction) -> Self {
        match tx {
            Transaction::Reward { recipient, amount } => WireTransaction {
                sender: REWARD_SENDER.to_string(),
                recipient,
                amount,
            },
            Transaction::Transfer {
                sender,
                recipient,
                amount,
            } => WireTransaction {
                sender,
                recipient,
                amount,
            },
        }
    }
}

/// Lowercase hex, at most one digest long. Genesis links to `"0"`.
pub fn is_hex_digest(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= HASH_HEX_SIZE
        && s.bytes().all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c))
}

pub(crate) fn hex_digest<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if is_hex_digest(&s) {
        Ok(s)
    } else {
        Err(de::Error::custom(format!(
            "previous_hash {s:?} is not a lowercase hex digest"
        )))
    }
}

pub fn parse_chain(raw: &[u8]) -> Result<Vec<Block>, serde_json::Error> {
    serde_json::from_slice(raw)
}

pub fn encode_chain(blocks: &[Block]) -> Result<String, serde_json::Error> {
    serde_json::to_string(blocks)
}
