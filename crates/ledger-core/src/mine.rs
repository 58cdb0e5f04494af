use crate::constants::{CANCEL_CHECK_INTERVAL, GENESIS_INDEX, GENESIS_PREVIOUS_HASH};
use crate::{encode_body, pow, put_str, Block, Hash, Transaction};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Everything about the next block except its proof.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
}

impl Template {
    pub fn into_block(self, proof: u64) -> Block {
        Block {
            index: self.index,
            transactions: self.transactions,
            proof,
            previous_hash: self.previous_hash,
        }
    }
}

/// The first block of every chain: no transactions, linked to `"0"`, with the
/// smallest proof that meets `difficulty`. Nodes sharing a difficulty
/// therefore share a genesis block.
pub fn genesis_block(difficulty: u32) -> Block {
    let genesis = pow::mine_block(
        Block::new(GENESIS_INDEX, &[], 0, GENESIS_PREVIOUS_HASH),
        difficulty,
    );
    info!(proof = genesis.proof, hash = %genesis.hash(), "genesis mined");
    genesis
}

/// Searches proofs in parallel until a digest for `template` ends in at least
/// `difficulty` zero hex characters.
///
/// Workers poll `cancelled` every `CANCEL_CHECK_INTERVAL` proofs; once it
/// returns true the search winds down and `None` is returned. The winning
/// proof is whichever worker finds one first, not necessarily the smallest.
pub fn search<F>(template: &Template, difficulty: u32, cancelled: F) -> Option<u64>
where
    F: Fn() -> bool + Sync,
{
    // The bytes before and after the proof never change between attempts, so
    // hash the body once and clone the hasher state per proof.
    let mut body = Vec::with_capacity(128);
    encode_body(&mut body, template.index, &template.transactions);
    let mut prefix = Sha256::new();
    prefix.update(&body);
    let mut link = Vec::with_capacity(8 + template.previous_hash.len());
    put_str(&mut link, &template.previous_hash);

    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_map_any(|proof| {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                return Some(None);
            }
            let mut hasher = prefix.clone();
            hasher.update(proof.to_le_bytes());
            hasher.update(&link);
            let digest: Hash = hasher.finalize().into();
            (pow::trailing_zero_nibbles(&digest) >= difficulty).then_some(Some(proof))
        })
        .flatten();

    match found {
        Some(proof) => debug!(index = template.index, proof, "proof found"),
        None => debug!(index = template.index, "search cancelled"),
    }
    found
}
