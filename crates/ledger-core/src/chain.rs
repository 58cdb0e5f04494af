use crate::constants::{GENESIS_INDEX, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainViolation, RejectReason};
use crate::pow::meets_difficulty;
use crate::Block;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Length, tip digest and replacement generation read under one lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tip {
    pub length: usize,
    pub hash: String,
    pub generation: u64,
}

/// The local chain. Never empty; grows by `append` or is swapped wholesale
/// by `replace_if_longer`.
#[derive(Debug)]
pub struct ChainStore {
    blocks: RwLock<Vec<Block>>,
    generation: AtomicU64,
    difficulty: u32,
}

impl ChainStore {
    /// Starts a chain from an already mined genesis block.
    pub fn new(genesis: Block, difficulty: u32) -> Self {
        Self {
            blocks: RwLock::new(vec![genesis]),
            generation: AtomicU64::new(0),
            difficulty,
        }
    }

    /// Adopts an existing chain after checking it end to end.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self, ChainViolation> {
        validate_chain(&blocks, difficulty)?;
        Ok(Self {
            blocks: RwLock::new(blocks),
            generation: AtomicU64::new(0),
            difficulty,
        })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn append(&self, block: Block) -> Result<(), RejectReason> {
        let mut blocks = self.blocks.write();
        let last = &blocks[blocks.len() - 1];
        if let Err(reason) = check_successor(last, &block, blocks.len() + 1, self.difficulty) {
            warn!(index = block.index, %reason, "append rejected");
            return Err(reason);
        }
        debug!(index = block.index, "block appended");
        blocks.push(block);
        Ok(())
    }

    pub fn length(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn last(&self) -> Block {
        let blocks = self.blocks.read();
        blocks[blocks.len() - 1].clone()
    }

    pub fn tip(&self) -> Tip {
        let blocks = self.blocks.read();
        Tip {
            length: blocks.len(),
            hash: blocks[blocks.len() - 1].hash(),
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Bumped on every wholesale replacement; in-flight searches watch it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Swaps in `candidate` if it is strictly longer than the local chain.
    /// The caller is expected to have validated it. Returns the new length,
    /// or the unchanged local length when the candidate is not longer.
    pub fn replace_if_longer(&self, candidate: Vec<Block>) -> Result<usize, usize> {
        let mut blocks = self.blocks.write();
        let local = blocks.len();
        if candidate.len() <= local {
            return Err(local);
        }
        *blocks = candidate;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!(from = local, to = blocks.len(), "chain replaced");
        Ok(blocks.len())
    }
}

/// Checks that `block` may sit directly after `prev` at 1-based height
/// `expected_index`.
fn check_successor(
    prev: &Block,
    block: &Block,
    expected_index: usize,
    difficulty: u32,
) -> Result<(), RejectReason> {
    if !meets_difficulty(&block.hash(), difficulty) {
        return Err(RejectReason::InvalidProof);
    }
    if block.previous_hash != prev.hash() {
        return Err(RejectReason::InvalidLinkage);
    }
    if block.index != expected_index as u64 {
        return Err(RejectReason::InvalidIndex);
    }
    Ok(())
}

/// Genesis has no predecessor: it must sit at index 1, link to `"0"` and
/// still meet the difficulty.
fn check_genesis(genesis: &Block, difficulty: u32) -> Result<(), RejectReason> {
    if !meets_difficulty(&genesis.hash(), difficulty) {
        return Err(RejectReason::InvalidProof);
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(RejectReason::InvalidLinkage);
    }
    if genesis.index != GENESIS_INDEX {
        return Err(RejectReason::InvalidIndex);
    }
    Ok(())
}

/// Single forward pass over `blocks`, stopping at the first bad block.
pub fn validate_chain(blocks: &[Block], difficulty: u32) -> Result<(), ChainViolation> {
    let Some(genesis) = blocks.first() else {
        return Err(ChainViolation::Empty);
    };
    check_genesis(genesis, difficulty)
        .map_err(|reason| ChainViolation::Block { position: 0, reason })?;
    for (i, pair) in blocks.windows(2).enumerate() {
        let position = i + 1;
        check_successor(&pair[0], &pair[1], position + 1, difficulty)
            .map_err(|reason| ChainViolation::Block { position, reason })?;
    }
    Ok(())
}

pub fn is_valid_chain(blocks: &[Block], difficulty: u32) -> bool {
    validate_chain(blocks, difficulty).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::mine_block;
    use crate::{mine::genesis_block, Transaction};

    const DIFFICULTY: u32 = 2;

    fn next_block(prev: &Block, txs: &[Transaction]) -> Block {
        mine_block(Block::new(prev.index + 1, txs, 0, prev.hash()), DIFFICULTY)
    }

    fn build_chain(len: usize) -> Vec<Block> {
        let mut blocks = vec![genesis_block(DIFFICULTY)];
        while blocks.len() < len {
            let txs = [Transaction::transfer("alice", "bob", blocks.len() as f64)];
            let block = next_block(&blocks[blocks.len() - 1], &txs);
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn append_accepts_a_proper_successor() {
        let store = ChainStore::new(genesis_block(DIFFICULTY), DIFFICULTY);
        let block = next_block(&store.last(), &[]);
        assert_eq!(store.append(block.clone()), Ok(()));
        assert_eq!(store.length(), 2);
        assert_eq!(store.last(), block);
    }

    #[test]
    fn append_rejects_bad_proof() {
        let store = ChainStore::new(genesis_block(DIFFICULTY), DIFFICULTY);
        let mut block = Block::new(2, &[], 0, store.last().hash());
        while meets_difficulty(&block.hash(), DIFFICULTY) {
            block.proof += 1;
        }
        assert_eq!(store.append(block), Err(RejectReason::InvalidProof));
        assert_eq!(store.length(), 1);
    }

    #[test]
    fn append_rejects_bad_linkage() {
        let store = ChainStore::new(genesis_block(DIFFICULTY), DIFFICULTY);
        let block = mine_block(Block::new(2, &[], 0, "ab".repeat(32)), DIFFICULTY);
        assert_eq!(store.append(block), Err(RejectReason::InvalidLinkage));
        assert_eq!(store.length(), 1);
    }

    #[test]
    fn append_rejects_bad_index() {
        let store = ChainStore::new(genesis_block(DIFFICULTY), DIFFICULTY);
        let block = mine_block(Block::new(7, &[], 0, store.last().hash()), DIFFICULTY);
        assert_eq!(store.append(block), Err(RejectReason::InvalidIndex));
    }

    #[test]
    fn tip_reports_length_and_hash() {
        let blocks = build_chain(3);
        let store = ChainStore::from_blocks(blocks.clone(), DIFFICULTY).unwrap();
        let tip = store.tip();
        assert_eq!(tip.length, 3);
        assert_eq!(tip.hash, blocks[2].hash());
        assert_eq!(tip.generation, 0);
    }

    #[test]
    fn validate_accepts_every_prefix() {
        let blocks = build_chain(5);
        for len in 1..=blocks.len() {
            assert_eq!(validate_chain(&blocks[..len], DIFFICULTY), Ok(()));
        }
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_chain(&[], DIFFICULTY), Err(ChainViolation::Empty));
        assert!(!is_valid_chain(&[], DIFFICULTY));
    }

    #[test]
    fn single_genesis_is_valid() {
        assert!(is_valid_chain(&[genesis_block(DIFFICULTY)], DIFFICULTY));
    }

    #[test]
    fn validate_checks_genesis() {
        let good = genesis_block(DIFFICULTY);

        let mut unmined = good.clone();
        while meets_difficulty(&unmined.hash(), DIFFICULTY) {
            unmined.proof += 1;
        }
        let relinked = mine_block(Block::new(1, &[], 0, "ab"), DIFFICULTY);
        let renumbered = mine_block(Block::new(42, &[], 0, "0"), DIFFICULTY);

        for (genesis, reason) in [
            (unmined, RejectReason::InvalidProof),
            (relinked, RejectReason::InvalidLinkage),
            (renumbered, RejectReason::InvalidIndex),
        ] {
            assert_eq!(
                validate_chain(&[genesis], DIFFICULTY),
                Err(ChainViolation::Block {
                    position: 0,
                    reason
                })
            );
        }
    }

    #[test]
    fn validate_reports_first_broken_link() {
        let mut blocks = build_chain(4);
        blocks[2].previous_hash = "0".repeat(64);
        assert_eq!(
            validate_chain(&blocks, DIFFICULTY),
            Err(ChainViolation::Block {
                position: 2,
                reason: RejectReason::InvalidLinkage
            })
        );
    }

    #[test]
    fn validate_reports_misnumbered_block() {
        let genesis = genesis_block(DIFFICULTY);
        let second = mine_block(Block::new(3, &[], 0, genesis.hash()), DIFFICULTY);
        assert_eq!(
            validate_chain(&[genesis, second], DIFFICULTY),
            Err(ChainViolation::Block {
                position: 1,
                reason: RejectReason::InvalidIndex
            })
        );
    }

    #[test]
    fn replace_requires_strictly_longer() {
        let store = ChainStore::from_blocks(build_chain(2), DIFFICULTY).unwrap();
        assert_eq!(store.replace_if_longer(build_chain(2)), Err(2));
        assert_eq!(store.generation(), 0);

        let longer = build_chain(3);
        assert_eq!(store.replace_if_longer(longer.clone()), Ok(3));
        assert_eq!(store.blocks(), longer);
        assert_eq!(store.generation(), 1);
    }
}
