use crate::chain::{validate_chain, ChainStore};
use crate::config::NodeConfig;
use crate::constants::REWARD_SENDER;
use crate::error::{ConfigError, ReplaceOutcome, SubmitError};
use crate::mine::{self, genesis_block, Template};
use crate::pool::{Taken, TransactionPool};
use crate::{wire, Block, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// One participant's view of the ledger: its pending pool and its chain.
///
/// All methods take `&self`; share a node across threads with `Arc<Node>`.
/// Mining, submission and chain replacement may run concurrently.
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    pool: TransactionPool,
    chain: ChainStore,
}

impl Node {
    /// Validates `config` and mines the genesis block.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let chain = ChainStore::new(genesis_block(config.difficulty), config.difficulty);
        info!(
            address = %config.address,
            difficulty = config.difficulty,
            reward = config.mining_reward,
            "node ready"
        );
        Ok(Self {
            config,
            pool: TransactionPool::new(),
            chain,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainStore {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    /// Queues a transfer for the next block. Balances are not tracked, so any
    /// sender and any finite amount is accepted, except the reward sender.
    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<(), SubmitError> {
        let sender = sender.into();
        if sender == REWARD_SENDER {
            return Err(SubmitError::ReservedSender(sender));
        }
        if !amount.is_finite() {
            return Err(SubmitError::NonFiniteAmount);
        }
        self.pool.add(sender, recipient, amount);
        Ok(())
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.snapshot()
    }

    pub fn length(&self) -> usize {
        self.chain.length()
    }

    pub fn last_block(&self) -> Block {
        self.chain.last()
    }

    pub fn next_index(&self) -> u64 {
        self.chain.length() as u64 + 1
    }

    /// Mines the pending transactions, behind a reward to the configured
    /// address, into the next block and appends it.
    pub fn mine(&self) -> Block {
        let never = AtomicBool::new(false);
        loop {
            if let Some(block) = self.mine_cancellable(&never) {
                return block;
            }
        }
    }

    /// Like [`Node::mine`], but gives up and returns `None` once `stop` is
    /// raised. A chain replacement while searching restarts the search
    /// against the new tip.
    pub fn mine_cancellable(&self, stop: &AtomicBool) -> Option<Block> {
        loop {
            if stop.load(Ordering::Relaxed) {
                info!("mining stopped");
                return None;
            }
            let (template, taken, generation) = self.prepare();
            let cancelled =
                || stop.load(Ordering::Relaxed) || self.chain.generation() != generation;

            let Some(proof) = mine::search(&template, self.config.difficulty, cancelled) else {
                debug!(index = template.index, "search interrupted");
                continue;
            };

            let block = template.into_block(proof);
            match self.pool.commit(taken, || self.chain.append(block.clone())) {
                Ok(()) => {
                    info!(
                        index = block.index,
                        proof = block.proof,
                        txs = block.transactions.len(),
                        hash = %block.hash(),
                        "block mined"
                    );
                    return Some(block);
                }
                Err(reason) => {
                    debug!(index = block.index, %reason, "mined block is stale, restarting");
                }
            }
        }
    }

    /// Reads the pool and the chain tip together so that the block being
    /// mined never repeats transactions already committed on that tip.
    fn prepare(&self) -> (Template, Taken, u64) {
        let ((template, generation), taken) = self.pool.snapshot_with(|pending| {
            let tip = self.chain.tip();
            let mut transactions = Vec::with_capacity(pending.len() + 1);
            transactions.push(Transaction::reward(
                self.config.address.clone(),
                self.config.mining_reward,
            ));
            transactions.extend_from_slice(pending);
            let template = Template {
                index: tip.length as u64 + 1,
                transactions,
                previous_hash: tip.hash,
            };
            (template, tip.generation)
        });
        (template, taken, generation)
    }

    pub fn export_chain(&self) -> Vec<Block> {
        self.chain.blocks()
    }

    pub fn export_chain_json(&self) -> Result<String, serde_json::Error> {
        wire::encode_chain(&self.chain.blocks())
    }

    /// Offers a raw JSON chain from a peer.
    pub fn receive_chain(&self, raw: &[u8]) -> ReplaceOutcome {
        match wire::parse_chain(raw) {
            Ok(candidate) => self.receive_blocks(candidate),
            Err(err) => {
                warn!(%err, "malformed candidate chain");
                ReplaceOutcome::Malformed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Longest valid chain wins; ties keep the local chain.
    pub fn receive_blocks(&self, candidate: Vec<Block>) -> ReplaceOutcome {
        if let Err(violation) = validate_chain(&candidate, self.config.difficulty) {
            warn!(%violation, "invalid candidate chain");
            return ReplaceOutcome::RejectedInvalid { violation };
        }
        let candidate_len = candidate.len();
        match self.chain.replace_if_longer(candidate) {
            Ok(length) => ReplaceOutcome::Accepted { length },
            Err(local) => {
                debug!(candidate = candidate_len, local, "candidate chain not longer");
                ReplaceOutcome::RejectedNotLonger {
                    candidate: candidate_len,
                    local,
                }
            }
        }
    }
}
