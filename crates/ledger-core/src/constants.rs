pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Wire-level sender of the reward transaction that opens every mined block.
pub const REWARD_SENDER: &str = "Block reward";
/// How many nonces a mining worker tries between polls of its cancellation predicate.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_MINING_REWARD: f64 = 10.0;
