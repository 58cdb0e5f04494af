use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, HASH_HEX_SIZE};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Node settings. Fixed once a `Node` is built from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Recipient of mining rewards.
    pub address: String,
    /// Number of trailing `'0'` hex characters a block digest must have.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> f64 {
    DEFAULT_MINING_REWARD
}

impl NodeConfig {
    pub fn new(address: impl Into<String>, difficulty: u32, mining_reward: f64) -> Self {
        Self {
            address: address.into(),
            difficulty,
            mining_reward,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.difficulty as usize > HASH_HEX_SIZE {
            return Err(ConfigError::DifficultyTooHigh {
                difficulty: self.difficulty,
                max: HASH_HEX_SIZE,
            });
        }
        if !self.mining_reward.is_finite() {
            return Err(ConfigError::NonFiniteReward);
        }
        Ok(())
    }
}
