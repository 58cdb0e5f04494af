use serde::Serialize;
use thiserror::Error;

/// Why a single block cannot extend a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("block digest does not end in the required number of zeros")]
    InvalidProof,
    #[error("previous_hash does not match the digest of the preceding block")]
    InvalidLinkage,
    #[error("block index does not follow the preceding block")]
    InvalidIndex,
}

/// First violation found while scanning a candidate chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    #[error("chain has no blocks")]
    Empty,
    #[error("block at position {position}: {reason}")]
    Block { position: usize, reason: RejectReason },
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("sender {0:?} is reserved for block rewards")]
    ReservedSender(String),
    #[error("amount must be a finite number")]
    NonFiniteAmount,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("reward address must not be empty")]
    EmptyAddress,
    #[error("difficulty {difficulty} exceeds the digest length of {max} hex characters")]
    DifficultyTooHigh { difficulty: u32, max: usize },
    #[error("mining reward must be a finite number")]
    NonFiniteReward,
}

/// Result of offering a candidate chain to the node.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplaceOutcome {
    Accepted { length: usize },
    RejectedInvalid { violation: ChainViolation },
    RejectedNotLonger { candidate: usize, local: usize },
    Malformed { error: String },
}

impl ReplaceOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReplaceOutcome::Accepted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcomes_serialize_with_a_tag() {
        let accepted = serde_json::to_value(ReplaceOutcome::Accepted { length: 3 }).unwrap();
        assert_eq!(accepted, json!({"outcome": "accepted", "length": 3}));

        let invalid = serde_json::to_value(ReplaceOutcome::RejectedInvalid {
            violation: ChainViolation::Block {
                position: 2,
                reason: RejectReason::InvalidProof,
            },
        })
        .unwrap();
        assert_eq!(
            invalid,
            json!({
                "outcome": "rejected_invalid",
                "violation": {"kind": "block", "position": 2, "reason": "invalid_proof"}
            })
        );
    }

    #[test]
    fn violation_messages() {
        let v = ChainViolation::Block {
            position: 4,
            reason: RejectReason::InvalidLinkage,
        };
        assert_eq!(
            v.to_string(),
            "block at position 4: previous_hash does not match the digest of the preceding block"
        );
        assert!(!ReplaceOutcome::Malformed {
            error: "eof".into()
        }
        .is_accepted());
    }
}
