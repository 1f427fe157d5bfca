//! Node RPC payloads and the domain values the monitor works on.
//!
//! The node encodes heights, rounds and voting powers as JSON strings, and
//! the block layout differs between node versions (`block_meta` was dropped,
//! `precommits` became `signatures`). The `Raw*` types absorb those
//! differences; everything past [`crate::rpc`] only sees the domain types.

use crate::error::RpcError;
use serde::{
    Deserialize,
    Deserializer,
};
use std::{
    collections::HashMap,
    str::FromStr,
};

/// A block as seen by the auditor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub evidence: Vec<Evidence>,
    pub precommits: Vec<Vote>,
}

/// A misbehavior record embedded in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub kind: String,
    pub voter_a: String,
    pub voter_b: String,
}

impl Evidence {
    /// The implicated validator addresses. Empty addresses are dropped, and
    /// `voter_b` is dropped when it names the same validator as `voter_a`.
    pub fn implicated(&self) -> Vec<&str> {
        let mut addresses = Vec::with_capacity(2);
        for address in [self.voter_a.as_str(), self.voter_b.as_str()] {
            if !address.is_empty() && !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        addresses
    }
}

/// A precommit contributed to a block's last commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub validator_address: String,
}

/// Round-state dump taken during the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusStateSnapshot {
    pub height: u64,
    pub round: u64,
    pub voting_powers: HashMap<String, i64>,
    pub peer_count: usize,
}

/// Integer transported either as a JSON string or as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNumber(pub String);

impl<'de> Deserialize<'de> for RawNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(i64),
            UInt(u64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Str(s) => Self(s),
            Repr::Int(n) => Self(n.to_string()),
            Repr::UInt(n) => Self(n.to_string()),
        })
    }
}

impl RawNumber {
    pub(crate) fn parse<T: FromStr>(
        &self,
        endpoint: &str,
        field: &'static str,
    ) -> Result<T, RpcError> {
        self.0.trim().parse().map_err(|_| {
            RpcError::InvalidField {
                endpoint: endpoint.to_string(),
                field,
                value: self.0.clone(),
                body: String::new(),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHeader {
    pub height: RawNumber,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBlockMeta {
    pub header: RawHeader,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawVoteRef {
    #[serde(default)]
    pub validator_address: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvidenceValue {
    #[serde(rename = "VoteA", alias = "vote_a", default)]
    pub vote_a: RawVoteRef,
    #[serde(rename = "VoteB", alias = "vote_b", default)]
    pub vote_b: RawVoteRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvidence {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: RawEvidenceValue,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEvidenceList {
    #[serde(default)]
    pub evidence: Option<Vec<RawEvidence>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCommit {
    #[serde(default)]
    pub precommits: Option<Vec<Option<RawVoteRef>>>,
    #[serde(default)]
    pub signatures: Option<Vec<Option<RawVoteRef>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBlock {
    #[serde(default)]
    pub header: Option<RawHeader>,
    #[serde(default)]
    pub evidence: Option<RawEvidenceList>,
    #[serde(default)]
    pub last_commit: Option<RawCommit>,
}

/// `result` of `GET /block`.
#[derive(Debug, Deserialize)]
pub(crate) struct BlockResult {
    #[serde(default)]
    pub block_meta: Option<RawBlockMeta>,
    pub block: RawBlock,
}

impl BlockResult {
    pub(crate) fn into_block(self, endpoint: &str) -> Result<Block, RpcError> {
        let header = self
            .block_meta
            .map(|meta| meta.header)
            .or(self.block.header)
            .ok_or_else(|| {
                RpcError::InvalidField {
                    endpoint: endpoint.to_string(),
                    field: "height",
                    value: String::new(),
                    body: String::new(),
                }
            })?;
        let height = header.height.parse(endpoint, "height")?;

        let evidence = self
            .block
            .evidence
            .and_then(|list| list.evidence)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                Evidence {
                    kind: raw.kind,
                    voter_a: raw.value.vote_a.validator_address,
                    voter_b: raw.value.vote_b.validator_address,
                }
            })
            .collect();

        let commit = self.block.last_commit.unwrap_or_default();
        let precommits = commit
            .precommits
            .or(commit.signatures)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter(|vote| !vote.validator_address.is_empty())
            .map(|vote| {
                Vote {
                    validator_address: vote.validator_address,
                }
            })
            .collect();

        Ok(Block {
            height,
            evidence,
            precommits,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawValidator {
    pub address: String,
    pub voting_power: RawNumber,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawValidatorSet {
    #[serde(default)]
    pub validators: Vec<RawValidator>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRoundState {
    pub height: RawNumber,
    pub round: RawNumber,
    #[serde(default)]
    pub validators: RawValidatorSet,
}

/// `result` of `GET /dump_consensus_state`.
#[derive(Debug, Deserialize)]
pub(crate) struct ConsensusStateResult {
    pub round_state: RawRoundState,
    #[serde(default)]
    pub peers: Vec<serde_json::Value>,
}

impl ConsensusStateResult {
    pub(crate) fn into_snapshot(self, endpoint: &str) -> Result<ConsensusStateSnapshot, RpcError> {
        let height = self.round_state.height.parse(endpoint, "round_state.height")?;
        let round = self.round_state.round.parse(endpoint, "round_state.round")?;

        let mut voting_powers = HashMap::with_capacity(self.round_state.validators.validators.len());
        for validator in self.round_state.validators.validators {
            let power = validator.voting_power.parse(endpoint, "voting_power")?;
            voting_powers.insert(validator.address, power);
        }

        Ok(ConsensusStateSnapshot {
            height,
            round,
            voting_powers,
            peer_count: self.peers.len(),
        })
    }
}

/// `result` of `GET /num_unconfirmed_txs`.
#[derive(Debug, Deserialize)]
pub(crate) struct UnconfirmedTxsResult {
    pub total: RawNumber,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncInfo {
    pub catching_up: bool,
}

/// `result` of `GET /status`.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResult {
    pub sync_info: SyncInfo,
}
