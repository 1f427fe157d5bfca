//! Monitoring findings.
//!
//! Detection code produces [`Anomaly`] values; the orchestrator turns each
//! one into a single alert via its `Display` text.

use std::fmt;

/// Peer count change ratio above which an alert fires.
pub const PEER_DRIFT_THRESHOLD: f64 = 0.2;
/// Voting power change ratio above which an alert fires.
pub const VOTING_POWER_DRIFT_THRESHOLD: f64 = 0.1;
/// Consensus round from which a height counts as struggling.
pub const ROUND_STALL_THRESHOLD: u64 = 2;
/// Mempool size from which the backlog alert fires.
pub const UNCONFIRMED_TX_THRESHOLD: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    /// Latest height did not move since the previous poll.
    Stall { height: u64 },
    /// Latest height went below the last confirmed height.
    HeightRegression { reported: u64, confirmed: u64 },
    Evidence {
        height: u64,
        kind: String,
        /// Implicated addresses, deduplicated.
        validators: Vec<String>,
        /// Subset of `validators` on the watch-list.
        watched: Vec<String>,
    },
    MissingPrecommit { validator: String, height: u64 },
    DuplicatePrecommit {
        validator: String,
        height: u64,
        count: usize,
    },
    MissingFromConsensus { validator: String, height: u64 },
    RoundStall { height: u64, round: u64 },
    PeerDrift {
        previous: usize,
        current: usize,
        interval_hours: f64,
    },
    VotingPowerDrift {
        validator: String,
        previous: i64,
        current: i64,
        interval_hours: f64,
    },
    UnconfirmedTxBacklog { count: u64 },
    CatchingUp,
    /// A resource could not be fetched from the node.
    FetchFailed { resource: String, diagnostic: String },
}

impl Anomaly {
    /// Stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stall { .. } => "stall",
            Self::HeightRegression { .. } => "height_regression",
            Self::Evidence { .. } => "evidence",
            Self::MissingPrecommit { .. } => "missing_precommit",
            Self::DuplicatePrecommit { .. } => "duplicate_precommit",
            Self::MissingFromConsensus { .. } => "missing_from_consensus",
            Self::RoundStall { .. } => "round_stall",
            Self::PeerDrift { .. } => "peer_drift",
            Self::VotingPowerDrift { .. } => "voting_power_drift",
            Self::UnconfirmedTxBacklog { .. } => "unconfirmed_tx_backlog",
            Self::CatchingUp => "catching_up",
            Self::FetchFailed { .. } => "fetch_failed",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stall { height } => write!(f, "The node might be stuck on block {height}."),
            Self::HeightRegression {
                reported,
                confirmed,
            } => {
                write!(
                    f,
                    "The node reported block {reported}, below the last confirmed block {confirmed}."
                )
            }
            Self::Evidence {
                height,
                kind,
                validators,
                watched,
            } => {
                write!(
                    f,
                    "Evidence found in block {height} of type {kind}. The validators involved are: {}.",
                    validators.join(", ")
                )?;
                for address in watched {
                    write!(f, " {address} is of interest.")?;
                }
                Ok(())
            }
            Self::MissingPrecommit { validator, height } => {
                write!(
                    f,
                    "Validator {validator} not found in block {height} last_commit.precommits."
                )
            }
            Self::DuplicatePrecommit {
                validator,
                height,
                count,
            } => {
                write!(
                    f,
                    "Validator {validator} was found more than once in block {height} last_commit.precommits ({count} times)."
                )
            }
            Self::MissingFromConsensus { validator, height } => {
                write!(
                    f,
                    "Validator {validator} not found in consensus state dump round_state.validators at block {height}."
                )
            }
            Self::RoundStall { height, round } => {
                write!(f, "Warning: consensus for block {height} is in round {round}.")
            }
            Self::PeerDrift {
                previous,
                current,
                interval_hours,
            } => {
                write!(
                    f,
                    "The node's number of peers changed more than {:.0}% in the last {interval_hours} hours (from {previous} to {current}).",
                    PEER_DRIFT_THRESHOLD * 100.0
                )
            }
            Self::VotingPowerDrift {
                validator,
                previous,
                current,
                interval_hours,
            } => {
                write!(
                    f,
                    "Validator {validator}'s voting power has changed more than {:.0}% in the last {interval_hours} hours (from {previous} to {current}).",
                    VOTING_POWER_DRIFT_THRESHOLD * 100.0
                )
            }
            Self::UnconfirmedTxBacklog { count } => {
                write!(
                    f,
                    "There are >= {UNCONFIRMED_TX_THRESHOLD} unconfirmed transactions ({count})."
                )
            }
            Self::CatchingUp => write!(f, "The node is currently out of sync and catching up."),
            Self::FetchFailed {
                resource,
                diagnostic,
            } => write!(f, "There was an error fetching {resource}: {diagnostic}"),
        }
    }
}
