//! Consensus-state analysis.
//!
//! Two kinds of checks run against every round-state dump:
//!
//! - point-in-time checks (watched validator absent from the validator set,
//!   consensus stuck in a late round), evaluated on every call;
//! - drift checks (peer count, voting power), evaluated at most once per
//!   averaging interval against the values recorded at the previous interval
//!   boundary.
//!
//! The first call only records the interval baseline timestamp. The first
//! boundary after that records peer count and voting powers without
//! comparing, so drift is first reported two intervals after startup.

use crate::{
    anomaly::{
        Anomaly,
        PEER_DRIFT_THRESHOLD,
        ROUND_STALL_THRESHOLD,
        VOTING_POWER_DRIFT_THRESHOLD,
    },
    config::averaging_interval,
    error::ConfigError,
    state::{
        MonitorState,
        WatchedValidator,
    },
    types::ConsensusStateSnapshot,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ConsensusStateAnalyzer {
    interval: Duration,
    interval_hours: f64,
}

impl ConsensusStateAnalyzer {
    /// Fails unless `interval_hours` is positive and fits in a [`Duration`].
    pub fn new(interval_hours: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            interval: averaging_interval(interval_hours)?,
            interval_hours,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn analyze(
        &self,
        state: &mut MonitorState,
        watched: &mut [WatchedValidator],
        snapshot: &ConsensusStateSnapshot,
        now: Instant,
    ) -> Vec<Anomaly> {
        let mut findings = Vec::new();

        for validator in watched.iter() {
            if !snapshot.voting_powers.contains_key(&validator.address) {
                findings.push(Anomaly::MissingFromConsensus {
                    validator: validator.address.clone(),
                    height: snapshot.height,
                });
            }
        }

        if snapshot.round >= ROUND_STALL_THRESHOLD {
            findings.push(Anomaly::RoundStall {
                height: snapshot.height,
                round: snapshot.round,
            });
        }

        let Some(baseline) = state.last_interval_check else {
            debug!("recording first interval baseline");
            state.last_interval_check = Some(now);
            return findings;
        };

        if now.saturating_duration_since(baseline) <= self.interval {
            return findings;
        }

        debug!(
            peers = snapshot.peer_count,
            height = snapshot.height,
            "averaging interval elapsed, comparing against previous baseline"
        );

        if let Some(previous) = state.last_peer_count {
            let (prev, cur) = (previous as f64, snapshot.peer_count as f64);
            if ratio_exceeds(prev, cur, prev, PEER_DRIFT_THRESHOLD) {
                findings.push(Anomaly::PeerDrift {
                    previous,
                    current: snapshot.peer_count,
                    interval_hours: self.interval_hours,
                });
            }
        }
        state.last_peer_count = Some(snapshot.peer_count);

        for validator in watched.iter_mut() {
            let Some(&current) = snapshot.voting_powers.get(&validator.address) else {
                continue;
            };
            if let Some(previous) = validator.last_voting_power {
                if voting_power_drifted(previous, current) {
                    findings.push(Anomaly::VotingPowerDrift {
                        validator: validator.address.clone(),
                        previous,
                        current,
                        interval_hours: self.interval_hours,
                    });
                }
            }
            validator.last_voting_power = Some(current);
        }

        state.last_interval_check = Some(now);
        findings
    }
}

/// `|previous - current| / base > threshold`, false when `base` is zero.
fn ratio_exceeds(previous: f64, current: f64, base: f64, threshold: f64) -> bool {
    if base == 0.0 {
        return false;
    }
    (previous - current).abs() / base.abs() > threshold
}

/// Voting power change measured relative to the new value. A recorded
/// power of zero counts as no prior value.
fn voting_power_drifted(previous: i64, current: i64) -> bool {
    if previous == 0 {
        return false;
    }
    if current == 0 {
        return true;
    }
    ratio_exceeds(
        previous as f64,
        current as f64,
        current as f64,
        VOTING_POWER_DRIFT_THRESHOLD,
    )
}
