//! Process-scoped monitor state.

use crate::types::Block;
use tokio::time::Instant;

/// A validator on the watch-list. Built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedValidator {
    pub address: String,
    /// Voting power recorded at the last interval boundary.
    pub last_voting_power: Option<i64>,
}

impl WatchedValidator {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            last_voting_power: None,
        }
    }
}

/// Everything the monitor carries from one cycle to the next.
#[derive(Debug, Default)]
pub struct MonitorState {
    /// Only ever moves forward.
    pub(crate) last_confirmed_height: Option<u64>,
    /// Blocks observed this cycle, awaiting audit. Emptied at cycle end.
    pub(crate) block_buffer: Vec<Block>,
    pub(crate) last_interval_check: Option<Instant>,
    pub(crate) last_peer_count: Option<usize>,
}

impl MonitorState {
    pub fn last_confirmed_height(&self) -> Option<u64> {
        self.last_confirmed_height
    }

    pub fn buffered_blocks(&self) -> &[Block] {
        &self.block_buffer
    }

    pub fn last_peer_count(&self) -> Option<usize> {
        self.last_peer_count
    }

    pub fn last_interval_check(&self) -> Option<Instant> {
        self.last_interval_check
    }
}
