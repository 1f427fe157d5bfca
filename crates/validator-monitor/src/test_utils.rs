//! Test doubles for the RPC and alert seams.

use crate::{
    alert::AlertSink,
    error::{
        AlertError,
        RpcError,
    },
    rpc::NodeRpc,
    types::{
        Block,
        ConsensusStateSnapshot,
        Vote,
    },
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Mutex,
};

pub(crate) fn block(height: u64, precommits: &[&str]) -> Block {
    Block {
        height,
        evidence: Vec::new(),
        precommits: precommits
            .iter()
            .map(|address| {
                Vote {
                    validator_address: (*address).to_string(),
                }
            })
            .collect(),
    }
}

pub(crate) fn snapshot(
    height: u64,
    round: u64,
    powers: &[(&str, i64)],
    peer_count: usize,
) -> ConsensusStateSnapshot {
    ConsensusStateSnapshot {
        height,
        round,
        voting_powers: powers
            .iter()
            .map(|(address, power)| ((*address).to_string(), *power))
            .collect(),
        peer_count,
    }
}

fn unavailable(endpoint: impl Into<String>) -> RpcError {
    RpcError::Status {
        endpoint: endpoint.into(),
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "scripted failure".to_string(),
    }
}

/// Node whose answers are set up by the test.
///
/// Blocks not registered with [`ScriptedRpc::set_block`] are synthesized
/// with `default_precommits`.
pub(crate) struct ScriptedRpc {
    head: Mutex<Option<u64>>,
    blocks: Mutex<HashMap<u64, Block>>,
    failing_heights: Mutex<HashSet<u64>>,
    default_precommits: Vec<String>,
    snapshot: Mutex<Option<ConsensusStateSnapshot>>,
    hang_consensus_state: Mutex<bool>,
    unconfirmed: Mutex<Option<u64>>,
    catching_up: Mutex<Option<bool>>,
    block_requests: Mutex<Vec<Option<u64>>>,
}

impl ScriptedRpc {
    pub(crate) fn new(default_precommits: &[&str]) -> Self {
        Self {
            head: Mutex::new(None),
            blocks: Mutex::new(HashMap::new()),
            failing_heights: Mutex::new(HashSet::new()),
            default_precommits: default_precommits.iter().map(ToString::to_string).collect(),
            snapshot: Mutex::new(None),
            hang_consensus_state: Mutex::new(false),
            unconfirmed: Mutex::new(Some(0)),
            catching_up: Mutex::new(Some(false)),
            block_requests: Mutex::new(Vec::new()),
        }
    }

    /// `None` makes the latest-block fetch fail.
    pub(crate) fn set_head(&self, height: Option<u64>) {
        *self.head.lock().unwrap() = height;
    }

    pub(crate) fn set_block(&self, block: Block) {
        self.blocks.lock().unwrap().insert(block.height, block);
    }

    pub(crate) fn fail_height(&self, height: u64) {
        self.failing_heights.lock().unwrap().insert(height);
    }

    pub(crate) fn set_snapshot(&self, snapshot: Option<ConsensusStateSnapshot>) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    /// While set, `consensus_state` never completes.
    pub(crate) fn hang_consensus_state(&self, hang: bool) {
        *self.hang_consensus_state.lock().unwrap() = hang;
    }

    pub(crate) fn set_unconfirmed(&self, count: Option<u64>) {
        *self.unconfirmed.lock().unwrap() = count;
    }

    pub(crate) fn set_catching_up(&self, catching_up: Option<bool>) {
        *self.catching_up.lock().unwrap() = catching_up;
    }

    /// Heights requested through [`NodeRpc::block`], `None` for "latest".
    pub(crate) fn block_requests(&self) -> Vec<Option<u64>> {
        self.block_requests.lock().unwrap().clone()
    }

    fn block_at(&self, height: u64) -> Block {
        self.blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_else(|| {
                let precommits: Vec<&str> =
                    self.default_precommits.iter().map(String::as_str).collect();
                block(height, &precommits)
            })
    }
}

#[async_trait]
impl NodeRpc for ScriptedRpc {
    async fn block(&self, height: Option<u64>) -> Result<Block, RpcError> {
        self.block_requests.lock().unwrap().push(height);
        match height {
            None => {
                let head = *self.head.lock().unwrap();
                head.map(|h| self.block_at(h))
                    .ok_or_else(|| unavailable("/block"))
            }
            Some(h) if self.failing_heights.lock().unwrap().contains(&h) => {
                Err(unavailable(format!("/block?height={h}")))
            }
            Some(h) => Ok(self.block_at(h)),
        }
    }

    async fn consensus_state(&self) -> Result<ConsensusStateSnapshot, RpcError> {
        let hang = *self.hang_consensus_state.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("/dump_consensus_state"))
    }

    async fn unconfirmed_tx_count(&self) -> Result<u64, RpcError> {
        self.unconfirmed
            .lock()
            .unwrap()
            .ok_or_else(|| unavailable("/num_unconfirmed_txs"))
    }

    async fn catching_up(&self) -> Result<bool, RpcError> {
        self.catching_up
            .lock()
            .unwrap()
            .ok_or_else(|| unavailable("/status"))
    }
}

/// Sink that keeps every message it is handed.
#[derive(Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<String>>,
    reject: Mutex<bool>,
}

impl RecordingSink {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Record messages but report every delivery as rejected.
    pub(crate) fn reject_all(&self) {
        *self.reject.lock().unwrap() = true;
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        self.messages.lock().unwrap().push(text.to_string());
        if *self.reject.lock().unwrap() {
            return Err(AlertError::Rejected {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "scripted rejection".to_string(),
            });
        }
        Ok(())
    }
}
