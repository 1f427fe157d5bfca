//! Stateless per-cycle node checks.

use crate::anomaly::{
    Anomaly,
    UNCONFIRMED_TX_THRESHOLD,
};

pub fn check_unconfirmed_txs(count: u64) -> Option<Anomaly> {
    (count >= UNCONFIRMED_TX_THRESHOLD).then_some(Anomaly::UnconfirmedTxBacklog { count })
}

pub fn check_sync_status(catching_up: bool) -> Option<Anomaly> {
    catching_up.then_some(Anomaly::CatchingUp)
}
