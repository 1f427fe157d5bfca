//! Block-sequence tracking.
//!
//! Each poll reconciles the node's latest height against the last height the
//! monitor confirmed. Blocks observed along the way are pushed into the
//! state's block buffer so the auditor can inspect every height exactly once,
//! including heights produced between two polls.
//!
//! | latest vs. confirmed | outcome                                         |
//! |----------------------|-------------------------------------------------|
//! | no confirmed height  | adopt latest, buffer it                         |
//! | `confirmed + 1`      | adopt latest, buffer it                         |
//! | `confirmed`          | [`Anomaly::Stall`], nothing buffered            |
//! | `> confirmed + 1`    | backfill the gap, buffer it all, adopt latest   |
//! | `< confirmed`        | [`Anomaly::HeightRegression`], nothing buffered |

use crate::{
    anomaly::Anomaly,
    error::RpcError,
    rpc::NodeRpc,
    state::MonitorState,
    types::Block,
};
use std::ops::Range;
use tracing::{
    debug,
    info,
    warn,
};

/// Advance the confirmed height to the node's latest block.
///
/// Findings are appended to `findings`. A failure fetching the latest block
/// is recorded as [`Anomaly::FetchFailed`] and then returned, which aborts
/// the cycle. A failure fetching a single backfill height is recorded and
/// skipped.
///
/// Returns the latest height reported by the node.
pub async fn advance(
    state: &mut MonitorState,
    rpc: &dyn NodeRpc,
    findings: &mut Vec<Anomaly>,
) -> Result<u64, RpcError> {
    let latest = match rpc.block(None).await {
        Ok(block) => block,
        Err(err) => {
            warn!(error = %err, "failed to fetch the most recent block");
            findings.push(Anomaly::FetchFailed {
                resource: "the most recent block".to_string(),
                diagnostic: err.diagnostic(),
            });
            return Err(err);
        }
    };
    let latest_height = latest.height;

    let Some(confirmed) = state.last_confirmed_height else {
        info!(height = latest_height, "adopting first observed height");
        adopt(state, latest);
        return Ok(latest_height);
    };

    if latest_height == confirmed {
        warn!(height = latest_height, "no height progress since last poll");
        findings.push(Anomaly::Stall {
            height: latest_height,
        });
        return Ok(latest_height);
    }

    if latest_height < confirmed {
        warn!(
            reported = latest_height,
            confirmed, "node reported a height below the confirmed height"
        );
        findings.push(Anomaly::HeightRegression {
            reported: latest_height,
            confirmed,
        });
        return Ok(latest_height);
    }

    let gap = missing_heights(confirmed, latest_height);
    if !gap.is_empty() {
        debug!(from = gap.start, to = gap.end - 1, "backfilling missed heights");
        let backfilled = fetch_heights(rpc, gap, findings).await;
        state.block_buffer.extend(backfilled);
    }

    adopt(state, latest);
    Ok(latest_height)
}

fn adopt(state: &mut MonitorState, block: Block) {
    state.last_confirmed_height = Some(block.height);
    state.block_buffer.push(block);
}

/// Heights strictly between `confirmed` and `latest`.
pub fn missing_heights(confirmed: u64, latest: u64) -> Range<u64> {
    confirmed.saturating_add(1)..latest.max(confirmed.saturating_add(1))
}

/// Fetch every height in `heights` one at a time, in ascending order.
///
/// Each fetch fails independently: a failed height is reported and left out
/// of the result, and the remaining heights are still fetched.
async fn fetch_heights(
    rpc: &dyn NodeRpc,
    heights: Range<u64>,
    findings: &mut Vec<Anomaly>,
) -> Vec<Block> {
    let expected = usize::try_from(heights.end.saturating_sub(heights.start)).unwrap_or(0);
    let mut blocks = Vec::with_capacity(expected);

    for height in heights {
        match rpc.block(Some(height)).await {
            Ok(block) => blocks.push(block),
            Err(err) => {
                warn!(height, error = %err, "failed to backfill block, skipping");
                findings.push(Anomaly::FetchFailed {
                    resource: format!("block {height}"),
                    diagnostic: err.diagnostic(),
                });
            }
        }
    }

    blocks
}
