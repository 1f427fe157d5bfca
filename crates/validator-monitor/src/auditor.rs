//! Per-block validator audit: misbehavior evidence and precommit attendance.

use crate::{
    anomaly::Anomaly,
    state::WatchedValidator,
    types::Block,
};

/// Audit one block against the watch-list.
///
/// Blocks are audited independently of each other.
pub fn audit(block: &Block, watched: &[WatchedValidator]) -> Vec<Anomaly> {
    let mut findings = check_evidence(block, watched);
    findings.extend(check_precommits(block, watched));
    findings
}

fn is_watched(watched: &[WatchedValidator], address: &str) -> bool {
    watched.iter().any(|v| v.address == address)
}

fn check_evidence(block: &Block, watched: &[WatchedValidator]) -> Vec<Anomaly> {
    block
        .evidence
        .iter()
        .map(|evidence| {
            let validators: Vec<String> = evidence
                .implicated()
                .into_iter()
                .map(str::to_string)
                .collect();
            let of_interest = validators
                .iter()
                .filter(|address| is_watched(watched, address))
                .cloned()
                .collect();

            Anomaly::Evidence {
                height: block.height,
                kind: evidence.kind.clone(),
                validators,
                watched: of_interest,
            }
        })
        .collect()
}

fn check_precommits(block: &Block, watched: &[WatchedValidator]) -> Vec<Anomaly> {
    let mut findings = Vec::new();

    for validator in watched {
        let count = block
            .precommits
            .iter()
            .filter(|vote| vote.validator_address == validator.address)
            .count();

        match count {
            0 => {
                findings.push(Anomaly::MissingPrecommit {
                    validator: validator.address.clone(),
                    height: block.height,
                });
            }
            1 => {}
            count => {
                findings.push(Anomaly::DuplicatePrecommit {
                    validator: validator.address.clone(),
                    height: block.height,
                    count,
                });
            }
        }
    }

    findings
}
