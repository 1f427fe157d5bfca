//! Metrics for the validator monitor.
//!
//! ## Metrics recorded
//!
//! ### Gauges
//! - `validator_monitor_last_confirmed_height`: Last height the monitor confirmed
//!
//! ### Counters
//! - `validator_monitor_cycles_total`: Completed monitor cycles
//! - `validator_monitor_cycle_failures_total`: Cycles aborted by a fetch failure
//! - `validator_monitor_blocks_audited_total`: Blocks run through the validator audit
//! - `validator_monitor_anomalies_total{kind}`: Findings, labelled by anomaly kind
//! - `validator_monitor_alerts_sent_total`: Alerts accepted by the sink
//! - `validator_monitor_alert_delivery_failures_total`: Alerts the sink rejected

#![allow(clippy::cast_precision_loss)]

use metrics::{
    counter,
    gauge,
};

pub fn record_cycle(last_confirmed_height: Option<u64>) {
    counter!("validator_monitor_cycles_total").increment(1);
    if let Some(height) = last_confirmed_height {
        gauge!("validator_monitor_last_confirmed_height").set(height as f64);
    }
}

pub fn record_cycle_failure() {
    counter!("validator_monitor_cycle_failures_total").increment(1);
}

pub fn record_blocks_audited(count: usize) {
    counter!("validator_monitor_blocks_audited_total").increment(count as u64);
}

pub fn record_anomaly(kind: &'static str) {
    counter!("validator_monitor_anomalies_total", "kind" => kind).increment(1);
}

pub fn record_alert_sent() {
    counter!("validator_monitor_alerts_sent_total").increment(1);
}

pub fn record_alert_failure() {
    counter!("validator_monitor_alert_delivery_failures_total").increment(1);
}
