#![doc = include_str!("../README.md")]
#![allow(clippy::missing_errors_doc)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::unreachable)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![warn(clippy::indexing_slicing)]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::indexing_slicing))]

pub mod alert;
pub mod anomaly;
pub mod auditor;
pub mod checks;
pub mod cli;
pub mod config;
pub mod consensus;
pub mod error;
mod metrics;
pub mod monitor;
pub mod rpc;
pub mod server;
pub mod state;
#[cfg(test)]
mod test_utils;
pub mod tracker;
pub mod types;

pub use alert::{
    AlertSink,
    SharedAlertSink,
    WebhookSink,
};
pub use anomaly::Anomaly;
pub use config::MonitorConfig;
pub use error::{
    AlertError,
    ConfigError,
    MonitorError,
    RpcError,
    ServerError,
};
pub use monitor::{
    CycleReport,
    Monitor,
};
pub use rpc::{
    HttpNodeRpc,
    NodeRpc,
    SharedNodeRpc,
};
pub use server::{
    SharedMonitor,
    TriggerServer,
};
