//! One polling pass over the node.
//!
//! [`Monitor::run_cycle`] runs the detection components in a fixed order:
//!
//! 1. advance the block tracker (backfilling any gap),
//! 2. audit every buffered block against the watch-list,
//! 3. analyze a fresh consensus-state dump,
//! 4. check the unconfirmed transaction backlog,
//! 5. check the sync status.
//!
//! Each finding is sent to the alert sink as soon as its step completes.
//! A fetch failure is alerted with the node's raw response, aborts the
//! remaining steps, and is followed by a diagnostic alert naming the last
//! confirmed height. The block buffer is emptied at the start and end of
//! every cycle, so blocks left behind by a cycle that was dropped mid-flight
//! are never audited twice.
//!
//! `Monitor` expects cycles to be serialized by its caller; see
//! [`crate::server::SharedMonitor`].

use crate::{
    alert::SharedAlertSink,
    anomaly::Anomaly,
    auditor,
    checks,
    consensus::ConsensusStateAnalyzer,
    error::{
        ConfigError,
        MonitorError,
        RpcError,
    },
    metrics,
    rpc::SharedNodeRpc,
    state::{
        MonitorState,
        WatchedValidator,
    },
    tracker,
};
use std::future::Future;
use tokio::time::Instant;
use tracing::{
    error,
    info,
    instrument,
    warn,
};

/// Summary of a completed cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Latest height the node reported.
    pub latest_height: u64,
    pub blocks_audited: usize,
    /// Every finding, in dispatch order.
    pub anomalies: Vec<Anomaly>,
    /// Findings the sink failed to deliver.
    pub undelivered: usize,
}

pub struct Monitor {
    rpc: SharedNodeRpc,
    alerts: SharedAlertSink,
    analyzer: ConsensusStateAnalyzer,
    validators: Vec<WatchedValidator>,
    state: MonitorState,
}

impl Monitor {
    pub fn new<I, S>(
        rpc: SharedNodeRpc,
        alerts: SharedAlertSink,
        validators: I,
        average_interval_hours: f64,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            rpc,
            alerts,
            analyzer: ConsensusStateAnalyzer::new(average_interval_hours)?,
            validators: validators.into_iter().map(WatchedValidator::new).collect(),
            state: MonitorState::default(),
        })
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn validators(&self) -> &[WatchedValidator] {
        &self.validators
    }

    #[instrument(name = "monitor::run_cycle", skip(self), level = "debug")]
    pub async fn run_cycle(&mut self) -> Result<CycleReport, MonitorError> {
        self.state.block_buffer.clear();
        let result = self.run_checks().await;
        self.state.block_buffer.clear();

        match result {
            Ok(report) => {
                metrics::record_cycle(self.state.last_confirmed_height);
                info!(
                    latest_height = report.latest_height,
                    confirmed_height = ?self.state.last_confirmed_height,
                    blocks_audited = report.blocks_audited,
                    anomalies = report.anomalies.len(),
                    "monitor cycle complete"
                );
                Ok(report)
            }
            Err(err) => {
                metrics::record_cycle_failure();
                error!(
                    error = %err,
                    confirmed_height = ?self.state.last_confirmed_height,
                    "monitor cycle failed"
                );
                let height = self
                    .state
                    .last_confirmed_height
                    .map_or_else(|| "unknown".to_string(), |h| h.to_string());
                self.send(&format!(
                    "Debug message: the monitor had an error around block {height}."
                ))
                .await;
                Err(err)
            }
        }
    }

    async fn run_checks(&mut self) -> Result<CycleReport, MonitorError> {
        let mut report = CycleReport::default();

        let mut findings = Vec::new();
        let advanced = tracker::advance(&mut self.state, self.rpc.as_ref(), &mut findings).await;
        self.dispatch(findings, &mut report).await;
        report.latest_height = advanced?;

        let findings: Vec<Anomaly> = self
            .state
            .block_buffer
            .iter()
            .flat_map(|block| auditor::audit(block, &self.validators))
            .collect();
        report.blocks_audited = self.state.block_buffer.len();
        metrics::record_blocks_audited(report.blocks_audited);
        self.dispatch(findings, &mut report).await;

        let snapshot = self
            .fetch("consensus state", self.rpc.consensus_state(), &mut report)
            .await?;
        let findings = self.analyzer.analyze(
            &mut self.state,
            &mut self.validators,
            &snapshot,
            Instant::now(),
        );
        self.dispatch(findings, &mut report).await;

        let unconfirmed = self
            .fetch("unconfirmed txs", self.rpc.unconfirmed_tx_count(), &mut report)
            .await?;
        self.dispatch(checks::check_unconfirmed_txs(unconfirmed), &mut report)
            .await;

        let catching_up = self
            .fetch("node status", self.rpc.catching_up(), &mut report)
            .await?;
        self.dispatch(checks::check_sync_status(catching_up), &mut report)
            .await;

        Ok(report)
    }

    /// Await an RPC call; on failure alert the raw diagnostic and return the error.
    async fn fetch<T>(
        &self,
        resource: &str,
        call: impl Future<Output = Result<T, RpcError>>,
        report: &mut CycleReport,
    ) -> Result<T, RpcError> {
        match call.await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(resource, error = %err, "failed to fetch from node");
                let anomaly = Anomaly::FetchFailed {
                    resource: resource.to_string(),
                    diagnostic: err.diagnostic(),
                };
                self.dispatch([anomaly], report).await;
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        findings: impl IntoIterator<Item = Anomaly>,
        report: &mut CycleReport,
    ) {
        for anomaly in findings {
            metrics::record_anomaly(anomaly.kind());
            warn!(kind = anomaly.kind(), %anomaly, "anomaly detected");
            if !self.send(&anomaly.to_string()).await {
                report.undelivered += 1;
            }
            report.anomalies.push(anomaly);
        }
    }

    /// Deliver one alert. Delivery failures are logged, not propagated, so
    /// one lost alert does not suppress the findings after it.
    async fn send(&self, text: &str) -> bool {
        match self.alerts.send(text).await {
            Ok(()) => {
                metrics::record_alert_sent();
                true
            }
            Err(err) => {
                metrics::record_alert_failure();
                error!(error = %err, text, "failed to deliver alert");
                false
            }
        }
    }
}
