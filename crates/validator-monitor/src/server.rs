//! Inbound triggers for monitor cycles.
//!
//! Cycles are started by `GET /monitor` and, optionally, by a fixed-period
//! timer. Both go through the same [`SharedMonitor`] lock, so at most one
//! cycle runs at a time and a trigger that arrives mid-cycle waits for it.

use crate::{
    error::ServerError,
    monitor::Monitor,
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use std::{
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::{
    net::TcpListener,
    sync::Mutex,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    error,
    info,
    instrument,
    trace,
};

pub type SharedMonitor = Arc<Mutex<Monitor>>;

#[derive(Debug)]
pub struct TriggerServer {
    bind_addr: SocketAddr,
    shutdown_token: CancellationToken,
}

impl TriggerServer {
    pub fn new(bind_addr: SocketAddr, shutdown_token: CancellationToken) -> Self {
        Self {
            bind_addr,
            shutdown_token,
        }
    }

    #[instrument(
        name = "trigger_server::run",
        skip(self, monitor),
        fields(bind_addr = %self.bind_addr),
        level = "debug"
    )]
    pub async fn run(&self, monitor: SharedMonitor) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
            error!(
                bind_addr = %self.bind_addr,
                error = ?e,
                "Failed to bind trigger server listener"
            );
            ServerError::BindAddress {
                addr: self.bind_addr,
                source: e,
            }
        })?;

        self.serve(listener, monitor).await
    }

    /// Serve on an already bound listener until the shutdown token fires.
    pub async fn serve(
        &self,
        listener: TcpListener,
        monitor: SharedMonitor,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr().unwrap_or(self.bind_addr);
        info!(%addr, "Trigger server starting");

        let shutdown = self.shutdown_token.clone();
        axum::serve(listener, router(monitor))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| {
                error!(error = ?e, "Trigger server failed");
                ServerError::Serve { addr, source: e }
            })?;

        info!("Trigger server stopped");
        Ok(())
    }
}

pub fn router(monitor: SharedMonitor) -> Router {
    Router::new()
        .route("/monitor", get(trigger_cycle))
        .route("/health", get(health))
        .with_state(monitor)
}

#[instrument(name = "trigger_server::monitor", skip_all, level = "debug")]
async fn trigger_cycle(
    State(monitor): State<SharedMonitor>,
) -> Result<&'static str, (StatusCode, String)> {
    let mut monitor = monitor.lock().await;
    match monitor.run_cycle().await {
        Ok(_) => Ok("success"),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

#[instrument(name = "trigger_server::health", level = "trace")]
async fn health() -> &'static str {
    trace!("Health check requested");
    "OK"
}

/// Run a cycle every `period` until `shutdown` fires. The first cycle runs
/// immediately.
pub fn spawn_timer(
    monitor: SharedMonitor,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "Poll timer started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let mut monitor = monitor.lock().await;
                    if monitor.run_cycle().await.is_err() {
                        debug!("timer-triggered cycle failed");
                    }
                }
            }
        }

        info!("Poll timer stopped");
    })
}
