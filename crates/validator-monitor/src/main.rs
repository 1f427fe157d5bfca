use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{
    info,
    warn,
};
use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use validator_monitor::{
    HttpNodeRpc,
    Monitor,
    MonitorConfig,
    TriggerServer,
    WebhookSink,
    cli::Args,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?
        .with_overrides(args.rpc_url.clone(), args.webhook_url.clone())
        .validate()
        .context("invalid configuration")?;

    let rpc = HttpNodeRpc::new(&config.rpc_url).context("failed to build RPC client")?;
    let alerts = WebhookSink::new(config.alert_webhook_url()?)
        .context("failed to build alert webhook client")?;

    info!(
        rpc_url = %rpc.base_url(),
        validators = config.validators.len(),
        average_interval_hours = config.average_interval_hours,
        "Starting validator monitor"
    );

    let monitor = Monitor::new(
        Arc::new(rpc),
        Arc::new(alerts),
        config.validators,
        config.average_interval_hours,
    )
    .context("failed to build monitor")?;
    let monitor = Arc::new(Mutex::new(monitor));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            warn!("Error setting up signal handler: {}", e);
        } else {
            info!("Shutdown signal received, initiating graceful shutdown...");
            signal_token.cancel();
        }
    });

    let timer = args
        .poll_interval()
        .map(|period| server::spawn_timer(monitor.clone(), period, shutdown.clone()));

    let result = TriggerServer::new(args.listen_addr, shutdown.clone())
        .run(monitor)
        .await;
    shutdown.cancel();

    if let Some(timer) = timer {
        timer.await.context("poll timer task failed")?;
    }

    result.context("trigger server terminated unexpectedly")?;
    info!("Validator monitor shutdown gracefully");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C)
async fn shutdown_signal() -> Result<()> {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("failed to install SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
