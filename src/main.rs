//! EXP Scanner: entry point.
//!
//! Loads configuration, applies CLI overrides, initialises structured
//! logging, wires the Binance gateway into the scanner and either runs a
//! single pass or the auto-refresh loop with graceful Ctrl+C shutdown.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{info, warn};

use exp_scanner::cli::Args;
use exp_scanner::config::AppConfig;
use exp_scanner::dashboard::{self, routes::{DashboardSink, DashboardState}};
use exp_scanner::engine::metric::MetricEngine;
use exp_scanner::engine::scanner::Scanner;
use exp_scanner::exchange::binance::BinanceClient;
use exp_scanner::exchange::PriceGateway;
use exp_scanner::presentation::ConsoleSink;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let mut cfg = AppConfig::load_or_default(&args.config)?;
    args.apply(&mut cfg);

    // Configuration errors end the process before any network activity.
    let settings = cfg.scan_settings()?;

    info!(
        symbols = settings.symbols.len(),
        reference = %cfg.reference_asset(),
        quote = %cfg.quote_currency(),
        sort = %settings.sort_timeframe,
        auto_refresh = cfg.scanner.auto_refresh,
        "EXP scanner starting up"
    );

    // -- Initialise components -------------------------------------------

    let gateway: Arc<dyn PriceGateway> = Arc::new(BinanceClient::new(
        Some(cfg.exchange.base_url.as_str()),
        Duration::from_secs(cfg.exchange.timeout_secs),
    )?);
    info!(gateway = gateway.name(), "Exchange gateway ready");

    let engine = MetricEngine::new(gateway, cfg.reference_asset(), cfg.quote_currency());
    let console = Arc::new(ConsoleSink::new(!args.no_color, args.export.clone()));
    let mut scanner = Scanner::new(engine, settings)?.with_sink(console);

    // -- Single pass -----------------------------------------------------

    if !cfg.scanner.auto_refresh {
        let report = scanner.run_once().await;
        info!(%report, "Single pass finished");
        return Ok(());
    }

    // -- Auto-refresh ----------------------------------------------------

    let trigger = Arc::new(Notify::new());

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(
            cfg.scanner.refresh_interval_secs,
            trigger.clone(),
        ));
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;
        scanner = scanner.with_sink(Arc::new(DashboardSink::new(state)));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C; auto-refresh cannot be interrupted");
            // Dropping the sender would read as a stop request.
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received. Stopping after the current pass.");
        let _ = shutdown_tx.send(true);
    });

    info!("Entering auto-refresh mode. Press Ctrl+C to stop.");

    match scanner.run_auto(shutdown_rx, trigger).await {
        Some(last) => info!(%last, "EXP scanner shut down cleanly."),
        None => info!("EXP scanner shut down before the first pass."),
    }

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("exp_scanner=info"));

    if json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
