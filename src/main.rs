//! energy-monitor: electrical telemetry ingestion daemon.
//!
//! Single-binary Tokio application that:
//! 1. Polls a time-series query endpoint on three cadences
//!    (realtime / power / extremes)
//! 2. Parses the tabular responses into typed points
//! 3. Keeps a rolling history plus latest value per stream
//! 4. Aggregates run/error state across all pollers
//! 5. Refreshes a cached weather forecast for the configured location

mod config;
mod streams;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use common::{ExtremesSample, PowerSample, RealtimeSample, TimeSeriesPoint};
use flux_client::FluxClient;
use poller::{OrchestratorStatus, PollingOrchestrator};
use weather_client::WeatherClient;

/// Electrical telemetry ingestion daemon
#[derive(Parser)]
#[command(name = "energy-monitor", about = "Electrical telemetry ingestion daemon")]
struct Cli {
    /// Probe the query endpoint's health route and exit.
    #[arg(long)]
    check_connection: bool,

    /// Run one fetch cycle per stream plus a weather lookup, print the
    /// aggregate status as JSON, and exit.
    #[arg(long)]
    dry_run: bool,

    /// Path to the config file (default: ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn log_typed_latest(name: &str, latest: &TimeSeriesPoint) {
    match name {
        "realtime" => {
            let s = RealtimeSample::from_point(latest);
            info!(
                "realtime @ {}: voltage={:?} V current={:?} A power={:?} W",
                s.time, s.voltage, s.current, s.power
            );
        }
        "power" => {
            let s = PowerSample::from_point(latest);
            info!(
                "power @ {}: active={:?} W reactive={:?} var energy={:?} Wh",
                s.time, s.active, s.reactive, s.energy_wh
            );
        }
        "extremes" => {
            let s = ExtremesSample::from_point(latest);
            info!(
                "extremes @ {}: v_min={:?} v_max={:?} p_max={:?}",
                s.time, s.voltage_min, s.voltage_max, s.power_max
            );
        }
        other => info!("{} @ {}: {:?}", other, latest.timestamp, latest.fields),
    }
}

fn log_heartbeat(status: &OrchestratorStatus) {
    info!(
        "HEARTBEAT: running={} errors={} updates={} last_update={}",
        status.is_any_running,
        status.has_any_error,
        status.total_updates,
        status
            .last_update
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into()),
    );
    for stream in &status.streams {
        if let Some(err) = &stream.error {
            warn!("{}: {}", stream.name, err);
        }
    }
}

async fn run_dry_run(
    orchestrator: &PollingOrchestrator,
    weather: &WeatherClient,
    cfg: &common::config::MonitorConfig,
) {
    info!("Running single fetch cycle per stream...");
    for poller in orchestrator.pollers() {
        poller.poll_once().await;
    }

    let status = orchestrator.status().await;
    for stream in &status.streams {
        match (&stream.latest, &stream.error) {
            (Some(latest), _) => log_typed_latest(&stream.name, latest),
            (None, Some(err)) => warn!("{}: fetch failed: {}", stream.name, err),
            (None, None) => info!("{}: no data in range", stream.name),
        }
    }

    match weather
        .forecast_for(&cfg.weather.location, cfg.weather.forecast_hours)
        .await
    {
        Ok((location, forecast)) => {
            let next = forecast.hours.first();
            info!(
                "weather: {} ({:.2}, {:.2}) — {} hours, next temp={:?}°C",
                location.name,
                location.latitude,
                location.longitude,
                forecast.hours.len(),
                next.and_then(|h| h.temperature_c),
            );
        }
        Err(e) => warn!("weather lookup failed: {}", e),
    }

    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("failed to serialize status: {}", e),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "energy_monitor=info,flux_client=info,poller=info,weather_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("⚡ Energy Monitor starting up...");

    // Load configuration.
    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Endpoint: {} (org={}, bucket={})",
        cfg.influx.url, cfg.influx.org, cfg.influx.bucket
    );
    info!(
        "Streams: {}",
        cfg.streams
            .iter()
            .map(|s| format!("{}@{}ms", s.name, s.interval_ms))
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "Weather: {} ({}h forecast, {}s TTL)",
        cfg.weather.location, cfg.weather.forecast_hours, cfg.weather.forecast_ttl_secs
    );

    let flux = Arc::new(FluxClient::new(&cfg.influx));
    let weather = Arc::new(WeatherClient::new(Duration::from_secs(
        cfg.weather.forecast_ttl_secs,
    )));

    // ── Check-connection mode ────────────────────────────────────────
    if cli.check_connection {
        info!("Probing {} ...", cfg.influx.url);
        match flux.ping().await {
            Ok(()) => info!("✅ Endpoint is healthy"),
            Err(e) => {
                error!("❌ Endpoint check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let orchestrator = Arc::new(streams::build_orchestrator(&cfg, flux));

    // ── Dry-run mode ─────────────────────────────────────────────────
    if cli.dry_run {
        run_dry_run(&orchestrator, &weather, &cfg).await;
        return;
    }

    // ── Spawn tasks ──────────────────────────────────────────────────
    orchestrator.start_all().await;

    // Weather refresh loop; the TTL cache absorbs extra callers.
    let weather_cfg = cfg.weather.clone();
    let weather_handle = tokio::spawn(async move {
        loop {
            match weather
                .forecast_for(&weather_cfg.location, weather_cfg.forecast_hours)
                .await
            {
                Ok((location, forecast)) => {
                    info!(
                        "weather refreshed: {} — {} hours cached",
                        location.name,
                        forecast.hours.len()
                    );
                }
                Err(e) => warn!("weather refresh failed: {}", e),
            }
            tokio::time::sleep(Duration::from_secs(weather_cfg.refresh_secs)).await;
        }
    });

    // Heartbeat: aggregate status on a fixed cadence.
    let hb_orchestrator = orchestrator.clone();
    let heartbeat_secs = cfg.heartbeat_secs;
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(heartbeat_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let status = hb_orchestrator.status().await;
            log_heartbeat(&status);
        }
    });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("🚀 Energy Monitor is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = weather_handle => {
            error!("Weather task exited: {:?}", r);
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
        }
    }

    orchestrator.stop_all().await;
    info!("Shutdown complete");
}
