//! lanscoutd — LAN device discovery daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::broadcast::error::RecvError;

use lanscout_core::config::LanscoutConfig;
use lanscout_services::RegistryEvent;
use lanscoutd::DiscoveryEngine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = LanscoutConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = LanscoutConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LanscoutConfig::default()
    });
    tracing::info!(
        probe_port = config.network.probe_port,
        bridged = %config.network.bridged_subnet,
        scan_frequency_ms = config.scan.scan_frequency_ms,
        disconnect_timeout_ms = config.scan.disconnect_timeout_ms,
        "lanscoutd starting"
    );

    // `launch` honours scan.auto_start. Records added before the subscription
    // still show up in the roster snapshot.
    let engine = Arc::new(DiscoveryEngine::launch(config).await);
    let mut events = engine.subscribe();
    if !engine.is_running() {
        engine.start().await;
    }
    if !engine.is_running() {
        bail!("discovery engine failed to start");
    }

    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let roster_printer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                let roster = engine.snapshot();
                tracing::debug!(count = roster.len(), "roster snapshot");
                for r in &roster {
                    tracing::debug!(
                        addr = %r.address,
                        name = %r.display_name,
                        state = %r.state,
                        seen_secs = r.last_seen.elapsed().as_secs(),
                        "  device"
                    );
                }
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        r = event_logger            => tracing::error!("event logger exited: {:?}", r),
        r = roster_printer          => tracing::error!("roster printer exited: {:?}", r),
    }

    engine.stop().await;
    Ok(())
}

fn log_event(event: &RegistryEvent) {
    let r = event.record();
    tracing::info!(
        event = event.kind(),
        addr = %r.address,
        name = %r.display_name,
        kind = %r.device_kind,
        connection = ?r.connection_kind,
        state = %r.state,
        "registry event"
    );
}
