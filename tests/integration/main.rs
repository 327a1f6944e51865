//! lanscout integration test harness.
//!
//! Tests drive a real `DiscoveryEngine` over loopback. The engine is told
//! its local address is 127.0.0.1, so it probes 127.0.0.255, which loopback
//! delivers to any socket bound on 0.0.0.0 at the probe port. Fake devices
//! either answer those probes or send replies straight to the engine's
//! socket from other 127/8 addresses, giving each device its own identity.
//!
//!   cargo test --test integration

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time::timeout;

use lanscout_core::config::LanscoutConfig;
use lanscout_services::RegistryEvent;
use lanscoutd::DiscoveryEngine;

mod discovery;
mod liveness;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Port nobody listens on. Used when a test does not need probes answered.
pub const DISCARD_PORT: u16 = 9;

/// How long to wait for an event that should arrive.
pub const EVENT_WAIT: Duration = Duration::from_secs(3);

/// Fast-cycling config pinned to loopback.
pub fn loopback_config(probe_port: u16, disconnect_timeout_ms: u64) -> LanscoutConfig {
    let mut config = LanscoutConfig::default();
    config.network.local_address = Some(Ipv4Addr::LOCALHOST);
    config.network.probe_port = probe_port;
    config.scan.scan_frequency_ms = 50;
    config.scan.disconnect_timeout_ms = disconnect_timeout_ms;
    config
}

/// A simulated device listening for probes on an ephemeral port.
pub struct FakeDevice {
    socket: UdpSocket,
}

impl FakeDevice {
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .context("bind fake device")?;
        Ok(Self { socket })
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Wait for one probe and answer it. Returns the probe bytes.
    pub async fn answer_probe(&self, reply: &[u8]) -> Result<Vec<u8>> {
        let mut buf = [0u8; 64];
        let (n, from) = timeout(EVENT_WAIT, self.socket.recv_from(&mut buf))
            .await
            .context("no probe received")??;
        self.socket.send_to(reply, from).await?;
        Ok(buf[..n].to_vec())
    }
}

/// Send a reply to the engine's socket from `source`, a 127/8 address.
pub async fn reply_from(engine: &DiscoveryEngine, source: Ipv4Addr, payload: &[u8]) -> Result<()> {
    let Some(local) = engine.local_addr().await else {
        bail!("engine is not running");
    };
    let socket = UdpSocket::bind((source, 0)).await.context("bind reply source")?;
    let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, local.port());
    socket.send_to(payload, target).await?;
    Ok(())
}

/// Next registry event, failing after `EVENT_WAIT`.
pub async fn next_event(rx: &mut broadcast::Receiver<RegistryEvent>) -> Result<RegistryEvent> {
    Ok(timeout(EVENT_WAIT, rx.recv())
        .await
        .context("timed out waiting for registry event")??)
}

/// Assert no event arrives within `window`.
pub async fn assert_quiet(rx: &mut broadcast::Receiver<RegistryEvent>, window: Duration) {
    if let Ok(event) = timeout(window, rx.recv()).await {
        panic!("unexpected registry event: {event:?}");
    }
}
