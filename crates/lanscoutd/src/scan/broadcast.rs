//! Probe broadcast.
//!
//! Every cycle sends each configured probe to `<prefix>.255:<port>` for every
//! subnet. Subnets are independent: a failed send is logged and the rest of
//! the cycle goes ahead. The next cycle is the only retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time;

use lanscout_core::wire::PROBE_LEN;
use lanscout_core::SubnetPrefix;

pub type Probe = &'static [u8; PROBE_LEN];

/// Broadcast probes every `frequency` until shutdown. The first cycle runs immediately.
pub async fn broadcast_loop(
    socket: Arc<UdpSocket>,
    subnets: Arc<Vec<SubnetPrefix>>,
    probes: Vec<Probe>,
    port: u16,
    frequency: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = time::interval(frequency);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tracing::info!(
        subnets = subnets.len(),
        probes = probes.len(),
        port,
        interval_ms = frequency.as_millis() as u64,
        "probe broadcast starting"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {}
        }
        send_probes(&socket, &subnets, &probes, port).await;
    }

    tracing::debug!("probe broadcast stopped");
}

/// One cycle. Returns the number of datagrams that went out.
pub async fn send_probes(
    socket: &UdpSocket,
    subnets: &[SubnetPrefix],
    probes: &[Probe],
    port: u16,
) -> usize {
    let mut sent = 0;
    for subnet in subnets {
        let dest = subnet.broadcast_endpoint(port);
        for probe in probes {
            match socket.send_to(probe.as_slice(), dest).await {
                Ok(n) => {
                    sent += 1;
                    tracing::trace!(%dest, bytes = n, "probe sent");
                }
                Err(e) => tracing::warn!(%dest, error = %e, "probe send failed"),
            }
        }
    }
    sent
}
