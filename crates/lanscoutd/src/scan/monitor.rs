//! Liveness monitor.
//!
//! Every cycle, each record silent for longer than the disconnect timeout is
//! aged: online records go offline, and records already offline (or never
//! online) are removed when `remove_on_disconnect` is set. This is the only
//! place that marks a device offline. Each check-and-act runs under the
//! entry lock, so a reply that lands between snapshot and action wins.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use lanscout_services::{ConnectionRegistry, LinkState};

/// Ageing policy for one session.
#[derive(Debug, Clone, Copy)]
pub struct MonitorPolicy {
    pub frequency: Duration,
    pub disconnect_timeout: Duration,
    pub remove_on_disconnect: bool,
}

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    pub demoted: usize,
    pub removed: usize,
}

/// Age every stale record once, as of `now`.
pub fn sweep(registry: &ConnectionRegistry, policy: &MonitorPolicy, now: Instant) -> Sweep {
    let timeout = policy.disconnect_timeout;
    let mut result = Sweep::default();

    for record in registry.snapshot() {
        if !record.is_stale(now, timeout) {
            continue;
        }

        match record.state {
            LinkState::Online => {
                let demoted = registry.update_state_if(record.address, LinkState::Offline, |r| {
                    r.state == LinkState::Online && r.is_stale(now, timeout)
                });
                if demoted.is_some() {
                    result.demoted += 1;
                }
            }
            LinkState::None | LinkState::Offline if policy.remove_on_disconnect => {
                let removed = registry.remove_if(record.address, |r| {
                    r.state != LinkState::Online && r.is_stale(now, timeout)
                });
                if removed.is_some() {
                    result.removed += 1;
                }
            }
            // Already marked stale; nothing to announce again.
            LinkState::None | LinkState::Offline => {}
        }
    }

    result
}

/// Sweep every `policy.frequency` until shutdown.
pub async fn monitor_loop(
    registry: ConnectionRegistry,
    policy: MonitorPolicy,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = time::interval(policy.frequency);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tracing::info!(
        timeout_ms = policy.disconnect_timeout.as_millis() as u64,
        remove_on_disconnect = policy.remove_on_disconnect,
        "liveness monitor starting"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {}
        }

        let swept = sweep(&registry, &policy, Instant::now());
        if swept != Sweep::default() {
            tracing::debug!(
                demoted = swept.demoted,
                removed = swept.removed,
                "aged stale devices"
            );
        }
    }

    tracing::debug!("liveness monitor stopped");
}
