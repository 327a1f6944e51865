//! Connection records — one per discovered device.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use lanscout_core::{DeviceKind, Reply, SubnetPrefix};

/// How a device is reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    #[default]
    None,
    Lan,
    /// Reserved. Never assigned by discovery.
    Wireless,
    Bridged,
}

impl ConnectionKind {
    /// Bridged when the third octet matches the bridged prefix, LAN otherwise.
    ///
    /// Only the third octet is compared. This is a coarse heuristic that
    /// assumes the bridged range does not share a third octet with the LAN.
    pub fn classify(addr: Ipv4Addr, bridged: SubnetPrefix) -> Self {
        if addr.octets()[2] == bridged.third_octet() {
            ConnectionKind::Bridged
        } else {
            ConnectionKind::Lan
        }
    }
}

/// Liveness of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LinkState {
    #[default]
    None,
    Online,
    Offline,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LinkState::None => "none",
            LinkState::Online => "online",
            LinkState::Offline => "offline",
        })
    }
}

/// Tracked state for a discovered device.
///
/// Records handed out by the registry are copies. Mutating one has no
/// effect on the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Source address of the device's replies. Registry key.
    pub address: Ipv4Addr,

    /// Name decoded from the reply payload.
    pub display_name: String,

    /// Protocol variant, from the reply signature.
    pub device_kind: DeviceKind,

    pub connection_kind: ConnectionKind,

    pub state: LinkState,

    /// When the last accepted reply arrived.
    pub last_seen: Instant,

    /// Starts at 0 when the record is added and is bumped under the entry
    /// lock by every state change and by removal. Events for one address
    /// can reach a subscriber out of lock order; the higher revision is the
    /// newer one.
    pub revision: u64,
}

impl ConnectionRecord {
    /// Build the record for a device heard from for the first time.
    pub fn discovered(
        address: Ipv4Addr,
        reply: &Reply,
        bridged: SubnetPrefix,
        now: Instant,
    ) -> Self {
        Self {
            address,
            display_name: reply.name.clone(),
            device_kind: reply.kind,
            connection_kind: ConnectionKind::classify(address, bridged),
            state: LinkState::Online,
            last_seen: now,
            revision: 0,
        }
    }

    /// Silent for strictly longer than `timeout` as of `now`.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}
