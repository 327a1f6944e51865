//! Reply listener.
//!
//! Decodes reply datagrams and feeds them into the registry. An unknown
//! sender becomes a new online record; a known one is refreshed and, if it
//! was not online, brought back online. The loop suspends only on receive
//! and wakes on shutdown through `select!`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use lanscout_core::wire::MAX_DATAGRAM;
use lanscout_core::{decode_reply, ReplyError, SubnetPrefix};
use lanscout_services::{ConnectionRecord, ConnectionRegistry, LinkState};

/// What a single reply did to the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// First reply from this address; a record was added.
    Discovered,
    /// Known and already online; only `last_seen` moved.
    Refreshed,
    /// Known but not online; brought back online.
    Revived,
    Malformed(ReplyError),
}

/// Applies decoded replies to the registry.
#[derive(Debug, Clone)]
pub struct ReplyHandler {
    registry: ConnectionRegistry,
    bridged: SubnetPrefix,
}

impl ReplyHandler {
    pub fn new(registry: ConnectionRegistry, bridged: SubnetPrefix) -> Self {
        Self { registry, bridged }
    }

    pub fn handle(&self, from: Ipv4Addr, payload: &[u8], now: Instant) -> ReplyOutcome {
        let reply = match decode_reply(payload) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(%from, error = %e, payload = %hex::encode(payload), "malformed reply");
                return ReplyOutcome::Malformed(e);
            }
        };

        match self.registry.refresh(from, now) {
            Some(LinkState::Online) => ReplyOutcome::Refreshed,
            Some(_) => {
                // Another task may have revived it since the refresh.
                let revived = self.registry.update_state_if(from, LinkState::Online, |r| {
                    r.state != LinkState::Online
                });
                if revived.is_some() {
                    ReplyOutcome::Revived
                } else {
                    ReplyOutcome::Refreshed
                }
            }
            None => {
                tracing::debug!(%from, name = %reply.name, tag = reply.tag, "new device replied");
                let record = ConnectionRecord::discovered(from, &reply, self.bridged, now);
                if self.registry.add(record) {
                    ReplyOutcome::Discovered
                } else {
                    self.registry.refresh(from, now);
                    ReplyOutcome::Refreshed
                }
            }
        }
    }
}

/// Receive replies until shutdown.
pub async fn listener_loop(
    socket: Arc<UdpSocket>,
    handler: ReplyHandler,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    tracing::info!(local = ?socket.local_addr().ok(), "reply listener starting");

    loop {
        let (len, peer_addr) = tokio::select! {
            _ = shutdown.recv() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "recv_from failed");
                    continue;
                }
            },
        };

        let from = match peer_addr {
            SocketAddr::V4(v4) => *v4.ip(),
            SocketAddr::V6(_) => {
                tracing::trace!(%peer_addr, "ignoring IPv6 datagram");
                continue;
            }
        };

        let outcome = handler.handle(from, &buf[..len], Instant::now());
        tracing::trace!(%from, bytes = len, ?outcome, "reply handled");
    }

    tracing::debug!("reply listener stopped");
}
