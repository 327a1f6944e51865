//! Scan loops.
//!
//! All three loops share one UDP socket bound to an ephemeral port: probes
//! leave from it, so replies come back to it. Each loop exits when the
//! session's shutdown channel fires or its sender is dropped.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};

pub mod broadcast;
pub mod listener;
pub mod monitor;

/// Create the session socket: IPv4, broadcast-capable, non-blocking, ephemeral port.
pub fn make_scan_socket() -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    socket.set_broadcast(true).context("SO_BROADCAST")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&bind_addr.into()).context("bind()")?;

    Ok(socket.into())
}
