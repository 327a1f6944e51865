//! Subnet resolution — which /24s to probe.
//!
//! The local subnet comes from the address the OS would use to reach the
//! outside world. Connecting a UDP socket sends nothing; it only runs route
//! selection, after which `local_addr()` reports the chosen source address.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use lanscout_core::SubnetPrefix;

/// Any routable address works. Nothing is sent to it.
const ROUTE_PROBE: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53);

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("route lookup failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("expected an IPv4 local address, got {0}")]
    NotIpv4(SocketAddr),
    #[error("no outbound interface selected")]
    Unspecified,
}

/// The local endpoint the host would use for outbound IPv4 traffic.
pub fn resolve_local_endpoint() -> Result<SocketAddrV4, ResolveError> {
    let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect(ROUTE_PROBE)?;
    match probe.local_addr()? {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => Err(ResolveError::Unspecified),
        SocketAddr::V4(v4) => Ok(v4),
        other => Err(ResolveError::NotIpv4(other)),
    }
}

/// `a.b.c` of the endpoint's address.
pub fn subnet_prefix(endpoint: SocketAddrV4) -> SubnetPrefix {
    SubnetPrefix::of(*endpoint.ip())
}

/// Subnets to probe: local first, then bridged, then extras. Duplicates dropped.
pub fn scan_subnets(
    local: Option<SubnetPrefix>,
    bridged: SubnetPrefix,
    extra: &[SubnetPrefix],
) -> Vec<SubnetPrefix> {
    let mut subnets = Vec::with_capacity(2 + extra.len());
    for prefix in local.into_iter().chain([bridged]).chain(extra.iter().copied()) {
        if !subnets.contains(&prefix) {
            subnets.push(prefix);
        }
    }
    subnets
}
