//! Subnet prefixes — the `a.b.c` part of a /24 IPv4 network.
//!
//! Probes go to `<prefix>.255`. The bridged subnet is carried as a prefix
//! too, but only its third octet is used to classify replies.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default bridged subnet (Windows Internet Connection Sharing range).
pub const BRIDGED_SUBNET: SubnetPrefix = SubnetPrefix::new(192, 168, 137);

/// First three octets of a /24 network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetPrefix([u8; 3]);

impl SubnetPrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Prefix of the /24 that `addr` lives in.
    pub fn of(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self([a, b, c])
    }

    pub fn octets(&self) -> [u8; 3] {
        self.0
    }

    pub fn third_octet(&self) -> u8 {
        self.0[2]
    }

    /// `<prefix>.255`
    pub fn broadcast_addr(&self) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, 255)
    }

    /// Broadcast address paired with a port, the probe destination.
    pub fn broadcast_endpoint(&self, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(self.broadcast_addr(), port)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        Self::of(addr) == *self
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubnetError {
    #[error("expected three dot-separated octets, got {0:?}")]
    WrongShape(String),
    #[error("invalid octet {octet:?} in {prefix:?}")]
    BadOctet { prefix: String, octet: String },
}

impl FromStr for SubnetPrefix {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_end_matches('.');
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(SubnetError::WrongShape(s.to_string()));
        }

        let mut octets = [0u8; 3];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| SubnetError::BadOctet {
                prefix: s.to_string(),
                octet: part.to_string(),
            })?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for SubnetPrefix {
    type Error = SubnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubnetPrefix> for String {
    fn from(prefix: SubnetPrefix) -> Self {
        prefix.to_string()
    }
}
