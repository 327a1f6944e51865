//! lanscout-services — the device roster and its collaborators.
//!
//! The registry is shared between the scan loops and any number of
//! readers. Every change to it is published on the notification hub.

pub mod notify;
pub mod record;
pub mod registry;
pub mod resolver;

pub use notify::{NotificationHub, RegistryEvent};
pub use record::{ConnectionKind, ConnectionRecord, LinkState};
pub use registry::ConnectionRegistry;
pub use resolver::{resolve_local_endpoint, scan_subnets, subnet_prefix, ResolveError};
