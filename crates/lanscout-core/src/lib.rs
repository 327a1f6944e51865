//! lanscout-core — wire format, subnet prefixes, and configuration.
//! All other lanscout crates depend on this one.

pub mod config;
pub mod subnet;
pub mod wire;

pub use subnet::{SubnetError, SubnetPrefix};
pub use wire::{decode_reply, DeviceKind, Reply, ReplyError};
