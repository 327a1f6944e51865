//! lanscoutd — LAN device discovery daemon.
//!
//! `DiscoveryEngine` owns one scan session at a time: a broadcast socket and
//! the three loops in `scan` that probe, listen, and age out devices.

pub mod engine;
pub mod scan;

pub use engine::DiscoveryEngine;
