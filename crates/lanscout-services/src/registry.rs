//! Connection registry — the live device roster.
//!
//! A concurrent map from device address to `ConnectionRecord`, written by the
//! scan loops and read by anyone. Each operation holds the entry's shard lock
//! only for the map mutation itself; the resulting event is published after
//! the lock is released, so subscribers never run under a registry lock.
//! Two racing changes to one address may therefore be delivered in either
//! order; each event's record carries a `revision` taken under the lock so
//! subscribers can tell which is newer.
//!
//! Conflicting calls (adding a known address, updating or removing an unknown
//! one) are no-ops. Callers use them speculatively and are not told off.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::notify::{NotificationHub, RegistryEvent};
use crate::record::{ConnectionRecord, LinkState};

/// The roster. Clones share the same map and hub.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    records: Arc<DashMap<Ipv4Addr, ConnectionRecord>>,
    hub: NotificationHub,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(NotificationHub::new())
    }
}

impl ConnectionRegistry {
    pub fn new(hub: NotificationHub) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            hub,
        }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Insert a record under its address. Returns false if the address is
    /// already present; the existing record is left untouched.
    pub fn add(&self, mut record: ConnectionRecord) -> bool {
        record.revision = 0;
        let added = match self.records.entry(record.address) {
            Entry::Occupied(_) => {
                tracing::debug!(addr = %record.address, "add ignored, device already registered");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                record
            }
        };

        tracing::info!(
            addr = %added.address,
            name = %added.display_name,
            kind = %added.device_kind,
            connection = ?added.connection_kind,
            "device registered"
        );
        self.hub.publish(RegistryEvent::Added(added));
        true
    }

    /// Remove a device. Returns the record as it was at removal.
    pub fn remove(&self, address: Ipv4Addr) -> Option<ConnectionRecord> {
        let removed = self.records.remove(&address).map(|(_, mut record)| {
            record.revision += 1;
            record
        });
        self.announce_removal(removed)
    }

    /// Remove a device only if `predicate` holds for it, checked under the lock.
    pub fn remove_if(
        &self,
        address: Ipv4Addr,
        predicate: impl FnOnce(&ConnectionRecord) -> bool,
    ) -> Option<ConnectionRecord> {
        let removed = self
            .records
            .remove_if(&address, |_, record| predicate(record))
            .map(|(_, mut record)| {
                record.revision += 1;
                record
            });
        self.announce_removal(removed)
    }

    /// Set a device's liveness. No-op for unknown addresses.
    pub fn update_state(&self, address: Ipv4Addr, state: LinkState) -> Option<ConnectionRecord> {
        self.update_state_if(address, state, |_| true)
    }

    /// Set a device's liveness only if `predicate` holds for the current
    /// record, checked under the lock.
    pub fn update_state_if(
        &self,
        address: Ipv4Addr,
        state: LinkState,
        predicate: impl FnOnce(&ConnectionRecord) -> bool,
    ) -> Option<ConnectionRecord> {
        let updated = {
            let mut entry = self.records.get_mut(&address)?;
            if !predicate(entry.value()) {
                return None;
            }
            entry.state = state;
            entry.revision += 1;
            entry.value().clone()
        };

        tracing::info!(addr = %address, state = %state, "device state changed");
        self.hub.publish(RegistryEvent::Updated(updated.clone()));
        Some(updated)
    }

    /// Record a reply seen at `timestamp`. Returns the device's current state,
    /// or `None` if the address is unknown. `last_seen` never moves backwards.
    pub fn refresh(&self, address: Ipv4Addr, timestamp: Instant) -> Option<LinkState> {
        let mut entry = self.records.get_mut(&address)?;
        if timestamp > entry.last_seen {
            entry.last_seen = timestamp;
        }
        Some(entry.state)
    }

    /// Remove every device that is currently offline. Returns how many went.
    pub fn purge_offline(&self) -> usize {
        let purged = self
            .addresses()
            .into_iter()
            .filter_map(|addr| self.remove_if(addr, |r| r.state == LinkState::Offline))
            .count();
        if purged > 0 {
            tracing::info!(count = purged, "purged offline devices");
        }
        purged
    }

    pub fn get(&self, address: Ipv4Addr) -> Option<ConnectionRecord> {
        self.records.get(&address).map(|r| r.value().clone())
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.records.contains_key(&address)
    }

    /// Copies of all records, sorted by address.
    pub fn snapshot(&self) -> Vec<ConnectionRecord> {
        let mut records: Vec<ConnectionRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.address);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn addresses(&self) -> Vec<Ipv4Addr> {
        self.records.iter().map(|r| *r.key()).collect()
    }

    fn announce_removal(&self, removed: Option<ConnectionRecord>) -> Option<ConnectionRecord> {
        let record = removed?;
        tracing::info!(addr = %record.address, name = %record.display_name, "device removed");
        self.hub.publish(RegistryEvent::Removed(record.clone()));
        Some(record)
    }
}
