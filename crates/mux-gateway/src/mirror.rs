//! Bookkeeping for the remote attribute mirror
//!
//! A [`MirrorSet`] records which devices have remote objects and which
//! trigger nodes route back to which address. It is strictly append-only:
//! devices that vanish from the bus keep their remote objects until the
//! gateway restarts, so clients never see node ids disappear mid-session.

use std::collections::HashMap;

use mux_protocol::BusAddress;

use crate::attrs::AttrId;

/// Remote node ids belonging to one mirrored device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorEntry {
    pub address: BusAddress,
    /// Per-device object folder
    pub object: AttrId,
    /// Read-only active channel variable
    pub channel: AttrId,
    /// Read-only status label variable
    pub status: AttrId,
    /// Writable channel-select trigger
    pub set_trigger: AttrId,
    /// Writable reset trigger
    pub reset_trigger: AttrId,
}

/// Append-only set of mirrored devices
#[derive(Debug, Default)]
pub struct MirrorSet {
    entries: HashMap<BusAddress, MirrorEntry>,
    set_triggers: HashMap<AttrId, BusAddress>,
    reset_triggers: HashMap<AttrId, BusAddress>,
    generation: u64,
}

impl MirrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly mirrored device; bumps the generation counter
    pub fn insert(&mut self, entry: MirrorEntry) {
        self.set_triggers.insert(entry.set_trigger, entry.address);
        self.reset_triggers.insert(entry.reset_trigger, entry.address);
        self.entries.insert(entry.address, entry);
        self.generation += 1;
    }

    pub fn contains(&self, address: BusAddress) -> bool {
        self.entries.contains_key(&address)
    }

    pub fn get(&self, address: BusAddress) -> Option<&MirrorEntry> {
        self.entries.get(&address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = BusAddress> + '_ {
        self.entries.keys().copied()
    }

    /// Counter incremented on every insert, never reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Which device a written channel-select trigger belongs to
    pub fn set_trigger_owner(&self, node: AttrId) -> Option<BusAddress> {
        self.set_triggers.get(&node).copied()
    }

    /// Which device a written reset trigger belongs to
    pub fn reset_trigger_owner(&self, node: AttrId) -> Option<BusAddress> {
        self.reset_triggers.get(&node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(address: BusAddress, base: u64) -> MirrorEntry {
        MirrorEntry {
            address,
            object: AttrId(base),
            channel: AttrId(base + 1),
            status: AttrId(base + 2),
            set_trigger: AttrId(base + 3),
            reset_trigger: AttrId(base + 4),
        }
    }

    #[test]
    fn insert_routes_triggers() {
        let mut mirror = MirrorSet::new();
        mirror.insert(entry(32, 10));
        mirror.insert(entry(33, 20));

        assert_eq!(mirror.set_trigger_owner(AttrId(13)), Some(32));
        assert_eq!(mirror.reset_trigger_owner(AttrId(24)), Some(33));
        assert_eq!(mirror.set_trigger_owner(AttrId(24)), None);
    }

    #[test]
    fn generation_counts_inserts() {
        let mut mirror = MirrorSet::new();
        assert_eq!(mirror.generation(), 0);
        mirror.insert(entry(32, 10));
        mirror.insert(entry(33, 20));
        assert_eq!(mirror.generation(), 2);
        assert_eq!(mirror.len(), 2);
    }

    #[test]
    fn lookup_by_address() {
        let mut mirror = MirrorSet::new();
        mirror.insert(entry(32, 10));

        assert!(mirror.contains(32));
        assert!(!mirror.contains(33));
        assert_eq!(mirror.get(32).unwrap().channel, AttrId(11));
    }
}
