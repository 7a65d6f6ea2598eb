use serde::{Serialize, Deserialize};

use crate::core::{Address, Ticks};

/// Liveness of a known device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Unused slot
    #[default]
    Empty,
    /// Announced itself and was accepted
    NewlyRegistered,
    /// Told to sleep, or reported going to sleep
    Asleep,
}

/// One registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    /// Device address, unassigned for an empty slot
    pub address: Address,
    /// Current status
    pub status: DeviceStatus,
    /// Last time the device was heard from
    pub last_seen: Ticks,
}

impl Device {
    /// Returns whether the slot holds a device
    pub fn is_occupied(&self) -> bool {
        self.address.is_assigned()
    }
}

/// Result of processing a presence announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    /// Already known; timestamp refreshed
    Refreshed { slot: usize },
    /// Claimed a free slot
    Registered { slot: usize },
    /// No matching or free slot
    Rejected,
}

impl Announcement {
    /// Whether the announcing device should get a positive reply
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Announcement::Rejected)
    }
}

/// Fixed-capacity table of known devices, keyed by address
///
/// Slots are claimed first-fit and keep their position for as long as they
/// are occupied, so slot order is registration order.
#[derive(Debug, Clone)]
pub struct Registry {
    slots: Vec<Device>,
}

impl Registry {
    /// Creates a registry with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Registry {
            slots: vec![Device::default(); capacity],
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Device::is_occupied)
    }

    /// Records a presence announcement from `address`
    ///
    /// A known address only has its timestamp refreshed. An unknown one
    /// takes the first empty slot. When neither exists the announcement is
    /// rejected and no slot changes.
    pub fn announce(&mut self, address: Address, now: Ticks) -> Announcement {
        if !address.is_assigned() {
            return Announcement::Rejected;
        }

        if let Some(slot) = self.position(address) {
            self.slots[slot].last_seen = now;
            return Announcement::Refreshed { slot };
        }

        match self.slots.iter().position(|dev| !dev.is_occupied()) {
            Some(slot) => {
                self.slots[slot] = Device {
                    address,
                    status: DeviceStatus::NewlyRegistered,
                    last_seen: now,
                };
                Announcement::Registered { slot }
            }
            None => Announcement::Rejected,
        }
    }

    /// Marks a known device as asleep and refreshes its timestamp
    ///
    /// Returns `false` and changes nothing for an unknown address.
    pub fn mark_asleep(&mut self, address: Address, now: Ticks) -> bool {
        match self.get_mut(address) {
            Some(dev) => {
                dev.status = DeviceStatus::Asleep;
                dev.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Returns a slot to the empty state
    pub fn release(&mut self, address: Address) -> bool {
        match self.get_mut(address) {
            Some(dev) => {
                *dev = Device::default();
                true
            }
            None => false,
        }
    }

    /// Looks up a known device
    pub fn get(&self, address: Address) -> Option<&Device> {
        if !address.is_assigned() {
            return None;
        }
        self.slots.iter().find(|dev| dev.address == address)
    }

    fn get_mut(&mut self, address: Address) -> Option<&mut Device> {
        if !address.is_assigned() {
            return None;
        }
        self.slots.iter_mut().find(|dev| dev.address == address)
    }

    fn position(&self, address: Address) -> Option<usize> {
        self.slots.iter().position(|dev| dev.address == address)
    }

    /// All slots in slot order, empty ones included
    pub fn slots(&self) -> &[Device] {
        &self.slots
    }

    /// Occupied slots in slot order
    pub fn occupied(&self) -> impl Iterator<Item = &Device> {
        self.slots.iter().filter(|dev| dev.is_occupied())
    }

    /// Occupied devices silent for strictly more than `timeout_secs`
    pub fn stale(&self, now: Ticks, timeout_secs: u64) -> Vec<Address> {
        self.occupied()
            .filter(|dev| now.since(dev.last_seen) > timeout_secs)
            .map(|dev| dev.address)
            .collect()
    }
}
