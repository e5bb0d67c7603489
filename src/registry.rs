use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::model::{Machine, MachineName};

/// The set of bookable machines. Keyed by name, so the uniqueness invariant
/// (no two machines of the same name) holds structurally.
pub struct MachineRegistry {
    machines: DashMap<MachineName, Machine>,
}

impl Default for MachineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineRegistry {
    pub fn new() -> MachineRegistry {
        MachineRegistry {
            machines: DashMap::new(),
        }
    }

    /// Register a machine. Returns `None` if the name is already taken.
    pub fn register(&self, name: MachineName) -> Option<Machine> {
        match self.machines.entry(name) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => {
                let machine = Machine {
                    id: Ulid::new(),
                    name,
                };
                v.insert(machine.clone());
                Some(machine)
            }
        }
    }

    /// Remove a machine by id. Returns the removed machine, or `None` if absent.
    pub fn remove(&self, id: Ulid) -> Option<Machine> {
        let name = self
            .machines
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| *entry.key())?;
        self.machines.remove(&name).map(|(_, machine)| machine)
    }

    pub fn contains(&self, name: &MachineName) -> bool {
        self.machines.contains_key(name)
    }

    /// All machines, sorted by class then number for stable listings.
    pub fn list(&self) -> Vec<Machine> {
        let mut machines: Vec<Machine> = self
            .machines
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        machines.sort_by_key(|m| (m.name.class.prefix(), m.name.number));
        machines
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
