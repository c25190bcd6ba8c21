//! Synthetic IPv4 addresses standing in for hostnames
//!
//! When the host answers a name lookup itself, it hands out an address in
//! 240.0.0.0/8 and later maps connections to that address back to the name
//! so the policy sees the hostname rather than an opaque address.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const PREFIX: u8 = 240;
const INDEX_BITS: u32 = 24;
const MAX_ENTRIES: usize = (1 << INDEX_BITS) - 1;

#[derive(Debug, Default)]
struct Table {
    by_name: HashMap<String, usize>,
    by_index: HashMap<usize, String>,
    next: usize,
}

/// Bidirectional name/address table. Indexes are handed out in a ring;
/// once full, the oldest index is reused and its previous name forgotten.
#[derive(Debug)]
pub struct FakeIpTable {
    table: RwLock<Table>,
    capacity: usize,
}

impl FakeIpTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    /// Table that recycles after `capacity` names (clamped to the 24-bit space)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            capacity: capacity.clamp(1, MAX_ENTRIES),
        }
    }

    /// Address for `name`, allocating one if needed
    pub fn name_to_addr(&self, name: &str) -> Ipv4Addr {
        if let Some(&index) = self.read().by_name.get(name) {
            return index_to_addr(index);
        }

        index_to_addr(self.allocate(name))
    }

    /// Name previously assigned to `addr`
    pub fn addr_to_name(&self, addr: Ipv4Addr) -> Option<String> {
        if !is_synthetic(addr) {
            return None;
        }

        let index = addr_to_index(addr);
        self.read().by_index.get(&index).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every update leaves both maps consistent, so a poisoned lock still
    // guards a usable table.
    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self, name: &str) -> usize {
        let mut table = self.write();

        // Another writer may have got here first
        if let Some(&index) = table.by_name.get(name) {
            return index;
        }

        let index = table.next;
        if let Some(old) = table.by_index.insert(index, name.to_string()) {
            table.by_name.remove(&old);
        }
        table.by_name.insert(name.to_string(), index);
        table.next = (index + 1) % self.capacity;
        index
    }
}

impl Default for FakeIpTable {
    fn default() -> Self {
        Self::new()
    }
}

/// True for addresses inside the synthetic range
pub fn is_synthetic(addr: Ipv4Addr) -> bool {
    addr.octets()[0] == PREFIX
}

fn index_to_addr(index: usize) -> Ipv4Addr {
    Ipv4Addr::from(((PREFIX as u32) << INDEX_BITS) | (index as u32 + 1))
}

fn addr_to_index(addr: Ipv4Addr) -> usize {
    (u32::from(addr).wrapping_sub(1) as usize) & MAX_ENTRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let table = FakeIpTable::new();

        let addr = table.name_to_addr("www.google.com");
        assert_eq!(addr, Ipv4Addr::new(240, 0, 0, 1));
        assert!(is_synthetic(addr));
        assert_eq!(table.addr_to_name(addr).as_deref(), Some("www.google.com"));

        let other = table.name_to_addr("t.co");
        assert_eq!(other, Ipv4Addr::new(240, 0, 0, 2));
    }

    #[test]
    fn test_same_name_same_addr() {
        let table = FakeIpTable::new();
        let first = table.name_to_addr("example.com");
        let second = table.name_to_addr("example.com");

        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ring_reuse_forgets_oldest() {
        let table = FakeIpTable::with_capacity(2);

        let a = table.name_to_addr("a.example");
        table.name_to_addr("b.example");
        let c = table.name_to_addr("c.example");

        assert_eq!(a, c);
        assert_eq!(table.addr_to_name(c).as_deref(), Some("c.example"));
        assert_eq!(table.len(), 2);
        // a.example gets a fresh slot
        assert_ne!(table.name_to_addr("a.example"), c);
    }

    #[test]
    fn test_poisoned_table_keeps_answering() {
        let table = FakeIpTable::new();
        let before = table.name_to_addr("before.example");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = table.table.write().unwrap();
            panic!("writer died");
        }));
        assert!(result.is_err());
        assert!(table.table.is_poisoned());

        assert_eq!(table.name_to_addr("before.example"), before);
        assert_eq!(table.addr_to_name(before).as_deref(), Some("before.example"));

        let after = table.name_to_addr("after.example");
        assert_eq!(table.addr_to_name(after).as_deref(), Some("after.example"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_foreign_addresses() {
        let table = FakeIpTable::new();
        assert_eq!(table.addr_to_name(Ipv4Addr::new(8, 8, 8, 8)), None);
        assert_eq!(table.addr_to_name(Ipv4Addr::new(240, 0, 0, 9)), None);
        assert!(!is_synthetic(Ipv4Addr::new(241, 0, 0, 1)));
    }
}
